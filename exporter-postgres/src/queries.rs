//! SQL text for the two query shapes the locator needs.
//!
//! Identifiers come from configuration and are always quoted. Values are bound
//! as parameters, never spliced.

use crate::schema::{TableName, quote_column};

/// Returns the aggregate `MIN`/`MAX` query over an identifier column.
///
/// Both aggregates are cast to `int8` so callers can decode them as `i64`
/// regardless of the column's integer width.
pub fn id_bounds_query(table: &TableName, id_column: &str) -> String {
    let id = quote_column(id_column);

    format!(
        "select min({id})::int8, max({id})::int8 from {}",
        table.as_quoted_identifier()
    )
}

/// Returns the ceiling lookup: the first row whose id is at least `$1`.
///
/// Ids may have gaps, so this is deliberately not an equality lookup.
pub fn probe_query(table: &TableName, id_column: &str, time_column: &str) -> String {
    let id = quote_column(id_column);
    let time = quote_column(time_column);

    format!(
        "select {id}::int8, {time}::timestamp from {} where {id} >= $1 order by {id} asc limit 1",
        table.as_quoted_identifier()
    )
}
