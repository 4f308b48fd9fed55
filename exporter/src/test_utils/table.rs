use chrono::NaiveDateTime;
use exporter_config::shared::{FilterGroupConfig, TableConfig};

use crate::store::memory::MemoryStore;
use crate::types::{Cell, ColumnConfig, ColumnType, IdentifierConfig, TableName, TableRow};

/// Identifier source reading `public.<table>` through `id` and `logged_at`.
pub fn identifier(table: &str) -> IdentifierConfig {
    IdentifierConfig {
        table: TableName::new("public", table),
        id_column: "id".to_string(),
        time_column: "logged_at".to_string(),
    }
}

/// Page query text used for `table`.
pub fn page_query(table: &str) -> String {
    format!("select id, note, logged_at from {table} where id between $1 and $2")
}

/// Table with an `id`, a free text `note` and a `logged_at` timestamp.
///
/// When `accessory` is set, `logged_at` is only used for filtering and does not
/// reach the archive.
pub fn visit_table(name: &str, accessory: bool) -> TableConfig {
    let column = |name: &str, column_type, accessory| ColumnConfig {
        name: name.to_string(),
        column_type,
        accessory,
    };

    TableConfig {
        name: name.to_string(),
        query: page_query(name),
        columns: vec![
            column("id", ColumnType::Int64, false),
            column("note", ColumnType::String, false),
            column("logged_at", ColumnType::Timestamp, accessory),
        ],
    }
}

/// Group filtering `tables` on `logged_at`.
pub fn logged_at_group(name: &str, tables: &[&str]) -> FilterGroupConfig {
    FilterGroupConfig {
        name: name.to_string(),
        filter_column: "logged_at".to_string(),
        tables: tables.iter().map(|table| table.to_string()).collect(),
    }
}

/// Note stored for `id`. Contains a tab and a newline so sanitization is visible.
pub fn raw_note(id: i64) -> String {
    format!("visit\t{id}\nend")
}

/// Registers `series` as the identifier series of `source` and as the page rows
/// of every table in `tables`.
pub async fn register_series(
    store: &MemoryStore,
    source: &IdentifierConfig,
    tables: &[TableConfig],
    series: &[(i64, NaiveDateTime)],
) {
    store
        .insert_series(source.table.clone(), series.iter().copied())
        .await;

    for table in tables {
        store
            .insert_page_source(
                table.query.clone(),
                vec!["id".to_string(), "note".to_string(), "logged_at".to_string()],
                series.iter().map(|(id, logged_at)| {
                    (
                        *id,
                        TableRow::new(vec![
                            Cell::I64(*id),
                            Cell::String(raw_note(*id)),
                            Cell::Timestamp(*logged_at),
                        ]),
                    )
                }),
            )
            .await;
    }
}
