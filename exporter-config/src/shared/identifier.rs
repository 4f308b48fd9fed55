use exporter_postgres::schema::TableName;
use serde::Deserialize;

use crate::shared::ValidationError;

/// The table whose identifier column is searched to bound an export window.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct IdentifierConfig {
    /// Table holding the time-correlated identifier, as `schema.table`.
    pub table: TableName,
    /// Monotonically increasing integer identifier column.
    pub id_column: String,
    /// Timestamp column that roughly follows the identifier.
    pub time_column: String,
}

impl IdentifierConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("identifier.id_column", &self.id_column),
            ("identifier.time_column", &self.time_column),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidFieldValue {
                    field: field.to_string(),
                    constraint: "must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }
}
