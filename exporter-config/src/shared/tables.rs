use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;

use crate::shared::ValidationError;

/// Semantic type every extracted column is cast to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Int32,
    Int64,
    Float64,
    Boolean,
    String,
    Timestamp,
    /// Low-cardinality string, stored dictionary encoded.
    Categorical,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Int32 => "int32",
            ColumnType::Int64 => "int64",
            ColumnType::Float64 => "float64",
            ColumnType::Boolean => "boolean",
            ColumnType::String => "string",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Categorical => "categorical",
        };
        f.write_str(name)
    }
}

/// One declared output column.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Set when the column is only selected to filter on and must not reach the archive.
    #[serde(default)]
    pub accessory: bool,
}

/// A logical table exported page by page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TableConfig {
    /// Name used for the archive directory and file names.
    pub name: String,
    /// Page query. `$1` and `$2` are bound to the inclusive id bounds of the page.
    pub query: String,
    /// Output columns in archive order.
    pub columns: Vec<ColumnConfig>,
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "tables.name".to_string(),
                constraint: "must not be empty".to_string(),
            });
        }

        if !self.query.contains("$1") || !self.query.contains("$2") {
            return Err(ValidationError::InvalidFieldValue {
                field: format!("tables.{}.query", self.name),
                constraint: "must bind the page bounds as $1 and $2".to_string(),
            });
        }

        if self.columns.is_empty() {
            return Err(ValidationError::EmptySchema {
                table: self.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(ValidationError::DuplicateColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Returns the declared column with the given name.
    pub fn column(&self, name: &str) -> Option<&ColumnConfig> {
        self.columns.iter().find(|column| column.name == name)
    }
}

/// Tables that share a time filter column.
///
/// Every member is paged over the same located id range, then filtered on
/// `filter_column` against the export window.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FilterGroupConfig {
    pub name: String,
    pub filter_column: String,
    pub tables: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: Vec<ColumnConfig>) -> TableConfig {
        TableConfig {
            name: "treatment".to_string(),
            query: "select * from t where id between $1 and $2".to_string(),
            columns,
        }
    }

    fn column(name: &str, column_type: ColumnType) -> ColumnConfig {
        ColumnConfig {
            name: name.to_string(),
            column_type,
            accessory: false,
        }
    }

    #[test]
    fn rejects_duplicate_columns() {
        let config = table(vec![
            column("id", ColumnType::Int64),
            column("id", ColumnType::String),
        ]);

        assert_eq!(
            config.validate(),
            Err(ValidationError::DuplicateColumn {
                table: "treatment".to_string(),
                column: "id".to_string()
            })
        );
    }

    #[test]
    fn rejects_queries_without_bounds() {
        let mut config = table(vec![column("id", ColumnType::Int64)]);
        config.query = "select * from t".to_string();

        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidFieldValue { .. })
        ));
    }

    #[test]
    fn parses_column_types_from_snake_case() {
        let column: ColumnConfig =
            serde_json::from_str(r#"{"name":"ClientCode","type":"categorical"}"#).unwrap();

        assert_eq!(column.column_type, ColumnType::Categorical);
        assert!(!column.accessory);
    }
}
