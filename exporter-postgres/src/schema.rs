use std::fmt;
use std::str::FromStr;

use pg_escape::quote_identifier;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Schema assumed when a table name is given without one.
pub const DEFAULT_SCHEMA: &str = "public";

/// Errors raised while parsing a table name from configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableNameError {
    #[error("table name must not be empty")]
    Empty,

    #[error("table name `{0}` has more than two dot separated parts")]
    TooManyParts(String),

    #[error("table name `{0}` has an empty schema or table part")]
    EmptyPart(String),
}

/// Fully qualified Postgres table name with schema and table components.
///
/// Renders as `schema.name` for display and as a quoted identifier when spliced
/// into SQL text.
#[derive(Debug, Clone, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct TableName {
    /// The schema name containing the table
    pub schema: String,
    /// The name of the table within the schema
    pub name: String,
}

impl TableName {
    /// Creates a new [`TableName`] with the given schema and table name.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> TableName {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Returns the table name as a properly quoted Postgres identifier.
    pub fn as_quoted_identifier(&self) -> String {
        let quoted_schema = quote_identifier(&self.schema);
        let quoted_name = quote_identifier(&self.name);

        format!("{quoted_schema}.{quoted_name}")
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{0}.{1}", self.schema, self.name))
    }
}

impl FromStr for TableName {
    type Err = TableNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TableNameError::Empty);
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        match parts.as_slice() {
            [name] => Ok(TableName::new(DEFAULT_SCHEMA, *name)),
            [schema, name] if !schema.is_empty() && !name.is_empty() => {
                Ok(TableName::new(*schema, *name))
            }
            [_, _] => Err(TableNameError::EmptyPart(trimmed.to_string())),
            _ => Err(TableNameError::TooManyParts(trimmed.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for TableName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Quotes a single column name for use in generated SQL.
pub fn quote_column(column: &str) -> String {
    quote_identifier(column).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_schema_qualified_names() {
        let table: TableName = "analytics.treatment".parse().unwrap();
        assert_eq!(table, TableName::new("analytics", "treatment"));
        assert_eq!(table.to_string(), "analytics.treatment");
    }

    #[test]
    fn bare_names_default_to_public() {
        let table: TableName = "treatment".parse().unwrap();
        assert_eq!(table.schema, DEFAULT_SCHEMA);
    }

    #[test]
    fn rejects_malformed_names() {
        assert_eq!("".parse::<TableName>(), Err(TableNameError::Empty));
        assert!(matches!(
            "a.b.c".parse::<TableName>(),
            Err(TableNameError::TooManyParts(_))
        ));
        assert!(matches!(
            ".b".parse::<TableName>(),
            Err(TableNameError::EmptyPart(_))
        ));
    }

    #[test]
    fn quotes_mixed_case_identifiers() {
        let table = TableName::new("AnalyticsDW", "Treatment");
        assert_eq!(table.as_quoted_identifier(), "\"AnalyticsDW\".\"Treatment\"");
        assert_eq!(quote_column("treatment_id"), "treatment_id");
        assert_eq!(quote_column("LoggedUTC"), "\"LoggedUTC\"");
    }

    #[test]
    fn deserializes_from_string() {
        let table: TableName = serde_json::from_str("\"dw.treatment\"").unwrap();
        assert_eq!(table, TableName::new("dw", "treatment"));
    }
}
