use thiserror::Error;

/// Errors raised when a loaded configuration is structurally valid but semantically wrong.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("tls is enabled but no trusted root certificates were provided")]
    MissingTrustedRootCerts,

    #[error("invalid value for `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },

    #[error("table `{0}` is configured more than once")]
    DuplicateTable(String),

    #[error("table `{table}` has no columns")]
    EmptySchema { table: String },

    #[error("table `{table}` declares column `{column}` more than once")]
    DuplicateColumn { table: String, column: String },

    #[error("filter group `{0}` is configured more than once")]
    DuplicateGroup(String),

    #[error("table `{table}` is listed in both filter groups `{first}` and `{second}`")]
    TableInManyGroups {
        table: String,
        first: String,
        second: String,
    },

    #[error("table `{0}` does not belong to any filter group")]
    TableWithoutGroup(String),

    #[error("filter group `{group}` lists unknown table `{table}`")]
    UnknownGroupMember { group: String, table: String },

    #[error("table `{table}` does not declare the filter column `{column}` of its group")]
    MissingFilterColumn { table: String, column: String },

    #[error("filter column `{column}` of table `{table}` is declared as {declared}, not timestamp")]
    FilterColumnNotTimestamp {
        table: String,
        column: String,
        declared: String,
    },
}
