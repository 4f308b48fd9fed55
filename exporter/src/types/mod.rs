//! Common types used throughout the exporter.

mod cell;
mod range;
mod schema;
mod table_row;

pub use cell::*;
pub use range::*;
pub use schema::*;
pub use table_row::*;

// Re-exports.
pub use exporter_config::shared::{ColumnConfig, ColumnType, IdentifierConfig};
pub use exporter_postgres::schema::TableName;
