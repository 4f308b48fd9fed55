//! Shared configuration types for the exporter.

mod connection;
mod export;
mod exporter;
mod identifier;
mod locator;
mod tables;
mod validation;

pub use connection::{APPLICATION_NAME, PgConnectionConfig, SESSION_SETTINGS, TlsConfig};
pub use export::ExportConfig;
pub use exporter::ExporterConfig;
pub use identifier::IdentifierConfig;
pub use locator::LocatorConfig;
pub use tables::{ColumnConfig, ColumnType, FilterGroupConfig, TableConfig};
pub use validation::ValidationError;
