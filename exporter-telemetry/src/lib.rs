//! Logging setup shared by the exporter binary and tests.

pub mod tracing;
