//! Postgres identifiers and the fixed query shapes used to locate and page rows.

pub mod queries;
pub mod schema;
