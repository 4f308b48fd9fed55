//! Configuration for the exporter: connection settings, locator and export tuning,
//! filter groups and per-table schemas.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{LoadConfigError, load_config, load_config_from};
