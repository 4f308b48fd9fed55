//! Access to the tabular store holding the exported tables.

mod base;
pub mod memory;
pub mod postgres;

pub use base::{IdStore, with_store};
