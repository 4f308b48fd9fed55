//! Destinations for extracted tables.

pub mod archive;
mod base;
pub mod memory;

pub use base::{ArchiveName, Sink};
