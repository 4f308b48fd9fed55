//! Fixtures for exercising the locator and the pipeline against a [`MemoryStore`].
//!
//! [`series`] builds synthetic `(id, logged time)` series, contiguous or with
//! random gaps. [`table`] registers page sources for those series and builds the
//! matching table, group and identifier configuration.
//!
//! [`MemoryStore`]: crate::store::memory::MemoryStore

pub mod series;
pub mod table;
