//! Exports large, append-only, time-ordered tables into dated archives.
//!
//! The crate has two cores. The [`locator`] turns a wall-clock time into a row
//! identifier with a tolerant, direction-aware binary search over an id column
//! that only roughly follows time. The [`pipeline`] pages through the located
//! id range per table, casts each page to a declared schema, filters it on a
//! time column and hands the result to a [`sink::Sink`].
//!
//! Everything talks to the database through the [`store::IdStore`] seam, which
//! is owned by exactly one unit of work at a time (see [`store::with_store`]).

pub mod combine;
pub mod conversions;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod locator;
mod macros;
pub mod pipeline;
pub mod sink;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
