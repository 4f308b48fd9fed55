//! Bounded, paged extraction of one table over a located id range.

pub mod batch;
mod pager;
pub mod transform;

pub use pager::{ExtractRequest, fetch_pages, page};
