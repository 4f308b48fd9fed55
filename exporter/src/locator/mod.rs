//! Approximate time to identifier search.
//!
//! [`locate`] maps a wall-clock time onto the identifier column of a table whose ids
//! roughly, but not strictly, follow time. [`locate_days`] applies it to whole days
//! and produces the ranges persisted by the [`crate::ledger`].

mod daily;
mod locate;
mod probe;
mod window;

pub use daily::{day_margin, locate_day, locate_days, locate_window};
pub use locate::{LocateOutcome, LocateRequest, Located, LocatorSettings, locate};
pub use probe::{fetch_bounds, paced_probe};
pub use window::{SearchState, SearchTarget, SearchWindow, Transition};
