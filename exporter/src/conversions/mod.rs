//! Parsing and casting of raw store values into declared column types.

pub mod bool;
pub mod cell;
pub mod timestamp;
