//! # Rolling Time-Series Scanner
//!
//! Judges every `(dimension group, period)` of an aggregated frame against the
//! trailing window of observations before it, and reports the ones that are
//! not NORMAL.
//!
//! Each group keeps a bounded deque of its last `window` values, so a scan is
//! linear in the number of observations for a fixed window. Groups are
//! independent and run in parallel on the rayon pool; records are sorted
//! before they are returned.

pub mod scanner;

pub use scanner::{RollingParams, RollingRecord, RollingScan, RollingTimeSeriesScanner};
