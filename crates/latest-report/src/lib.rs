//! # Latest-Period Report
//!
//! Builds the crosstab status report: for each dimension group, the verdict on
//! its most recent period measured against all earlier periods, plus a sparse
//! map of every cell that deserves attention.
//!
//! Both views call the same `StatusClassifier`, so the last cell of a row
//! always agrees with the row's own status.

pub mod report;

pub use report::{LatestPeriodReport, LatestReport, RowSummary};
