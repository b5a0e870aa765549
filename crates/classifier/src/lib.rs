//! # Ledger Audit Classifier
//!
//! The single decision procedure every scanner relies on: given a value and
//! the history it should be compared with, label it NORMAL or one of the
//! anomaly statuses.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** depends only on `core-types`. No I/O, no logging, no
//!   shared state; the same inputs always give the same result.
//! - **Shared judgement:** `StatusClassifier::judge` holds the percentage gate
//!   and IQR fences so the rolling scanner can reuse them with its own
//!   trailing-window baseline.

pub mod engine;
pub mod stats;

pub use engine::{Baseline, ClassifierParams, StatusClassifier};
