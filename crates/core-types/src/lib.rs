//! # Ledger Audit Core Types
//!
//! The foundational vocabulary shared by every crate in the workspace: the
//! long-format input table, dimension keys, periods, the closed set of anomaly
//! statuses and the classification records the scanners produce.
//!
//! This crate holds no logic beyond parsing and formatting of its own types.

pub mod anomaly_map;
pub mod enums;
pub mod error;
pub mod format;
pub mod period;
pub mod structs;
pub mod table;

// Re-export the core types to provide a clean public API.
pub use anomaly_map::AnomalyMap;
pub use enums::{AnomalyKind, AnomalyStatus};
pub use error::CoreError;
pub use format::format_amount;
pub use period::{Period, PeriodMode};
pub use structs::{ClassificationResult, DimensionKey, Observation};
pub use table::{Cell, LongTable, PeriodSource, TableSchema};
