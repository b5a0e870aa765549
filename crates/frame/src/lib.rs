//! # Ledger Audit Frame
//!
//! Turns the caller's long-format table into the shapes the scanners read:
//! validated column positions, an aggregated frame with one summed value per
//! `(dimension key, period)`, and a zero-filled pivot.
//!
//! Structural validation happens once, in `columns::resolve`, before any
//! per-row work.

pub mod aggregate;
pub mod columns;
pub mod pivot;

pub use aggregate::{AggregatedFrame, DimensionGroup};
pub use columns::{ResolvedColumns, resolve};
pub use pivot::{Pivot, PivotRow};
