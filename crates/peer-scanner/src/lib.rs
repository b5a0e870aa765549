//! # Peer-Group Outlier Scanner
//!
//! Cross-sectional checks: within each period, rows are partitioned into peer
//! batches and compared with each other rather than with their own history.
//!
//! ## Architectural Principles
//!
//! - **Two votes:** an `OutlierDetector` proposes outliers and a z-score
//!   against the batch confirms them. Only rows passing both are reported.
//! - **Swappable detector:** the seeded `IsolationForest` and the
//!   deterministic `TukeyFenceDetector` sit behind the same trait; `factory`
//!   picks one from configuration.
//! - **Isolated batches:** a batch that is too small or has a malformed key is
//!   skipped on its own; the rest of the scan carries on.

pub mod detector;
pub mod error;
pub mod factory;
pub mod forest;
pub mod scanner;

pub use detector::{OutlierDetector, TukeyFenceDetector};
pub use error::PeerError;
pub use factory::create_detector;
pub use forest::IsolationForest;
pub use scanner::{PeerGroupOutlierScanner, PeerParams, PeerRecord, PeerScan};
