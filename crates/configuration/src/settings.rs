use core_types::{PeriodSource, TableSchema};
use serde::{Deserialize, Serialize};

/// The root configuration structure for an audit run.
///
/// Every section has defaults, so an empty `audit.toml` is a valid
/// configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    pub columns: Columns,
    pub thresholds: Thresholds,
    pub latest: LatestSettings,
    pub rolling: RollingSettings,
    pub peer: PeerSettings,
    pub logging: Logging,
}

/// Column roles in the input long table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Columns {
    /// Dimension columns, outermost first.
    pub dimensions: Vec<String>,
    /// Either a single column name or `{ year = "...", month = "..." }`.
    pub period: PeriodSource,
    pub value: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            dimensions: vec!["GL_NAME".to_string(), "GL_CODE".to_string()],
            period: PeriodSource::Column("PERIOD".to_string()),
            value: "VALUE".to_string(),
        }
    }
}

impl Columns {
    pub fn schema(&self) -> TableSchema {
        TableSchema {
            dimensions: self.dimensions.clone(),
            period: self.period.clone(),
            value: self.value.clone(),
        }
    }
}

/// Fence and percentage thresholds shared by the time-series classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Thresholds {
    /// IQR fence multiplier.
    pub k: f64,
    /// Below this relative change a value is NORMAL before any fence check.
    pub pct_threshold_1: f64,
    /// Tolerance applied when the baseline has zero spread.
    pub pct_threshold_2: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            k: 2.0,
            pct_threshold_1: 0.10,
            pct_threshold_2: 0.15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LatestSettings {
    pub enabled: bool,
    /// Overrides `columns.dimensions` for the crosstab when set.
    pub dimensions: Option<Vec<String>>,
    /// Minimum count of positive history values before spike checks apply.
    pub min_history: usize,
}

impl Default for LatestSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dimensions: None,
            min_history: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RollingSettings {
    pub enabled: bool,
    pub dimensions: Option<Vec<String>>,
    /// Number of trailing periods in the baseline window.
    pub window: usize,
}

impl Default for RollingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dimensions: None,
            window: 6,
        }
    }
}

/// Which outlier detector the peer scanner fits on each batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    #[default]
    IsolationForest,
    Tukey,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PeerSettings {
    pub enabled: bool,
    /// Columns that define a peer batch within one period. Empty means the
    /// whole period is one batch.
    pub group_by: Vec<String>,
    /// Column identifying the member within a batch, used for the anomaly map.
    pub item_column: Option<String>,
    pub contamination: f64,
    pub z_threshold: f64,
    pub min_batch_size: usize,
    pub seed: u64,
    pub detector: DetectorKind,
    pub trees: usize,
    pub max_samples: usize,
    /// Fence multiplier for the Tukey detector.
    pub tukey_k: f64,
}

impl Default for PeerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            group_by: Vec::new(),
            item_column: None,
            contamination: 0.05,
            z_threshold: 2.0,
            min_batch_size: 5,
            seed: 42,
            detector: DetectorKind::IsolationForest,
            trees: 100,
            max_samples: 256,
            tukey_k: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, logs are also written to a daily-rotated file in this directory.
    pub directory: Option<String>,
    pub file_prefix: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "ledger-audit.log".to_string(),
        }
    }
}
