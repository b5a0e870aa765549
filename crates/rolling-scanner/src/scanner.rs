use classifier::{Baseline, ClassifierParams, StatusClassifier, stats};
use core_types::{
    AnomalyKind, AnomalyMap, AnomalyStatus, ClassificationResult, DimensionKey, Period,
    format_amount,
};
use frame::{AggregatedFrame, DimensionGroup};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollingParams {
    /// Number of preceding observations forming each baseline.
    pub window: usize,
    /// Fence and percentage thresholds. `min_history` is not used here; the
    /// window's own count rule replaces it.
    pub thresholds: ClassifierParams,
}

impl Default for RollingParams {
    fn default() -> Self {
        Self {
            window: 6,
            thresholds: ClassifierParams::default(),
        }
    }
}

impl RollingParams {
    /// Observations a window must hold before its statistics are computed.
    pub fn min_periods(&self) -> usize {
        self.window.saturating_sub(1).max(1)
    }
}

/// One flagged `(dimension group, period)` of a rolling scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingRecord {
    pub key: DimensionKey,
    pub period: Period,
    pub value: f64,
    pub status: AnomalyStatus,
    pub rolling_mean: f64,
    pub rolling_count: usize,
    pub rolling_q1: f64,
    pub rolling_q3: f64,
    pub pct_change: f64,
    pub compared_with: String,
    pub kind: AnomalyKind,
}

impl RollingRecord {
    pub fn result(&self) -> ClassificationResult {
        ClassificationResult {
            status: self.status,
            current_value: self.value,
            baseline_mean: self.rolling_mean,
            baseline_q1: self.rolling_q1,
            baseline_q3: self.rolling_q3,
            pct_change: self.pct_change,
        }
    }
}

/// The findings of a rolling scan, sorted by key then period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollingScan {
    /// Names of the dimension columns, in key order.
    pub dimensions: Vec<String>,
    pub window: usize,
    pub records: Vec<RollingRecord>,
}

impl RollingScan {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Only the findings worth highlighting: spikes and negative values.
    pub fn critical(&self) -> impl Iterator<Item = &RollingRecord> {
        self.records.iter().filter(|r| r.status.is_critical())
    }

    /// `(key, period)` lookup of every finding.
    pub fn anomaly_map(&self) -> AnomalyMap {
        self.records
            .iter()
            .map(|r| (r.key.clone(), r.period, r.result()))
            .collect()
    }
}

/// Classifies every observation of every group against the `window`
/// observations that precede it.
#[derive(Debug, Default, Clone, Copy)]
pub struct RollingTimeSeriesScanner {
    classifier: StatusClassifier,
}

impl RollingTimeSeriesScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan(&self, frame: &AggregatedFrame, params: &RollingParams) -> RollingScan {
        info!(
            groups = frame.groups().len(),
            observations = frame.len(),
            window = params.window,
            "Running rolling time-series scan"
        );

        let mut records: Vec<RollingRecord> = frame
            .groups()
            .par_iter()
            .flat_map_iter(|group| self.scan_group(group, params))
            .collect();
        records.sort_by(|a, b| (&a.key, a.period).cmp(&(&b.key, b.period)));

        if records.is_empty() {
            info!("No anomalies found in rolling scan");
        } else {
            info!(anomalies = records.len(), "Rolling scan complete");
        }

        RollingScan {
            dimensions: frame.dimensions().to_vec(),
            window: params.window,
            records,
        }
    }

    /// Walks one group in period order, keeping the trailing window in a
    /// bounded deque. The current value joins the window only after it has
    /// been judged.
    fn scan_group(&self, group: &DimensionGroup, params: &RollingParams) -> Vec<RollingRecord> {
        let window = params.window.max(1);
        let min_periods = params.min_periods();
        let required = window.saturating_sub(1);

        let mut trailing: VecDeque<f64> = VecDeque::with_capacity(window);
        let mut records = Vec::new();

        for &(period, value) in &group.observations {
            let (baseline, count) = if trailing.len() >= min_periods {
                let history: Vec<f64> = trailing.iter().copied().collect();
                let (q1, q3) = stats::quartiles(&history);
                let baseline = Baseline {
                    mean: stats::mean(&history),
                    q1,
                    q3,
                };
                (baseline, history.len())
            } else {
                (Baseline::default(), 0)
            };

            let status = if value < 0.0 {
                AnomalyStatus::NegativeValue
            } else if count < required {
                if value > 0.0 {
                    AnomalyStatus::NewItem
                } else {
                    AnomalyStatus::NotEnoughData
                }
            } else {
                self.classifier.judge(value, &baseline, &params.thresholds).status
            };

            if !matches!(status, AnomalyStatus::Normal | AnomalyStatus::NotEnoughData) {
                records.push(RollingRecord {
                    key: group.key.clone(),
                    period,
                    value,
                    status,
                    rolling_mean: baseline.mean,
                    rolling_count: count,
                    rolling_q1: baseline.q1,
                    rolling_q3: baseline.q3,
                    pct_change: baseline.pct_change(value),
                    compared_with: format!(
                        "Avg Past {}: {} (Count: {})",
                        params.window,
                        format_amount(baseline.mean),
                        count
                    ),
                    kind: AnomalyKind::TimeSeriesRoll,
                });
            }

            if trailing.len() == window {
                trailing.pop_front();
            }
            trailing.push_back(value);
        }

        if !records.is_empty() {
            debug!(key = %group.key, anomalies = records.len(), "Group flagged");
        }
        records
    }
}
