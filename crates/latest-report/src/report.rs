use classifier::{ClassifierParams, StatusClassifier};
use core_types::{AnomalyMap, AnomalyStatus, ClassificationResult, DimensionKey, Period};
use frame::Pivot;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// The latest-period verdict for one dimension group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSummary {
    pub key: DimensionKey,
    /// One value per period column of the report.
    pub values: Vec<f64>,
    pub status: AnomalyStatus,
    pub latest_value: f64,
    /// Mean of the positive earlier values; 0 when the history was too short.
    pub baseline_mean: f64,
    /// Signed change of the latest value against `baseline_mean`, in percent.
    /// 0 when the mean is 0.
    pub pct_change: f64,
}

impl RowSummary {
    fn from_result(key: DimensionKey, values: Vec<f64>, result: &ClassificationResult) -> Self {
        let pct_change = if result.baseline_mean != 0.0 {
            (result.current_value - result.baseline_mean) / result.baseline_mean * 100.0
        } else {
            0.0
        };
        Self {
            key,
            values,
            status: result.status,
            latest_value: result.current_value,
            baseline_mean: result.baseline_mean,
            pct_change,
        }
    }
}

/// A crosstab with a status for its latest period plus cell-level findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatestReport {
    pub dimensions: Vec<String>,
    pub periods: Vec<Period>,
    pub rows: Vec<RowSummary>,
    /// Every cell whose status is neither NORMAL nor NEW_ITEM.
    pub cells: AnomalyMap,
}

impl LatestReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose latest period is anything but NORMAL.
    pub fn flagged_rows(&self) -> impl Iterator<Item = &RowSummary> {
        self.rows.iter().filter(|r| r.status != AnomalyStatus::Normal)
    }

    pub fn status_counts(&self) -> BTreeMap<AnomalyStatus, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.status).or_insert(0) += 1;
        }
        counts
    }
}

/// Classifies every pivot row's last period against all earlier periods,
/// and every cell against the cells to its left.
#[derive(Debug, Default, Clone, Copy)]
pub struct LatestPeriodReport {
    classifier: StatusClassifier,
}

impl LatestPeriodReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the report. An empty pivot yields an empty report.
    ///
    /// The pivot must be zero-filled; `frame::AggregatedFrame::pivot` and
    /// `Pivot::from_crosstab` both guarantee that.
    pub fn build(&self, pivot: &Pivot, params: &ClassifierParams) -> LatestReport {
        if pivot.is_empty() {
            return LatestReport {
                dimensions: pivot.dimensions.clone(),
                periods: pivot.periods.clone(),
                ..LatestReport::default()
            };
        }

        let mut rows = Vec::with_capacity(pivot.rows.len());
        let mut cells = AnomalyMap::new();

        for row in &pivot.rows {
            let values = &row.values;
            let mut latest = None;

            for (col, (&current, &period)) in values.iter().zip(&pivot.periods).enumerate() {
                let result = self.classifier.classify(current, &values[..col], params);
                if !matches!(result.status, AnomalyStatus::Normal | AnomalyStatus::NewItem) {
                    cells.insert(row.key.clone(), period, result);
                }
                latest = Some(result);
            }

            if let Some(result) = latest {
                rows.push(RowSummary::from_result(row.key.clone(), values.clone(), &result));
            }
        }

        let report = LatestReport {
            dimensions: pivot.dimensions.clone(),
            periods: pivot.periods.clone(),
            rows,
            cells,
        };
        info!(
            rows = report.rows.len(),
            flagged = report.flagged_rows().count(),
            cells = report.cells.len(),
            "Latest-period report built"
        );
        report
    }

    /// Row summary only: the last value of `values` against every earlier one.
    pub fn summarize(
        &self,
        key: DimensionKey,
        values: &[f64],
        params: &ClassifierParams,
    ) -> Option<RowSummary> {
        let (&latest, history) = values.split_last()?;
        let result = self.classifier.classify(latest, history, params);
        Some(RowSummary::from_result(key, values.to_vec(), &result))
    }
}
