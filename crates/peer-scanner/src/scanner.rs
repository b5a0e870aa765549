use classifier::stats;
use configuration::PeerSettings;
use core_types::{
    AnomalyKind, AnomalyMap, AnomalyStatus, Cell, DimensionKey, LongTable, Period, TableSchema,
    format_amount,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::detector::OutlierDetector;
use crate::error::PeerError;
use crate::factory::create_detector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerParams {
    /// Columns whose values define a peer batch within a period. Empty means
    /// every row of a period is in one batch.
    pub group_by: Vec<String>,
    /// Minimum `|z|` for a detector vote to be confirmed.
    pub z_threshold: f64,
    pub min_batch_size: usize,
}

impl Default for PeerParams {
    fn default() -> Self {
        Self {
            group_by: Vec::new(),
            z_threshold: 2.0,
            min_batch_size: 5,
        }
    }
}

impl From<&PeerSettings> for PeerParams {
    fn from(settings: &PeerSettings) -> Self {
        Self {
            group_by: settings.group_by.clone(),
            z_threshold: settings.z_threshold,
            min_batch_size: settings.min_batch_size,
        }
    }
}

/// One confirmed peer outlier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerRecord {
    /// Position of the row in the input table.
    pub row_index: usize,
    /// Every field of the input row, by column name.
    pub fields: BTreeMap<String, Cell>,
    pub period: Period,
    pub group_key: DimensionKey,
    pub value: f64,
    pub status: AnomalyStatus,
    pub group_mean: f64,
    pub z_score: f64,
    pub compared_with: String,
    pub kind: AnomalyKind,
}

/// The findings of a peer scan, sorted by period, group key, then row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeerScan {
    pub group_by: Vec<String>,
    pub records: Vec<PeerRecord>,
    pub batches_scanned: usize,
    pub batches_skipped: usize,
}

impl PeerScan {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Status lookup keyed by the group key extended with the row's
    /// `item_column` value, for highlighting a peer crosstab.
    pub fn anomaly_map(&self, item_column: &str) -> AnomalyMap<AnomalyStatus> {
        self.records
            .iter()
            .map(|r| {
                let item = r
                    .fields
                    .get(item_column)
                    .and_then(Cell::key_text)
                    .unwrap_or_else(|| "N/A".to_string());
                (r.group_key.with(item), r.period, r.status)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum BatchKey {
    Group(DimensionKey),
    /// Rows whose grouping values could not be turned into a key.
    Malformed,
}

/// Inclusive `|z| >= threshold`, with a relative tolerance so that a z which
/// is exactly the threshold in real arithmetic is not lost to rounding.
fn confirms(z_score: f64, threshold: f64) -> bool {
    z_score.abs() + Z_TOLERANCE * threshold.max(1.0) >= threshold
}

const Z_TOLERANCE: f64 = 1e-9;

struct Batch {
    period: Period,
    key: BatchKey,
    rows: Vec<(usize, f64)>,
}

enum BatchOutcome {
    Scanned(Vec<PeerRecord>),
    Skipped,
}

/// Flags rows that stand out from the other rows of the same period and peer
/// group. A row is reported only when the detector votes for it and its
/// z-score against the batch confirms the vote.
pub struct PeerGroupOutlierScanner {
    detector: Box<dyn OutlierDetector>,
}

impl PeerGroupOutlierScanner {
    pub fn new(detector: Box<dyn OutlierDetector>) -> Self {
        Self { detector }
    }

    pub fn from_settings(settings: &PeerSettings) -> Result<Self, PeerError> {
        Ok(Self::new(create_detector(settings)?))
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Scans the raw rows of `table`.
    ///
    /// `schema` supplies the period and value columns; its dimensions are
    /// ignored in favour of `params.group_by`. Missing columns fail the scan
    /// before any batch is built. Undersized batches and batches of rows with
    /// malformed grouping values are skipped and logged.
    pub fn scan(
        &self,
        table: &LongTable,
        schema: &TableSchema,
        params: &PeerParams,
    ) -> Result<PeerScan, PeerError> {
        let cols = frame::resolve(table, &schema.with_dimensions(&params.group_by))?;

        let mut batches: BTreeMap<(Period, BatchKey), Vec<(usize, f64)>> = BTreeMap::new();
        for row in 0..table.len() {
            let period = cols.period(table, row)?;
            let value = cols.value(table, row)?;
            let key = cols.key(table, row).map_or(BatchKey::Malformed, BatchKey::Group);
            batches.entry((period, key)).or_default().push((row, value));
        }

        let batches: Vec<Batch> = batches
            .into_iter()
            .map(|((period, key), rows)| Batch { period, key, rows })
            .collect();
        info!(
            rows = table.len(),
            batches = batches.len(),
            detector = self.detector.name(),
            "Running peer-group scan"
        );

        let outcomes: Vec<BatchOutcome> = batches
            .par_iter()
            .map(|batch| self.scan_batch(table, batch, params))
            .collect();

        let mut scan = PeerScan {
            group_by: params.group_by.clone(),
            ..PeerScan::default()
        };
        for outcome in outcomes {
            match outcome {
                BatchOutcome::Scanned(records) => {
                    scan.batches_scanned += 1;
                    scan.records.extend(records);
                }
                BatchOutcome::Skipped => scan.batches_skipped += 1,
            }
        }
        scan.records.sort_by(|a, b| {
            (a.period, &a.group_key, a.row_index).cmp(&(b.period, &b.group_key, b.row_index))
        });

        info!(
            outliers = scan.records.len(),
            scanned = scan.batches_scanned,
            skipped = scan.batches_skipped,
            "Peer-group scan complete"
        );
        Ok(scan)
    }

    fn scan_batch(&self, table: &LongTable, batch: &Batch, params: &PeerParams) -> BatchOutcome {
        let group_key = match &batch.key {
            BatchKey::Group(key) => key,
            BatchKey::Malformed => {
                warn!(
                    period = %batch.period,
                    rows = batch.rows.len(),
                    "Skipping peer batch with malformed group key"
                );
                return BatchOutcome::Skipped;
            }
        };
        if batch.rows.len() < params.min_batch_size {
            debug!(
                period = %batch.period,
                group = %group_key,
                rows = batch.rows.len(),
                "Peer batch below minimum size"
            );
            return BatchOutcome::Skipped;
        }

        let values: Vec<f64> = batch.rows.iter().map(|(_, v)| *v).collect();
        let flags = self.detector.fit_predict(&values);
        let mean = stats::mean(&values);
        let std = stats::population_std(&values, mean);

        let records = batch
            .rows
            .iter()
            .zip(flags)
            .filter(|(_, flagged)| *flagged)
            .filter_map(|(&(row_index, value), _)| {
                let z_score = if std > 0.0 { (value - mean) / std } else { 0.0 };
                if !confirms(z_score, params.z_threshold) {
                    return None;
                }
                let status = if z_score > 0.0 {
                    AnomalyStatus::PeerHighOutlier
                } else {
                    AnomalyStatus::PeerLowOutlier
                };
                Some(PeerRecord {
                    row_index,
                    fields: table.record(row_index),
                    period: batch.period,
                    group_key: group_key.clone(),
                    value,
                    status,
                    group_mean: mean,
                    z_score,
                    compared_with: format!("Group Avg: {} (Z={:.2})", format_amount(mean), z_score),
                    kind: AnomalyKind::PeerGroup,
                })
            })
            .collect::<Vec<_>>();

        if !records.is_empty() {
            debug!(
                period = %batch.period,
                group = %group_key,
                outliers = records.len(),
                "Peer batch flagged"
            );
        }
        BatchOutcome::Scanned(records)
    }
}
