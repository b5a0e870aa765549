use serde::{Deserialize, Serialize};
use std::fmt;

use crate::enums::AnomalyStatus;
use crate::period::Period;

/// The ordered tuple of dimension values identifying one logical series,
/// e.g. `["Repairs", "51642102", "CC001"]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionKey(pub Vec<String>);

impl DimensionKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// The single key used when a scan is not partitioned by any dimension.
    pub fn all() -> Self {
        Self(vec!["ALL".to_string()])
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Returns a new key with `part` appended, used to extend a peer group
    /// key with the item identifier.
    pub fn with(&self, part: impl Into<String>) -> Self {
        let mut parts = self.0.clone();
        parts.push(part.into());
        Self(parts)
    }
}

impl fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("|"))
    }
}

/// One aggregated value: the sum of every raw row sharing the same key and
/// period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub key: DimensionKey,
    pub period: Period,
    pub value: f64,
}

/// The outcome of classifying one value against its baseline.
///
/// Baseline fields are zero when the classifier stopped before computing them
/// (negative values, not enough history).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub status: AnomalyStatus,
    pub current_value: f64,
    pub baseline_mean: f64,
    pub baseline_q1: f64,
    pub baseline_q3: f64,
    /// Absolute relative distance from the baseline mean, as a fraction.
    pub pct_change: f64,
}

impl ClassificationResult {
    /// A result carrying only a status, for branches that never reach the
    /// baseline computation.
    pub fn bare(status: AnomalyStatus, current_value: f64) -> Self {
        Self {
            status,
            current_value,
            baseline_mean: 0.0,
            baseline_q1: 0.0,
            baseline_q3: 0.0,
            pct_change: 0.0,
        }
    }

    pub fn baseline_iqr(&self) -> f64 {
        self.baseline_q3 - self.baseline_q1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_displays_pipe_joined() {
        let key = DimensionKey::new(["Repairs", "51642102"]);
        assert_eq!(key.to_string(), "Repairs|51642102");
        assert_eq!(key.with("CC001").to_string(), "Repairs|51642102|CC001");
    }

    #[test]
    fn keys_order_lexicographically() {
        let mut keys = vec![
            DimensionKey::new(["B", "1"]),
            DimensionKey::new(["A", "2"]),
            DimensionKey::new(["A", "1"]),
        ];
        keys.sort();
        assert_eq!(keys[0], DimensionKey::new(["A", "1"]));
        assert_eq!(keys[2], DimensionKey::new(["B", "1"]));
    }
}
