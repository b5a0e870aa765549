use classifier::stats;

use crate::error::PeerError;

/// A one-dimensional outlier detector fitted on a single peer batch.
///
/// Implementations must be deterministic for a given input: a randomized
/// detector reseeds itself on every call so that batch results do not depend
/// on scheduling.
pub trait OutlierDetector: Send + Sync {
    /// Fits on `values` and returns one flag per value, `true` for outliers.
    fn fit_predict(&self, values: &[f64]) -> Vec<bool>;

    fn name(&self) -> &'static str;
}

/// Flags values outside `[Q1 - k·IQR, Q3 + k·IQR]` of the batch itself.
///
/// A deterministic stand-in for the isolation forest; with zero spread every
/// value that differs from the common one is flagged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TukeyFenceDetector {
    k: f64,
}

impl TukeyFenceDetector {
    pub fn new(k: f64) -> Result<Self, PeerError> {
        if !k.is_finite() || k < 0.0 {
            return Err(PeerError::InvalidParameters(format!(
                "Tukey fence multiplier must be non-negative, got {k}"
            )));
        }
        Ok(Self { k })
    }
}

impl Default for TukeyFenceDetector {
    fn default() -> Self {
        Self { k: 1.5 }
    }
}

impl OutlierDetector for TukeyFenceDetector {
    fn fit_predict(&self, values: &[f64]) -> Vec<bool> {
        let (q1, q3) = stats::quartiles(values);
        let iqr = q3 - q1;
        let lower = q1 - self.k * iqr;
        let upper = q3 + self.k * iqr;
        values.iter().map(|v| *v < lower || *v > upper).collect()
    }

    fn name(&self) -> &'static str {
        "tukey"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_outside_the_fences() {
        let flags = TukeyFenceDetector::default().fit_predict(&[10.0, 11.0, 12.0, 13.0, 14.0, 90.0]);
        assert_eq!(flags, vec![false, false, false, false, false, true]);
    }

    #[test]
    fn zero_spread_flags_every_deviation() {
        let flags = TukeyFenceDetector::default().fit_predict(&[10.0, 10.0, 10.0, 10.0, 1000.0]);
        assert_eq!(flags, vec![false, false, false, false, true]);
    }

    #[test]
    fn rejects_negative_multiplier() {
        assert!(TukeyFenceDetector::new(-1.0).is_err());
    }
}
