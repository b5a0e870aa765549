use core_types::{AnomalyStatus, ClassificationResult};
use serde::{Deserialize, Serialize};

use crate::stats;

/// Run parameters of the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    /// Minimum number of positive history values before spike checks apply.
    pub min_history: usize,
    /// IQR fence multiplier.
    pub k: f64,
    /// Relative change below which a value is NORMAL outright.
    pub pct_threshold_1: f64,
    /// Relative change tolerated when the baseline has zero spread.
    pub pct_threshold_2: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            min_history: 3,
            k: 2.0,
            pct_threshold_1: 0.10,
            pct_threshold_2: 0.15,
        }
    }
}

/// Summary statistics of the history a value is judged against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub mean: f64,
    pub q1: f64,
    pub q3: f64,
}

impl Baseline {
    pub fn from_history(history: &[f64]) -> Self {
        let (q1, q3) = stats::quartiles(history);
        Self {
            mean: stats::mean(history),
            q1,
            q3,
        }
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// Relative distance of `current` from the mean; 0 unless the mean is
    /// strictly positive.
    pub fn pct_change(&self, current: f64) -> f64 {
        if self.mean > 0.0 {
            ((current - self.mean) / self.mean).abs()
        } else {
            0.0
        }
    }
}

/// A stateless decision procedure labelling one value against its history.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusClassifier {}

impl StatusClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `current` against `history`.
    ///
    /// Only strictly positive history values form the baseline; zeros and
    /// negatives are treated as "no activity". Never fails: empty or short
    /// history resolves to `NEW_ITEM` / `NOT_ENOUGH_DATA`.
    pub fn classify(
        &self,
        current: f64,
        history: &[f64],
        params: &ClassifierParams,
    ) -> ClassificationResult {
        if current < 0.0 {
            return ClassificationResult::bare(AnomalyStatus::NegativeValue, current);
        }

        let history_clean: Vec<f64> = history.iter().copied().filter(|v| *v > 0.0).collect();
        if history_clean.len() < params.min_history {
            let status = if current > 0.0 {
                AnomalyStatus::NewItem
            } else {
                AnomalyStatus::NotEnoughData
            };
            return ClassificationResult::bare(status, current);
        }

        self.judge(current, &Baseline::from_history(&history_clean), params)
    }

    /// Applies the percentage gate and the IQR fences to a value whose
    /// baseline is already known.
    ///
    /// This is the part of `classify` that follows the history checks; the
    /// rolling scanner calls it with its own trailing-window baseline.
    pub fn judge(
        &self,
        current: f64,
        baseline: &Baseline,
        params: &ClassifierParams,
    ) -> ClassificationResult {
        let pct_change = baseline.pct_change(current);
        let status = Self::decide(current, pct_change, baseline, params);

        ClassificationResult {
            status,
            current_value: current,
            baseline_mean: baseline.mean,
            baseline_q1: baseline.q1,
            baseline_q3: baseline.q3,
            pct_change,
        }
    }

    fn decide(
        current: f64,
        pct_change: f64,
        baseline: &Baseline,
        params: &ClassifierParams,
    ) -> AnomalyStatus {
        if pct_change < params.pct_threshold_1 {
            return AnomalyStatus::Normal;
        }

        let iqr = baseline.iqr();
        if iqr == 0.0 {
            return if pct_change < params.pct_threshold_2 {
                AnomalyStatus::Normal
            } else if baseline.q1 == 0.0 && current > 0.0 {
                AnomalyStatus::HighSpike
            } else if current != baseline.q1 {
                AnomalyStatus::SpikeVsConstant
            } else {
                AnomalyStatus::Normal
            };
        }

        let lower = (baseline.q1 - params.k * iqr).max(0.0);
        let upper = baseline.q3 + params.k * iqr;
        if current > upper {
            AnomalyStatus::HighSpike
        } else if current < lower {
            AnomalyStatus::LowSpike
        } else {
            AnomalyStatus::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(current: f64, history: &[f64]) -> ClassificationResult {
        StatusClassifier::new().classify(current, history, &ClassifierParams::default())
    }

    #[test]
    fn negative_wins_over_everything() {
        let result = classify(-500.0, &[100.0, 100.0, 100.0, 100.0]);
        assert_eq!(result.status, AnomalyStatus::NegativeValue);
        assert_eq!(result.baseline_mean, 0.0);
    }

    #[test]
    fn short_history_is_new_item_or_not_enough_data() {
        assert_eq!(classify(100.0, &[0.0, 0.0, 50.0]).status, AnomalyStatus::NewItem);
        assert_eq!(classify(0.0, &[]).status, AnomalyStatus::NotEnoughData);
    }

    #[test]
    fn zeros_do_not_count_as_history() {
        // Two positives out of five: still not enough.
        let result = classify(80.0, &[0.0, 100.0, 0.0, 100.0, 0.0]);
        assert_eq!(result.status, AnomalyStatus::NewItem);
    }

    #[test]
    fn small_change_is_normal_before_fences() {
        let result = classify(105.0, &[100.0, 100.0, 100.0]);
        assert_eq!(result.status, AnomalyStatus::Normal);
        assert!((result.pct_change - 0.05).abs() < 1e-12);
    }

    #[test]
    fn constant_history_tolerates_up_to_fifteen_percent() {
        assert_eq!(classify(112.0, &[100.0, 100.0, 100.0]).status, AnomalyStatus::Normal);
        assert_eq!(
            classify(130.0, &[100.0, 100.0, 100.0]).status,
            AnomalyStatus::SpikeVsConstant
        );
        assert_eq!(
            classify(50.0, &[100.0, 100.0, 100.0]).status,
            AnomalyStatus::SpikeVsConstant
        );
    }

    #[test]
    fn fences_flag_high_and_low() {
        let history = [100.0, 110.0, 120.0, 130.0];
        let high = classify(300.0, &history);
        assert_eq!(high.status, AnomalyStatus::HighSpike);
        assert!((high.baseline_q1 - 107.5).abs() < 1e-9);
        assert!((high.baseline_q3 - 122.5).abs() < 1e-9);

        // Lower fence: 107.5 - 2 * 15 = 77.5.
        assert_eq!(classify(60.0, &history).status, AnomalyStatus::LowSpike);
        assert_eq!(classify(140.0, &history).status, AnomalyStatus::Normal);
    }

    #[test]
    fn lower_fence_is_clamped_at_zero() {
        // Wide spread pushes Q1 - k*IQR below zero; zero itself is not a low spike.
        let history = [10.0, 100.0, 200.0, 400.0];
        assert_eq!(classify(0.0, &history).status, AnomalyStatus::Normal);
    }

    #[test]
    fn judge_on_zero_baseline_is_normal() {
        let result = StatusClassifier::new().judge(
            50.0,
            &Baseline::default(),
            &ClassifierParams::default(),
        );
        assert_eq!(result.status, AnomalyStatus::Normal);
        assert_eq!(result.pct_change, 0.0);
    }

    #[test]
    fn judge_flags_jump_from_zero_constant_when_gate_is_open() {
        let params = ClassifierParams {
            pct_threshold_1: 0.0,
            pct_threshold_2: 0.0,
            ..ClassifierParams::default()
        };
        let result = StatusClassifier::new().judge(50.0, &Baseline::default(), &params);
        assert_eq!(result.status, AnomalyStatus::HighSpike);
    }
}
