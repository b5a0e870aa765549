use classifier::stats;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::detector::OutlierDetector;
use crate::error::PeerError;

const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Isolation forest over a single feature.
///
/// Each tree is grown on a sample drawn without replacement; a split picks a
/// threshold uniformly between the node's minimum and maximum. Scores follow
/// the usual `-2^(-E[h(x)] / c(ψ))` form and the decision offset is the
/// `contamination` percentile of the training scores, so roughly that share
/// of values is flagged.
///
/// The generator is a ChaCha8 stream seeded with `seed` at the start of every
/// fit, which makes a batch's result independent of what ran before it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsolationForest {
    trees: usize,
    max_samples: usize,
    contamination: f64,
    seed: u64,
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self {
            trees: 100,
            max_samples: 256,
            contamination: 0.05,
            seed: 42,
        }
    }
}

impl IsolationForest {
    pub fn new(
        trees: usize,
        max_samples: usize,
        contamination: f64,
        seed: u64,
    ) -> Result<Self, PeerError> {
        if trees == 0 {
            return Err(PeerError::InvalidParameters(
                "isolation forest needs at least one tree".to_string(),
            ));
        }
        if max_samples < 2 {
            return Err(PeerError::InvalidParameters(format!(
                "max_samples must be at least 2, got {max_samples}"
            )));
        }
        if !(contamination > 0.0 && contamination <= 0.5) {
            return Err(PeerError::InvalidParameters(format!(
                "contamination must be in (0, 0.5], got {contamination}"
            )));
        }
        Ok(Self {
            trees,
            max_samples,
            contamination,
            seed,
        })
    }

    /// Anomaly scores of `values`; lower is more anomalous.
    pub fn score_samples(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len();
        if n < 2 {
            return vec![0.0; n];
        }

        let sample_size = self.max_samples.min(n);
        let max_depth = (sample_size as f64).log2().ceil() as usize;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let forest: Vec<Node> = (0..self.trees)
            .map(|_| {
                let mut sample: Vec<f64> = if sample_size == n {
                    values.to_vec()
                } else {
                    rand::seq::index::sample(&mut rng, n, sample_size)
                        .into_iter()
                        .map(|i| values[i])
                        .collect()
                };
                Node::grow(&mut sample, 0, max_depth, &mut rng)
            })
            .collect();

        let normaliser = average_path_length(sample_size);
        values
            .iter()
            .map(|&x| {
                let mean_depth =
                    forest.iter().map(|tree| tree.path_length(x, 0)).sum::<f64>() / self.trees as f64;
                -(2f64.powf(-mean_depth / normaliser))
            })
            .collect()
    }
}

impl OutlierDetector for IsolationForest {
    fn fit_predict(&self, values: &[f64]) -> Vec<bool> {
        if values.len() < 2 {
            return vec![false; values.len()];
        }
        let scores = self.score_samples(values);
        let offset = stats::percentile(&scores, 100.0 * self.contamination);
        scores.iter().map(|s| *s < offset).collect()
    }

    fn name(&self) -> &'static str {
        "isolation_forest"
    }
}

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn grow(values: &mut [f64], depth: usize, max_depth: usize, rng: &mut ChaCha8Rng) -> Node {
        let size = values.len();
        if depth >= max_depth || size <= 1 {
            return Node::Leaf { size };
        }

        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        if min >= max {
            return Node::Leaf { size };
        }

        let threshold = rng.gen_range(min..max);
        // In-place partition: values <= threshold move to the front.
        let mut split = 0;
        for i in 0..size {
            if values[i] <= threshold {
                values.swap(i, split);
                split += 1;
            }
        }

        let (left, right) = values.split_at_mut(split);
        Node::Split {
            threshold,
            left: Box::new(Node::grow(left, depth + 1, max_depth, rng)),
            right: Box::new(Node::grow(right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, x: f64, depth: usize) -> f64 {
        match self {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Split {
                threshold,
                left,
                right,
            } => {
                if x <= *threshold {
                    left.path_length(x, depth + 1)
                } else {
                    right.path_length(x, depth + 1)
                }
            }
        }
    }
}

/// Average path length of an unsuccessful search in a binary search tree of
/// `n` nodes; the expected depth still to go below a leaf holding `n` values.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_length_normaliser() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c5 = average_path_length(5);
        assert!((c5 - 2.327_020).abs() < 1e-5);
    }

    #[test]
    fn isolates_single_extreme_value() {
        let values = [10.0, 10.0, 10.0, 10.0, 1000.0];
        let flags = IsolationForest::default().fit_predict(&values);
        assert_eq!(flags, vec![false, false, false, false, true]);

        let scores = IsolationForest::default().score_samples(&values);
        assert!(scores[4] < scores[0]);
    }

    #[test]
    fn same_seed_same_flags() {
        let values: Vec<f64> = (0..400).map(|i| ((i * 37) % 101) as f64).chain([5000.0]).collect();
        let forest = IsolationForest::default();
        assert_eq!(forest.fit_predict(&values), forest.fit_predict(&values));
        assert!(forest.fit_predict(&values)[400]);
    }

    #[test]
    fn flags_roughly_the_contamination_share() {
        let values: Vec<f64> = (0..200).map(|i| (i as f64 * 0.618).fract() * 100.0).collect();
        let flagged = IsolationForest::default()
            .fit_predict(&values)
            .into_iter()
            .filter(|f| *f)
            .count();
        assert!(flagged <= 12, "flagged {flagged}");
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(IsolationForest::new(0, 256, 0.05, 42).is_err());
        assert!(IsolationForest::new(100, 256, 0.0, 42).is_err());
        assert!(IsolationForest::new(100, 1, 0.05, 42).is_err());
    }
}
