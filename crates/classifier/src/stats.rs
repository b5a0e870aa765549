//! Small descriptive-statistics helpers shared by the classifier and scanners.

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`) around a precomputed mean.
pub fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Quantile of an ascending slice using linear interpolation between the
/// closest ranks (`pos = q * (n - 1)`). Returns 0 for an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// First and third quartiles of an unsorted slice.
pub fn quartiles(values: &[f64]) -> (f64, f64) {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75))
}

/// Percentile in `[0, 100]` with the same interpolation as `quantile_sorted`.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, pct / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolated_quartiles() {
        // Linear interpolation: Q1 at pos 0.75, Q3 at pos 2.25.
        let (q1, q3) = quartiles(&[40.0, 10.0, 30.0, 20.0]);
        assert!((q1 - 17.5).abs() < 1e-12);
        assert!((q3 - 32.5).abs() < 1e-12);
    }

    #[test]
    fn constant_series_has_exact_zero_spread() {
        let (q1, q3) = quartiles(&[10.0, 10.0, 10.0]);
        assert_eq!(q1, 10.0);
        assert_eq!(q3 - q1, 0.0);
    }

    #[test]
    fn empty_and_single() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(quartiles(&[]), (0.0, 0.0));
        assert_eq!(quartiles(&[7.0]), (7.0, 7.0));
        assert_eq!(population_std(&[], 0.0), 0.0);
    }

    #[test]
    fn population_std_divides_by_n() {
        let values = [10.0, 10.0, 10.0, 10.0, 1000.0];
        let m = mean(&values);
        assert_eq!(m, 208.0);
        assert!((population_std(&values, m) - 396.0).abs() < 1e-9);
    }

    #[test]
    fn percentile_bounds() {
        let values = [3.0, 1.0, 2.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 3.0);
        assert_eq!(percentile(&values, 50.0), 2.0);
    }
}
