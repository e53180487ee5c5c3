//! Small statistics helpers for pattern analysis

use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Arithmetic mean (0.0 for an empty slice)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with an n-1 denominator (0.0 for fewer than 2 values)
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Coefficient of variation of amounts; 0.0 when the mean is zero
pub fn amount_coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m == 0.0 {
        return 0.0;
    }
    std_dev(values) / m.abs()
}

/// Gaps in (fractional) days between consecutive timestamps
///
/// Expects `dates` sorted ascending.
pub fn day_intervals(dates: &[DateTime<Utc>]) -> Vec<f64> {
    dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds() as f64 / SECONDS_PER_DAY)
        .collect()
}

/// Spacing statistics for a group's transactions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalStats {
    pub mean: f64,
    pub variance: f64,
    /// `sqrt(variance) / mean`, infinite when the mean gap is zero
    pub coefficient_of_variation: f64,
}

impl IntervalStats {
    /// Returns None when there are no intervals to describe
    pub fn from_intervals(intervals: &[f64]) -> Option<Self> {
        if intervals.is_empty() {
            return None;
        }
        let mean = mean(intervals);
        let variance = sample_variance(intervals);
        let coefficient_of_variation = if mean > 0.0 {
            variance.sqrt() / mean
        } else {
            f64::INFINITY
        };
        Some(Self {
            mean,
            variance,
            coefficient_of_variation,
        })
    }
}
