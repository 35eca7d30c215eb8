//! Shared numeric helpers for the statistical calculators.

use serde::{Deserialize, Serialize};

/// Closed interval `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// `center +- half_width`, unclamped.
    pub fn around(center: f64, half_width: f64) -> Self {
        Self::new(center - half_width, center + half_width)
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.lower && x <= self.upper
    }
}

impl From<(f64, f64)> for Interval {
    fn from((lower, upper): (f64, f64)) -> Self {
        Self::new(lower, upper)
    }
}

/// Two-sided z-score for a confidence level.
///
/// 0.90 -> 1.645, 0.99 -> 2.576, anything else -> 1.96.
pub fn z_score(confidence_level: f64) -> f64 {
    if (confidence_level - 0.90).abs() < 1e-9 {
        1.645
    } else if (confidence_level - 0.99).abs() < 1e-9 {
        2.576
    } else {
        1.96
    }
}

/// Wilson score interval for `wins` successes out of `n` trials.
///
/// `n == 0` returns the maximal-uncertainty interval `(0.0, 1.0)`.
pub fn wilson_ci(wins: u64, n: u64, z: f64) -> (f64, f64) {
    if n == 0 {
        return (0.0, 1.0);
    }

    let p = wins as f64 / n as f64;
    let n_f = n as f64;
    let z2 = z * z;

    let denom = 1.0 + z2 / n_f;
    let center = (p + z2 / (2.0 * n_f)) / denom;
    let margin = z * (p * (1.0 - p) / n_f + z2 / (4.0 * n_f * n_f)).sqrt() / denom;

    ((center - margin).max(0.0), (center + margin).min(1.0))
}

/// Mean and sample standard deviation (n-1 divisor). `None` below two samples.
pub fn mean_and_sample_std(xs: &[f64]) -> Option<(f64, f64)> {
    if xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, var.sqrt()))
}

/// Clamp a symmetric `center +- half_width` interval into [0, 1].
pub fn unit_interval(center: f64, half_width: f64) -> (f64, f64) {
    (
        (center - half_width).clamp(0.0, 1.0),
        (center + half_width).clamp(0.0, 1.0),
    )
}
