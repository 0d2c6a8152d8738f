//! Baseline statistics for individual-observation charts.
//!
//! The process mean is the arithmetic mean of the observations. Process
//! variability is estimated from the average moving range of span 2 rather
//! than the sample standard deviation, so that a drifting or shifted series
//! does not inflate sigma.
//!
//! # Algorithm
//!
//! 1. Moving ranges: MR_i = |x_i - x_{i-1}| for i >= 1.
//! 2. MR-bar = mean(MR).
//! 3. sigma-hat = MR-bar / d2, with d2 = 1.128 for n = 2.
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.,
//!   Chapter 6: Control Charts for Variables.
//! - ASTM E2587 — Standard Practice for Use of Control Charts

use serde::{Deserialize, Serialize};
use tracing::debug;
use u_numflow::stats;

use crate::error::{Result, SpcError};

/// d2 bias-correction factor for a moving range of span 2.
pub const D2_MOVING_RANGE: f64 = 1.128;

/// Minimum number of observations needed to form one moving range.
pub const MIN_OBSERVATIONS: usize = 2;

/// Process center and spread estimated from one sequence.
///
/// # Examples
///
/// ```
/// use u_spc::spc::BaselineStatistics;
///
/// let baseline = BaselineStatistics::estimate(&[95.0, 105.0]).unwrap();
/// assert!((baseline.mean - 100.0).abs() < 1e-12);
/// assert!((baseline.sigma - 10.0 / 1.128).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineStatistics {
    /// Arithmetic mean of the observations.
    pub mean: f64,
    /// Moving-range estimate of the process standard deviation.
    pub sigma: f64,
}

impl BaselineStatistics {
    /// Estimates mean and sigma from an ordered sequence.
    ///
    /// # Errors
    ///
    /// - [`SpcError::InsufficientData`] if `data` has fewer than 2 values
    /// - [`SpcError::NonFiniteValue`] if any value is NaN or infinite
    /// - [`SpcError::NumericOverflow`] if the mean or sigma of finite values
    ///   is not representable as a finite `f64`
    pub fn estimate(data: &[f64]) -> Result<Self> {
        if data.len() < MIN_OBSERVATIONS {
            return Err(SpcError::InsufficientData {
                got: data.len(),
                need: MIN_OBSERVATIONS,
            });
        }
        if let Some(index) = data.iter().position(|v| !v.is_finite()) {
            return Err(SpcError::NonFiniteValue { index });
        }

        let (lo, hi) = data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        // Rounding must not push the mean outside the observed range; a
        // constant sequence keeps its exact value.
        let mean = finite_mean(data)
            .ok_or(SpcError::NumericOverflow { quantity: "mean" })?
            .clamp(lo, hi);
        let mr_bar = mean_moving_range(data)
            .ok_or(SpcError::NumericOverflow { quantity: "moving range" })?;
        let sigma = mr_bar / D2_MOVING_RANGE;
        if !sigma.is_finite() {
            return Err(SpcError::NumericOverflow { quantity: "sigma" });
        }

        debug!(n = data.len(), mean, mr_bar, sigma, "estimated baseline");
        Ok(Self { mean, sigma })
    }

    /// Value `k` sigmas above the mean.
    pub fn upper(&self, k: f64) -> f64 {
        self.mean + k * self.sigma
    }

    /// Value `k` sigmas below the mean.
    pub fn lower(&self, k: f64) -> f64 {
        self.mean - k * self.sigma
    }
}

/// Absolute differences between consecutive observations.
pub fn moving_ranges(data: &[f64]) -> Vec<f64> {
    data.windows(2).map(|w| (w[1] - w[0]).abs()).collect()
}

/// Mean of `values`, rescaled by `1/n` before summing when the plain sum
/// overflows. `None` if even the rescaled mean is not finite.
fn finite_mean(values: &[f64]) -> Option<f64> {
    match stats::mean(values) {
        Some(m) if m.is_finite() => Some(m),
        _ if values.is_empty() => None,
        _ => {
            let n = values.len() as f64;
            let m: f64 = values.iter().map(|v| v / n).sum();
            m.is_finite().then_some(m)
        }
    }
}

/// Average moving range. Differences that overflow are taken on halved
/// values and scaled back, so only a genuinely unrepresentable MR-bar fails.
fn mean_moving_range(data: &[f64]) -> Option<f64> {
    let ranges = moving_ranges(data);
    if ranges.iter().all(|r| r.is_finite()) {
        return finite_mean(&ranges);
    }
    let halved: Vec<f64> = data
        .windows(2)
        .map(|w| (w[1] / 2.0 - w[0] / 2.0).abs())
        .collect();
    let m = finite_mean(&halved)? * 2.0;
    m.is_finite().then_some(m)
}
