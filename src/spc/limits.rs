//! Control limit calculation.
//!
//! Default limits sit three estimated sigmas either side of the mean.
//! Explicitly supplied limits take precedence and are not checked against the
//! data; only an inverted pair (`ucl < lcl`) is rejected.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::baseline::BaselineStatistics;
use super::chart::ControlLimits;
use crate::error::{Result, SpcError};

/// Sigma multiplier for the default (Shewhart) control limits.
pub const LIMIT_SIGMAS: f64 = 3.0;

/// Optional caller-supplied limits and target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitOverrides {
    pub ucl: Option<f64>,
    pub lcl: Option<f64>,
    pub target: Option<f64>,
}

impl LimitOverrides {
    pub fn with_ucl(mut self, ucl: f64) -> Self {
        self.ucl = Some(ucl);
        self
    }

    pub fn with_lcl(mut self, lcl: f64) -> Self {
        self.lcl = Some(lcl);
        self
    }

    pub fn with_target(mut self, target: f64) -> Self {
        self.target = Some(target);
        self
    }

    /// Returns `true` if either control limit is supplied.
    pub fn has_explicit_limits(&self) -> bool {
        self.ucl.is_some() || self.lcl.is_some()
    }

    /// Resolves the effective control limits for a baseline.
    ///
    /// # Errors
    ///
    /// Returns [`SpcError::InvalidLimits`] if the effective `ucl` is below the
    /// effective `lcl`, or if an explicit limit is non-finite. Returns
    /// [`SpcError::NumericOverflow`] if a derived limit exceeds the range of
    /// `f64`.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_spc::spc::{BaselineStatistics, LimitOverrides};
    ///
    /// let baseline = BaselineStatistics { mean: 10.0, sigma: 2.0 };
    /// let limits = LimitOverrides::default().resolve(&baseline).unwrap();
    /// assert!((limits.ucl - 16.0).abs() < 1e-12);
    /// assert!((limits.lcl - 4.0).abs() < 1e-12);
    ///
    /// let limits = LimitOverrides::default().with_ucl(12.0).resolve(&baseline).unwrap();
    /// assert!((limits.ucl - 12.0).abs() < 1e-12);
    /// ```
    pub fn resolve(&self, baseline: &BaselineStatistics) -> Result<ControlLimits> {
        let ucl = self.ucl.unwrap_or_else(|| baseline.upper(LIMIT_SIGMAS));
        let lcl = self.lcl.unwrap_or_else(|| baseline.lower(LIMIT_SIGMAS));

        let derived_overflow = (self.ucl.is_none() && !ucl.is_finite())
            || (self.lcl.is_none() && !lcl.is_finite());
        if derived_overflow {
            return Err(SpcError::NumericOverflow {
                quantity: "control limits",
            });
        }
        if !ucl.is_finite() || !lcl.is_finite() || ucl < lcl {
            return Err(SpcError::InvalidLimits { ucl, lcl });
        }
        if self.has_explicit_limits() && !(lcl..=ucl).contains(&baseline.mean) {
            warn!(
                ucl,
                lcl,
                mean = baseline.mean,
                "explicit control limits do not bracket the process mean"
            );
        }

        debug!(ucl, lcl, target = ?self.target, "resolved control limits");
        Ok(ControlLimits {
            ucl,
            cl: baseline.mean,
            lcl,
            target: self.target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline() -> BaselineStatistics {
        BaselineStatistics {
            mean: 25.0,
            sigma: 1.0,
        }
    }

    #[test]
    fn test_default_three_sigma() {
        let limits = LimitOverrides::default().resolve(&baseline()).expect("limits");
        assert!((limits.ucl - 28.0).abs() < f64::EPSILON);
        assert!((limits.cl - 25.0).abs() < f64::EPSILON);
        assert!((limits.lcl - 22.0).abs() < f64::EPSILON);
        assert_eq!(limits.target, None);
    }

    #[test]
    fn test_explicit_overrides_take_precedence() {
        let overrides = LimitOverrides::default()
            .with_ucl(40.0)
            .with_lcl(10.0)
            .with_target(24.0);
        let limits = overrides.resolve(&baseline()).expect("limits");
        assert!((limits.ucl - 40.0).abs() < f64::EPSILON);
        assert!((limits.lcl - 10.0).abs() < f64::EPSILON);
        assert_eq!(limits.target, Some(24.0));
    }

    #[test]
    fn test_single_override_keeps_other_default() {
        let limits = LimitOverrides::default()
            .with_lcl(24.0)
            .resolve(&baseline())
            .expect("limits");
        assert!((limits.ucl - 28.0).abs() < f64::EPSILON);
        assert!((limits.lcl - 24.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_inconsistent_limits_are_accepted() {
        // Limits not bracketing the mean are logged but allowed.
        let limits = LimitOverrides::default()
            .with_ucl(5.0)
            .with_lcl(1.0)
            .resolve(&baseline())
            .expect("limits");
        assert!((limits.ucl - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_inverted_limits_rejected() {
        let err = LimitOverrides::default()
            .with_ucl(10.0)
            .with_lcl(20.0)
            .resolve(&baseline())
            .unwrap_err();
        assert_eq!(err, SpcError::InvalidLimits { ucl: 10.0, lcl: 20.0 });
        assert!(err.is_configuration());
    }

    #[test]
    fn test_explicit_ucl_below_derived_lcl_rejected() {
        assert!(LimitOverrides::default()
            .with_ucl(20.0)
            .resolve(&baseline())
            .is_err());
    }

    #[test]
    fn test_zero_sigma_collapses_limits() {
        let b = BaselineStatistics {
            mean: 3.0,
            sigma: 0.0,
        };
        let limits = LimitOverrides::default().resolve(&b).expect("limits");
        assert!((limits.ucl - 3.0).abs() < f64::EPSILON);
        assert!((limits.lcl - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_derived_limit_overflow_is_data_error() {
        let b = BaselineStatistics {
            mean: 1.5e308,
            sigma: 1e308,
        };
        let err = LimitOverrides::default().resolve(&b).unwrap_err();
        assert_eq!(
            err,
            SpcError::NumericOverflow {
                quantity: "control limits"
            }
        );
        assert!(!err.is_configuration());

        let limits = LimitOverrides::default()
            .with_ucl(f64::MAX)
            .resolve(&b)
            .expect("explicit ucl");
        assert!((limits.ucl - f64::MAX).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overrides_deserialize() {
        let overrides: LimitOverrides =
            serde_json::from_str(r#"{"ucl": 30.0, "target": 25.0}"#).expect("json");
        assert_eq!(overrides.ucl, Some(30.0));
        assert_eq!(overrides.lcl, None);
        assert_eq!(overrides.target, Some(25.0));
        assert!(serde_json::from_str::<LimitOverrides>(r#"{"usl": 1.0}"#).is_err());
    }
}
