//! Error types for control chart evaluation.
//!
//! Two families of failure exist: the data cannot support a baseline
//! (too few, non-finite or overflowing observations), or the caller supplied an
//! inconsistent configuration. Both are fatal to an evaluation call and no
//! partial report is produced.

use thiserror::Error;

/// Errors raised while evaluating a sequence against the run rules.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpcError {
    /// Fewer observations than the moving-range sigma estimate needs.
    #[error("insufficient data: got {got} observations, need at least {need}")]
    InsufficientData { got: usize, need: usize },

    /// An observation is NaN or infinite.
    #[error("non-finite observation at index {index}")]
    NonFiniteValue { index: usize },

    /// Finite observations whose mean, sigma or derived limits exceed the
    /// range of `f64`.
    #[error("numeric overflow computing {quantity}")]
    NumericOverflow { quantity: &'static str },

    /// Effective upper control limit is below the lower control limit.
    #[error("invalid control limits: ucl {ucl} is below lcl {lcl}")]
    InvalidLimits { ucl: f64, lcl: f64 },

    /// A rule configuration referenced a rule that does not exist.
    #[error("unknown rule: {0}")]
    UnknownRule(String),

    /// Stage labels do not line up with the observations.
    #[error("stage labels length {stages} does not match data length {data}")]
    StageLengthMismatch { data: usize, stages: usize },
}

impl SpcError {
    /// Returns `true` for errors caused by caller configuration rather than
    /// by the data itself.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SpcError::InvalidLimits { .. }
                | SpcError::UnknownRule(_)
                | SpcError::StageLengthMismatch { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SpcError>;
