//! # u-spc
//!
//! Nelson run-rule evaluation for individual-observation control charts.
//!
//! Given an ordered sequence of measurements, the crate estimates the process
//! mean and a moving-range sigma, derives control limits, and reports for each
//! point whether it is implicated in an out-of-control signal and which rule
//! fired.
//!
//! This crate is domain-agnostic: it operates on raw `f64` data and knows
//! nothing about where the data came from or how the verdict is rendered.
//!
//! ## Modules
//!
//! - [`spc`] — baseline, control limits, the eight run rules and the report
//! - [`error`] — error taxonomy
//!
//! ## Quick start
//!
//! ```
//! use u_spc::spc::{EvaluationOptions, LimitOverrides, Precedence, RuleEngine};
//!
//! let data = [10.0, 10.4, 9.8, 10.1, 9.9, 10.2, 14.0];
//! let options = EvaluationOptions::default()
//!     .with_limits(LimitOverrides::default().with_target(10.0))
//!     .with_precedence(Precedence::LowestRuleWins);
//!
//! let report = RuleEngine::new(options).evaluate(&data).unwrap();
//! assert_eq!(report.len(), data.len());
//! assert_eq!(report.target(), Some(10.0));
//! for record in report.violations() {
//!     println!("point {} flagged by {:?}", record.order_index, record.label);
//! }
//! ```
//!
//! ## Design Philosophy
//!
//! - **Pure evaluation**: no I/O, no state shared between calls
//! - **Explicit precedence**: detectors propose, one merge step decides
//! - **Research-backed**: rules follow Nelson (1984)

pub mod error;
pub mod spc;

pub use error::{Result, SpcError};
