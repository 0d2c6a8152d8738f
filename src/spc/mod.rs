//! Statistical Process Control (SPC) run-rule evaluation.
//!
//! Evaluates an individual-observation chart: the process mean and a
//! moving-range sigma estimate define the center line and control limits,
//! and Nelson's eight tests annotate each point with the rule it violates.
//!
//! # Pipeline
//!
//! - [`BaselineStatistics`] — mean and moving-range sigma (MR-bar / d2)
//! - [`LimitOverrides`] — explicit or 3-sigma [`ControlLimits`], plus target
//! - [`RuleEngine`] — runs the enabled [`Rule`]s and merges their
//!   [`Proposal`]s under a [`Precedence`] policy
//! - [`VerdictReport`] — one [`VerdictRecord`] per observation
//!
//! # Run Rules
//!
//! - [`RuleConfiguration::all`] — Nelson's 8 rules (default)
//! - [`RuleConfiguration::western_electric`] — the 4 classic rules (1, 2, 5, 6)
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.
//! - ASTM E2587 — Standard Practice for Use of Control Charts
//! - Nelson, L.S. (1984). "The Shewhart Control Chart — Tests for Special Causes",
//!   *Journal of Quality Technology* 16(4), pp. 237-239.

mod baseline;
mod chart;
mod engine;
mod limits;
mod report;
mod rules;

pub use baseline::{moving_ranges, BaselineStatistics, D2_MOVING_RANGE, MIN_OBSERVATIONS};
pub use chart::{ControlLimits, Proposal, Rule, ViolationLabel};
pub use engine::{evaluate, EvaluationOptions, Precedence, RuleConfiguration, RuleEngine};
pub use limits::{LimitOverrides, LIMIT_SIGMAS};
pub use report::{ExportRow, VerdictRecord, VerdictReport};
pub use rules::{AlternationTracker, Rule4State, RuleContext, RunRule, WindowLabeling, ALTERNATIONS};
