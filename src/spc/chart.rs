//! Core control chart types.
//!
//! Defines the fundamental building blocks shared by the estimator, the run
//! rules and the report: the rule identifiers, the per-point violation label,
//! control limits and the sparse label proposals produced by detectors.
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.
//! - Nelson, L.S. (1984). "The Shewhart Control Chart — Tests for Special Causes",
//!   *Journal of Quality Technology* 16(4), pp. 237-239.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SpcError;

/// The eight Nelson tests for special causes of variation.
///
/// Variants are ordered by rule number, so `Ord` follows the numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rule {
    /// Point beyond control limits (Nelson Rule 1).
    BeyondLimits,

    /// 9 points in a row on same side of the mean (Nelson Rule 2).
    ///
    /// Indicates a sustained shift in the process mean.
    NineOneSide,

    /// 6 points in a row steadily increasing or decreasing (Nelson Rule 3).
    SixTrend,

    /// 14 alternating direction changes in a row (Nelson Rule 4).
    ///
    /// Indicates systematic variation (e.g., two alternating streams).
    FourteenAlternating,

    /// 2 out of 3 points beyond 2 sigma on same side (Nelson Rule 5).
    TwoOfThreeBeyond2Sigma,

    /// 4 out of 5 points beyond 1 sigma on same side (Nelson Rule 6).
    FourOfFiveBeyond1Sigma,

    /// 15 points in a row within 1 sigma of the mean (Nelson Rule 7).
    ///
    /// Indicates stratification.
    FifteenWithin1Sigma,

    /// 8 points in a row beyond 1 sigma on either side (Nelson Rule 8).
    ///
    /// Indicates a mixture pattern.
    EightBeyond1Sigma,
}

impl Rule {
    /// All rules in ascending id order.
    pub const ALL: [Rule; 8] = [
        Rule::BeyondLimits,
        Rule::NineOneSide,
        Rule::SixTrend,
        Rule::FourteenAlternating,
        Rule::TwoOfThreeBeyond2Sigma,
        Rule::FourOfFiveBeyond1Sigma,
        Rule::FifteenWithin1Sigma,
        Rule::EightBeyond1Sigma,
    ];

    /// Numeric rule id, 1 through 8.
    pub fn id(self) -> u8 {
        match self {
            Rule::BeyondLimits => 1,
            Rule::NineOneSide => 2,
            Rule::SixTrend => 3,
            Rule::FourteenAlternating => 4,
            Rule::TwoOfThreeBeyond2Sigma => 5,
            Rule::FourOfFiveBeyond1Sigma => 6,
            Rule::FifteenWithin1Sigma => 7,
            Rule::EightBeyond1Sigma => 8,
        }
    }

    /// Looks up a rule by its numeric id.
    pub fn from_id(id: u8) -> Option<Rule> {
        match id {
            1..=8 => Some(Self::ALL[usize::from(id) - 1]),
            _ => None,
        }
    }

    /// Minimum number of consecutive points the rule needs to fire.
    ///
    /// Rule 4 needs one seeding pair plus 14 reversals, i.e. 16 points.
    pub fn window(self) -> usize {
        match self {
            Rule::BeyondLimits => 1,
            Rule::NineOneSide => 9,
            Rule::SixTrend => 6,
            Rule::FourteenAlternating => 16,
            Rule::TwoOfThreeBeyond2Sigma => 3,
            Rule::FourOfFiveBeyond1Sigma => 5,
            Rule::FifteenWithin1Sigma => 15,
            Rule::EightBeyond1Sigma => 8,
        }
    }

    /// Human-readable statement of the test.
    pub fn description(self) -> &'static str {
        match self {
            Rule::BeyondLimits => "One point more than 3 standard deviations from the center line",
            Rule::NineOneSide => "Nine points in a row on the same side of the center line",
            Rule::SixTrend => "Six points in a row, all increasing or all decreasing",
            Rule::FourteenAlternating => "Fourteen points in a row alternating up and down",
            Rule::TwoOfThreeBeyond2Sigma => {
                "Two out of three points more than 2 sigma from the center line (same side)"
            }
            Rule::FourOfFiveBeyond1Sigma => {
                "Four out of five points more than 1 sigma from the center line (same side)"
            }
            Rule::FifteenWithin1Sigma => {
                "Fifteen points in a row within 1 sigma of the center line (either side)"
            }
            Rule::EightBeyond1Sigma => {
                "Eight points in a row more than 1 sigma from the center line (either side)"
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule {}", self.id())
    }
}

impl FromStr for Rule {
    type Err = SpcError;

    /// Accepts `"3"`, `"rule_3"`, `"rule3"`, `"Rule 3"` and `"Test 3"`,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let digits = ["test", "rule"]
            .iter()
            .find_map(|prefix| lower.strip_prefix(*prefix))
            .map(|rest| rest.trim_start_matches(['_', ' ']))
            .unwrap_or(lower.as_str());

        Some(digits)
            .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|d| d.parse::<u8>().ok())
            .and_then(Rule::from_id)
            .ok_or_else(|| SpcError::UnknownRule(s.to_string()))
    }
}

/// Verdict for a single point: clear, or the rule that flagged it.
///
/// A point carries at most one label even when several rules consider it a
/// contributor; which one survives is decided by the engine's precedence
/// policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationLabel {
    /// No rule flagged the point.
    #[default]
    Clear,
    /// The point was flagged by the given rule.
    Violated(Rule),
}

impl ViolationLabel {
    /// The rule that flagged the point, if any.
    pub fn rule(self) -> Option<Rule> {
        match self {
            ViolationLabel::Clear => None,
            ViolationLabel::Violated(rule) => Some(rule),
        }
    }

    /// Numeric code: 0 for clear, otherwise the rule id.
    pub fn code(self) -> u8 {
        self.rule().map_or(0, Rule::id)
    }

    pub fn is_violation(self) -> bool {
        matches!(self, ViolationLabel::Violated(_))
    }
}

impl From<Option<Rule>> for ViolationLabel {
    fn from(rule: Option<Rule>) -> Self {
        rule.map_or(ViolationLabel::Clear, ViolationLabel::Violated)
    }
}

/// Control limits for a chart.
///
/// # Invariants
///
/// - `lcl <= ucl` (enforced when limits are built)
/// - `lcl <= cl <= ucl` when both limits are derived from the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlLimits {
    /// Upper control limit (default `mean + 3 sigma`).
    pub ucl: f64,
    /// Center line (process mean).
    pub cl: f64,
    /// Lower control limit (default `mean - 3 sigma`).
    pub lcl: f64,
    /// Optional process target, passed through for rendering.
    pub target: Option<f64>,
}

impl ControlLimits {
    /// Returns `true` if `value` lies strictly outside `[lcl, ucl]`.
    pub fn is_beyond(&self, value: f64) -> bool {
        value > self.ucl || value < self.lcl
    }
}

/// A detector's claim that a point violates a rule.
///
/// Detectors emit sparse proposals; the engine merges them into one label
/// per point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Zero-based index of the flagged point.
    pub index: usize,
    /// The rule that fired.
    pub rule: Rule,
}

impl Proposal {
    pub fn new(index: usize, rule: Rule) -> Self {
        Self { index, rule }
    }
}
