//! Run rules for detecting non-random patterns in control chart data.
//!
//! Each of Nelson's eight tests is an independent, pure detector over the
//! raw sequence. A detector never mutates shared state; it returns sparse
//! [`Proposal`]s and leaves the choice of a single label per point to the
//! engine's merge step.
//!
//! Windows are evaluated only when fully contained in the sequence: a rule
//! whose window is longer than the data contributes nothing.
//!
//! # References
//!
//! - Nelson, L.S. (1984). "The Shewhart Control Chart — Tests for Special Causes",
//!   *Journal of Quality Technology* 16(4), pp. 237-239.
//! - Western Electric (1956). *Statistical Quality Control Handbook*.
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::baseline::BaselineStatistics;
use super::chart::{ControlLimits, Proposal, Rule};

/// Number of consecutive direction reversals that trips Rule 4.
pub const ALTERNATIONS: usize = 14;

/// Trait for applying run rules to a sequence.
///
/// Run rules detect non-random patterns that indicate special causes of
/// variation even when individual points remain within control limits.
pub trait RunRule {
    /// Check the sequence and return label proposals.
    ///
    /// A single point may appear in several proposals when more than one
    /// rule fires on it.
    fn check(&self, data: &[f64], context: &RuleContext) -> Vec<Proposal>;
}

/// Which points of a qualifying window Rules 7 and 8 label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowLabeling {
    /// Only the point at which the streak condition becomes true.
    #[default]
    TerminalPoint,
    /// Every point of the qualifying window.
    WholeWindow,
}

/// Read-only inputs shared by all detectors for one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleContext {
    pub baseline: BaselineStatistics,
    pub limits: ControlLimits,
    pub window_labeling: WindowLabeling,
}

impl RuleContext {
    pub fn new(baseline: BaselineStatistics, limits: ControlLimits) -> Self {
        Self {
            baseline,
            limits,
            window_labeling: WindowLabeling::default(),
        }
    }

    pub fn with_window_labeling(mut self, window_labeling: WindowLabeling) -> Self {
        self.window_labeling = window_labeling;
        self
    }

    fn zones(&self) -> Zones {
        Zones {
            upper_1s: self.baseline.upper(1.0),
            lower_1s: self.baseline.lower(1.0),
            upper_2s: self.baseline.upper(2.0),
            lower_2s: self.baseline.lower(2.0),
        }
    }
}

impl RunRule for Rule {
    fn check(&self, data: &[f64], context: &RuleContext) -> Vec<Proposal> {
        let proposals = match self {
            Rule::BeyondLimits => check_rule1(data, context),
            Rule::NineOneSide => check_rule2(data, context),
            Rule::SixTrend => check_rule3(data),
            Rule::FourteenAlternating => check_rule4(data),
            Rule::TwoOfThreeBeyond2Sigma => check_rule5(data, context),
            Rule::FourOfFiveBeyond1Sigma => check_rule6(data, context),
            Rule::FifteenWithin1Sigma => check_rule7(data, context),
            Rule::EightBeyond1Sigma => check_rule8(data, context),
        };
        trace!(rule = self.id(), hits = proposals.len(), "rule checked");
        proposals
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// 1-sigma and 2-sigma zone boundaries around the mean.
#[derive(Debug, Clone, Copy)]
struct Zones {
    upper_1s: f64,
    lower_1s: f64,
    upper_2s: f64,
    lower_2s: f64,
}

/// Sorted, de-duplicated proposals for one rule.
fn proposals_at(rule: Rule, mut indices: Vec<usize>) -> Vec<Proposal> {
    indices.sort_unstable();
    indices.dedup();
    indices
        .into_iter()
        .map(|index| Proposal::new(index, rule))
        .collect()
}

/// Marks points of each `width`-window where at least `min_count` points are
/// beyond the same-side threshold. Only the beyond-threshold points of the
/// triggering side are marked.
fn same_side_count(
    data: &[f64],
    width: usize,
    min_count: usize,
    upper: f64,
    lower: f64,
) -> Vec<usize> {
    let mut marked = Vec::new();
    for (start, window) in data.windows(width).enumerate() {
        let above = window.iter().filter(|&&v| v > upper).count();
        let below = window.iter().filter(|&&v| v < lower).count();

        if above >= min_count {
            marked.extend(
                window
                    .iter()
                    .enumerate()
                    .filter(|(_, &v)| v > upper)
                    .map(|(k, _)| start + k),
            );
        }
        if below >= min_count {
            marked.extend(
                window
                    .iter()
                    .enumerate()
                    .filter(|(_, &v)| v < lower)
                    .map(|(k, _)| start + k),
            );
        }
    }
    marked
}

/// Labels a qualifying streak window according to the labeling policy.
fn streak_indices(start: usize, width: usize, labeling: WindowLabeling) -> Vec<usize> {
    match labeling {
        WindowLabeling::TerminalPoint => vec![start + width - 1],
        WindowLabeling::WholeWindow => (start..start + width).collect(),
    }
}

// ---------------------------------------------------------------------------
// The eight detectors
// ---------------------------------------------------------------------------

/// Nelson Rule 1: point beyond the control limits.
fn check_rule1(data: &[f64], context: &RuleContext) -> Vec<Proposal> {
    data.iter()
        .enumerate()
        .filter(|(_, &v)| context.limits.is_beyond(v))
        .map(|(i, _)| Proposal::new(i, Rule::BeyondLimits))
        .collect()
}

/// Nelson Rule 2: 9 consecutive points strictly on the same side of the mean.
///
/// The 9th point of each qualifying window is labeled.
fn check_rule2(data: &[f64], context: &RuleContext) -> Vec<Proposal> {
    const WIDTH: usize = 9;
    let mean = context.baseline.mean;

    data.windows(WIDTH)
        .enumerate()
        .filter(|(_, w)| w.iter().all(|&v| v > mean) || w.iter().all(|&v| v < mean))
        .map(|(start, _)| Proposal::new(start + WIDTH - 1, Rule::NineOneSide))
        .collect()
}

/// Nelson Rule 3: 6 consecutive points strictly increasing or strictly
/// decreasing. Equal neighbours break the trend.
fn check_rule3(data: &[f64]) -> Vec<Proposal> {
    const WIDTH: usize = 6;

    data.windows(WIDTH)
        .enumerate()
        .filter(|(_, w)| {
            w.windows(2).all(|p| p[0] < p[1]) || w.windows(2).all(|p| p[0] > p[1])
        })
        .map(|(start, _)| Proposal::new(start + WIDTH - 1, Rule::SixTrend))
        .collect()
}

/// Direction of one step between consecutive points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    fn between(a: f64, b: f64) -> Self {
        if b > a {
            Direction::Up
        } else if b < a {
            Direction::Down
        } else {
            Direction::Flat
        }
    }
}

/// State of the Rule 4 alternation tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Rule4State {
    /// No direction established yet (start, or after a flat step).
    #[default]
    NoRun,
    /// Last step went up.
    Ascending,
    /// Last step went down.
    Descending,
}

/// Finite-state machine counting consecutive up/down reversals.
///
/// Each reversal records the turning point (the peak or trough). A step that
/// fails to alternate drops the recorded run; a repeated direction re-seeds a
/// fresh run in that direction, a flat step returns to [`Rule4State::NoRun`].
#[derive(Debug, Clone, Default)]
pub struct AlternationTracker {
    state: Rule4State,
    turning_points: Vec<usize>,
}

impl AlternationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Rule4State {
        self.state
    }

    /// Consecutive reversals in the current run.
    pub fn run_length(&self) -> usize {
        self.turning_points.len()
    }

    /// Feeds the step from `data[i]` (`from`) to `data[i + 1]` (`to`).
    ///
    /// Returns the turning points of the run when it reaches
    /// [`ALTERNATIONS`] reversals; the counter then restarts while the
    /// current direction is kept.
    pub fn observe(&mut self, i: usize, from: f64, to: f64) -> Option<Vec<usize>> {
        self.step(i, Direction::between(from, to))
    }

    fn step(&mut self, i: usize, direction: Direction) -> Option<Vec<usize>> {
        self.state = match (self.state, direction) {
            (Rule4State::Ascending, Direction::Down) => {
                self.turning_points.push(i);
                Rule4State::Descending
            }
            (Rule4State::Descending, Direction::Up) => {
                self.turning_points.push(i);
                Rule4State::Ascending
            }
            (_, Direction::Up) => {
                self.turning_points.clear();
                Rule4State::Ascending
            }
            (_, Direction::Down) => {
                self.turning_points.clear();
                Rule4State::Descending
            }
            (_, Direction::Flat) => {
                self.turning_points.clear();
                Rule4State::NoRun
            }
        };

        if self.turning_points.len() == ALTERNATIONS {
            Some(std::mem::take(&mut self.turning_points))
        } else {
            None
        }
    }
}

/// Nelson Rule 4: 14 consecutive up/down alternations.
///
/// Every turning point of a qualifying run is labeled.
fn check_rule4(data: &[f64]) -> Vec<Proposal> {
    let mut tracker = AlternationTracker::new();
    let mut marked = Vec::new();

    for (i, pair) in data.windows(2).enumerate() {
        if let Some(run) = tracker.observe(i, pair[0], pair[1]) {
            trace!(first = run[0], last = i, "alternating run");
            marked.extend(run);
        }
    }
    proposals_at(Rule::FourteenAlternating, marked)
}

/// Nelson Rule 5: at least 2 of 3 consecutive points beyond 2 sigma on the
/// same side.
fn check_rule5(data: &[f64], context: &RuleContext) -> Vec<Proposal> {
    let zones = context.zones();
    let marked = same_side_count(data, 3, 2, zones.upper_2s, zones.lower_2s);
    proposals_at(Rule::TwoOfThreeBeyond2Sigma, marked)
}

/// Nelson Rule 6: at least 4 of 5 consecutive points beyond 1 sigma on the
/// same side.
fn check_rule6(data: &[f64], context: &RuleContext) -> Vec<Proposal> {
    let zones = context.zones();
    let marked = same_side_count(data, 5, 4, zones.upper_1s, zones.lower_1s);
    proposals_at(Rule::FourOfFiveBeyond1Sigma, marked)
}

/// Nelson Rule 7: 15 consecutive points strictly within 1 sigma of the mean.
fn check_rule7(data: &[f64], context: &RuleContext) -> Vec<Proposal> {
    const WIDTH: usize = 15;
    let zones = context.zones();

    let marked = data
        .windows(WIDTH)
        .enumerate()
        .filter(|(_, w)| w.iter().all(|&v| v > zones.lower_1s && v < zones.upper_1s))
        .flat_map(|(start, _)| streak_indices(start, WIDTH, context.window_labeling))
        .collect();
    proposals_at(Rule::FifteenWithin1Sigma, marked)
}

/// Nelson Rule 8: 8 consecutive points strictly beyond 1 sigma, either side.
fn check_rule8(data: &[f64], context: &RuleContext) -> Vec<Proposal> {
    const WIDTH: usize = 8;
    let zones = context.zones();

    let marked = data
        .windows(WIDTH)
        .enumerate()
        .filter(|(_, w)| w.iter().all(|&v| v > zones.upper_1s || v < zones.lower_1s))
        .flat_map(|(start, _)| streak_indices(start, WIDTH, context.window_labeling))
        .collect();
    proposals_at(Rule::EightBeyond1Sigma, marked)
}
