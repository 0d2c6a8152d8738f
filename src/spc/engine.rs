//! Rule engine: configuration, orchestration and label merging.
//!
//! An evaluation estimates the baseline once, resolves the control limits
//! once, collects proposals from every enabled detector in ascending rule
//! order and finally merges them into a single label per point under an
//! explicit [`Precedence`] policy.
//!
//! Detectors only read the sequence and the shared context, so the merge is
//! the one place where rule ordering matters.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::baseline::BaselineStatistics;
use super::chart::{Proposal, Rule, ViolationLabel};
use super::limits::LimitOverrides;
use super::report::VerdictReport;
use super::rules::{RuleContext, RunRule, WindowLabeling};
use crate::error::{Result, SpcError};

/// Which rules run during an evaluation.
///
/// Deserializes from a map keyed by `rule_N` or by the `"Test N"` names used
/// by tabular front-ends; missing keys default to enabled, unknown keys are
/// rejected.
///
/// # Examples
///
/// ```
/// use u_spc::spc::{Rule, RuleConfiguration};
///
/// let config = RuleConfiguration::from_flags([("Test 4", false), ("rule_7", false)]).unwrap();
/// assert!(!config.is_enabled(Rule::FourteenAlternating));
/// assert!(config.is_enabled(Rule::BeyondLimits));
///
/// assert!(RuleConfiguration::from_flags([("Test 9", true)]).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfiguration {
    #[serde(alias = "Test 1")]
    pub rule_1: bool,
    #[serde(alias = "Test 2")]
    pub rule_2: bool,
    #[serde(alias = "Test 3")]
    pub rule_3: bool,
    #[serde(alias = "Test 4")]
    pub rule_4: bool,
    #[serde(alias = "Test 5")]
    pub rule_5: bool,
    #[serde(alias = "Test 6")]
    pub rule_6: bool,
    #[serde(alias = "Test 7")]
    pub rule_7: bool,
    #[serde(alias = "Test 8")]
    pub rule_8: bool,
}

impl Default for RuleConfiguration {
    fn default() -> Self {
        Self::all()
    }
}

impl RuleConfiguration {
    /// Every rule enabled.
    pub fn all() -> Self {
        Self {
            rule_1: true,
            rule_2: true,
            rule_3: true,
            rule_4: true,
            rule_5: true,
            rule_6: true,
            rule_7: true,
            rule_8: true,
        }
    }

    /// Every rule disabled.
    pub fn none() -> Self {
        Self {
            rule_1: false,
            rule_2: false,
            rule_3: false,
            rule_4: false,
            rule_5: false,
            rule_6: false,
            rule_7: false,
            rule_8: false,
        }
    }

    /// Only the listed rules enabled.
    pub fn only(rules: &[Rule]) -> Self {
        rules
            .iter()
            .fold(Self::none(), |config, &rule| config.enable(rule))
    }

    /// The four Western Electric rules (Nelson 1, 2, 5 and 6).
    pub fn western_electric() -> Self {
        Self::only(&[
            Rule::BeyondLimits,
            Rule::NineOneSide,
            Rule::TwoOfThreeBeyond2Sigma,
            Rule::FourOfFiveBeyond1Sigma,
        ])
    }

    /// Applies named on/off flags on top of the all-enabled default.
    ///
    /// Names are parsed with [`Rule`]'s `FromStr`.
    ///
    /// # Errors
    ///
    /// Returns [`SpcError::UnknownRule`] for a name that is not one of the
    /// eight rules.
    pub fn from_flags<I, K>(flags: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, bool)>,
        K: AsRef<str>,
    {
        flags.into_iter().try_fold(Self::all(), |config, (name, on)| {
            let rule = name.as_ref().parse::<Rule>()?;
            Ok(config.set(rule, on))
        })
    }

    pub fn enable(self, rule: Rule) -> Self {
        self.set(rule, true)
    }

    pub fn disable(self, rule: Rule) -> Self {
        self.set(rule, false)
    }

    pub fn set(mut self, rule: Rule, on: bool) -> Self {
        *self.flag_mut(rule) = on;
        self
    }

    pub fn is_enabled(&self, rule: Rule) -> bool {
        match rule {
            Rule::BeyondLimits => self.rule_1,
            Rule::NineOneSide => self.rule_2,
            Rule::SixTrend => self.rule_3,
            Rule::FourteenAlternating => self.rule_4,
            Rule::TwoOfThreeBeyond2Sigma => self.rule_5,
            Rule::FourOfFiveBeyond1Sigma => self.rule_6,
            Rule::FifteenWithin1Sigma => self.rule_7,
            Rule::EightBeyond1Sigma => self.rule_8,
        }
    }

    /// Enabled rules in ascending id order.
    pub fn enabled(&self) -> impl Iterator<Item = Rule> + '_ {
        Rule::ALL.into_iter().filter(|&rule| self.is_enabled(rule))
    }

    fn flag_mut(&mut self, rule: Rule) -> &mut bool {
        match rule {
            Rule::BeyondLimits => &mut self.rule_1,
            Rule::NineOneSide => &mut self.rule_2,
            Rule::SixTrend => &mut self.rule_3,
            Rule::FourteenAlternating => &mut self.rule_4,
            Rule::TwoOfThreeBeyond2Sigma => &mut self.rule_5,
            Rule::FourOfFiveBeyond1Sigma => &mut self.rule_6,
            Rule::FifteenWithin1Sigma => &mut self.rule_7,
            Rule::EightBeyond1Sigma => &mut self.rule_8,
        }
    }
}

impl RunRule for RuleConfiguration {
    /// Runs every enabled detector; proposals come back grouped by rule in
    /// ascending id order.
    fn check(&self, data: &[f64], context: &RuleContext) -> Vec<Proposal> {
        self.enabled()
            .flat_map(|rule| rule.check(data, context))
            .collect()
    }
}

/// How competing proposals for the same point are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    /// The highest-numbered rule wins, as if rules 1 through 8 wrote into
    /// one label array in order.
    #[default]
    HighestRuleWins,
    /// The lowest-numbered rule wins, so a 3-sigma excursion is never
    /// masked by a multi-point pattern.
    LowestRuleWins,
}

impl Precedence {
    /// Merges sparse proposals into one label per point.
    ///
    /// The result is independent of proposal order, so detectors may be run
    /// in any order (or concurrently) before merging.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_spc::spc::{Precedence, Proposal, Rule, ViolationLabel};
    ///
    /// let proposals = [
    ///     Proposal::new(2, Rule::BeyondLimits),
    ///     Proposal::new(2, Rule::TwoOfThreeBeyond2Sigma),
    /// ];
    /// let labels = Precedence::HighestRuleWins.merge(3, &proposals);
    /// assert_eq!(labels[2], ViolationLabel::Violated(Rule::TwoOfThreeBeyond2Sigma));
    ///
    /// let labels = Precedence::LowestRuleWins.merge(3, &proposals);
    /// assert_eq!(labels[2], ViolationLabel::Violated(Rule::BeyondLimits));
    /// ```
    pub fn merge(self, len: usize, proposals: &[Proposal]) -> Vec<ViolationLabel> {
        let mut winners: Vec<Option<Rule>> = vec![None; len];
        for proposal in proposals {
            let Some(slot) = winners.get_mut(proposal.index) else {
                continue;
            };
            *slot = Some(match (*slot, self) {
                (None, _) => proposal.rule,
                (Some(current), Precedence::HighestRuleWins) => current.max(proposal.rule),
                (Some(current), Precedence::LowestRuleWins) => current.min(proposal.rule),
            });
        }
        winners.into_iter().map(ViolationLabel::from).collect()
    }
}

/// Everything that parameterizes one evaluation besides the data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationOptions {
    pub rules: RuleConfiguration,
    pub limits: LimitOverrides,
    pub precedence: Precedence,
    pub window_labeling: WindowLabeling,
}

impl EvaluationOptions {
    pub fn with_rules(mut self, rules: RuleConfiguration) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_limits(mut self, limits: LimitOverrides) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn with_window_labeling(mut self, window_labeling: WindowLabeling) -> Self {
        self.window_labeling = window_labeling;
        self
    }
}

/// Evaluates sequences against the configured run rules.
///
/// The engine holds configuration only; every call to
/// [`evaluate`](Self::evaluate) owns its own baseline, limits and labels.
///
/// # Examples
///
/// ```
/// use u_spc::spc::{Rule, RuleEngine, ViolationLabel};
///
/// let report = RuleEngine::default().evaluate(&[0.0, 0.0, 0.0, 0.0, 50.0]).unwrap();
/// assert_eq!(report.len(), 5);
/// assert_eq!(report.records()[4].label, ViolationLabel::Violated(Rule::BeyondLimits));
/// assert!(!report.is_in_control());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    options: EvaluationOptions,
}

impl RuleEngine {
    pub fn new(options: EvaluationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    /// Evaluates `data` and returns one verdict per point.
    ///
    /// # Errors
    ///
    /// - [`SpcError::InsufficientData`] if `data` has fewer than 2 points
    /// - [`SpcError::NonFiniteValue`] if any point is NaN or infinite
    /// - [`SpcError::InvalidLimits`] if the effective `ucl` is below `lcl`
    /// - [`SpcError::NumericOverflow`] if the baseline or derived limits
    ///   exceed the range of `f64`
    pub fn evaluate(&self, data: &[f64]) -> Result<VerdictReport> {
        self.run(data, None)
    }

    /// Like [`evaluate`](Self::evaluate), carrying one stage label per point
    /// through to the report.
    ///
    /// # Errors
    ///
    /// Additionally returns [`SpcError::StageLengthMismatch`] when `stages`
    /// and `data` differ in length.
    pub fn evaluate_with_stages<S: AsRef<str>>(
        &self,
        data: &[f64],
        stages: &[S],
    ) -> Result<VerdictReport> {
        if stages.len() != data.len() {
            return Err(SpcError::StageLengthMismatch {
                data: data.len(),
                stages: stages.len(),
            });
        }
        let stages = stages.iter().map(|s| s.as_ref().to_string()).collect();
        self.run(data, Some(stages))
    }

    /// Builds the read-only detector context for `data`.
    ///
    /// # Errors
    ///
    /// Same as [`evaluate`](Self::evaluate).
    pub fn context(&self, data: &[f64]) -> Result<RuleContext> {
        let baseline = BaselineStatistics::estimate(data)?;
        let limits = self.options.limits.resolve(&baseline)?;
        Ok(RuleContext::new(baseline, limits).with_window_labeling(self.options.window_labeling))
    }

    /// Raw, unmerged proposals of every enabled rule, in ascending rule
    /// order.
    pub fn proposals(&self, data: &[f64], context: &RuleContext) -> Vec<Proposal> {
        self.options.rules.check(data, context)
    }

    fn run(&self, data: &[f64], stages: Option<Vec<String>>) -> Result<VerdictReport> {
        let context = self.context(data)?;
        let proposals = self.proposals(data, &context);
        let labels = self.options.precedence.merge(data.len(), &proposals);

        debug!(
            n = data.len(),
            proposals = proposals.len(),
            flagged = labels.iter().filter(|l| l.is_violation()).count(),
            precedence = ?self.options.precedence,
            "evaluation complete"
        );

        Ok(VerdictReport::new(
            data,
            labels,
            stages,
            context.baseline,
            context.limits,
        ))
    }
}

/// Evaluates `data` with all rules enabled and default limits.
///
/// # Errors
///
/// See [`RuleEngine::evaluate`].
pub fn evaluate(data: &[f64]) -> Result<VerdictReport> {
    RuleEngine::default().evaluate(data)
}
