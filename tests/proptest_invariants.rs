use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use u_spc::spc::{
    BaselineStatistics, EvaluationOptions, Precedence, Rule, RuleConfiguration, RuleEngine,
    RunRule, ViolationLabel,
};

const MIN_PROPTEST_CASES: u32 = 256;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn sequence(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e3f64..1.0e3, 2..max_len)
}

fn configuration() -> impl Strategy<Value = RuleConfiguration> {
    prop::collection::vec(any::<bool>(), 8).prop_map(|flags| {
        Rule::ALL
            .into_iter()
            .zip(flags)
            .fold(RuleConfiguration::none(), |config, (rule, on)| {
                config.set(rule, on)
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        failure_persistence: Some(Box::new(FileFailurePersistence::Off)),
        ..ProptestConfig::default()
    })]

    #[test]
    fn report_is_aligned_with_input(data in sequence(80)) {
        let report = RuleEngine::default().evaluate(&data).expect("report");
        prop_assert_eq!(report.len(), data.len());
        prop_assert_eq!(report.order_indices(), (1..=data.len()).collect::<Vec<_>>());
        prop_assert_eq!(report.values(), data);
    }

    #[test]
    fn sigma_is_finite_and_non_negative(data in sequence(80)) {
        let baseline = BaselineStatistics::estimate(&data).expect("baseline");
        prop_assert!(baseline.sigma.is_finite());
        prop_assert!(baseline.sigma >= 0.0);
    }

    #[test]
    fn default_limits_bracket_mean(data in sequence(80)) {
        let report = RuleEngine::default().evaluate(&data).expect("report");
        let limits = report.limits();
        prop_assert!(limits.lcl <= report.mean());
        prop_assert!(report.mean() <= limits.ucl);
    }

    #[test]
    fn evaluation_is_idempotent(data in sequence(80), rules in configuration()) {
        let engine = RuleEngine::new(EvaluationOptions::default().with_rules(rules));
        let first = engine.evaluate(&data).expect("report");
        let second = engine.evaluate(&data).expect("report");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn labels_come_from_enabled_rules(data in sequence(80), rules in configuration()) {
        let engine = RuleEngine::new(EvaluationOptions::default().with_rules(rules));
        let report = engine.evaluate(&data).expect("report");
        for record in report.violations() {
            let rule = record.label.rule().expect("violation has a rule");
            prop_assert!(rules.is_enabled(rule));
        }
    }

    #[test]
    fn short_sequences_skip_long_windows(data in sequence(8)) {
        let engine = RuleEngine::default();
        let context = engine.context(&data).expect("context");
        for rule in Rule::ALL {
            if rule.window() > data.len() {
                prop_assert!(rule.check(&data, &context).is_empty(), "{} fired", rule);
            }
        }
    }

    #[test]
    fn constant_sequence_is_in_control(value in -1.0e3f64..1.0e3, n in 2usize..60) {
        let data = vec![value; n];
        let report = RuleEngine::default().evaluate(&data).expect("report");
        prop_assert!(report.sigma().abs() < f64::EPSILON);
        prop_assert!(report.is_in_control());
    }

    #[test]
    fn merge_is_order_independent(data in sequence(80)) {
        let engine = RuleEngine::default();
        let context = engine.context(&data).expect("context");
        let forward = engine.proposals(&data, &context);
        let mut reversed = forward.clone();
        reversed.reverse();

        for precedence in [Precedence::HighestRuleWins, Precedence::LowestRuleWins] {
            prop_assert_eq!(
                precedence.merge(data.len(), &forward),
                precedence.merge(data.len(), &reversed)
            );
        }
    }

    #[test]
    fn merge_matches_sequential_overwrite(data in sequence(80)) {
        let engine = RuleEngine::default();
        let context = engine.context(&data).expect("context");

        let mut sequential = vec![ViolationLabel::Clear; data.len()];
        for rule in Rule::ALL {
            for proposal in rule.check(&data, &context) {
                sequential[proposal.index] = ViolationLabel::Violated(rule);
            }
        }

        let report = engine.evaluate(&data).expect("report");
        prop_assert_eq!(report.labels(), sequential);
    }
}
