//! Measure-based termination evidence.
//!
//! Every rule carries a lexicographic measure. A rule is shown terminating on
//! the sample pools when each ground instance of its left-hand side that the
//! rule actually rewrites measures strictly more than its reduct. Pools are
//! finite, so a pass is evidence rather than proof; a single counterexample
//! is conclusive.

use rayon::prelude::*;
use serde::Serialize;

use crate::language::{Position, Term};
use crate::rewriting::{RewriteEngine, Rule};

use super::Status;
use super::instances::Pools;
use super::measure::MeasureValue;

#[derive(Clone, Debug, Serialize)]
pub struct Counterexample {
    pub instance: Term,
    pub reduct: Term,
    pub before: MeasureValue,
    pub after: MeasureValue,
}

#[derive(Clone, Debug, Serialize)]
pub struct RuleTermination {
    pub rule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measure: Option<&'static str>,
    pub status: Status,
    /// Instances the rule rewrote.
    pub fired: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterexample: Option<Counterexample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Termination {
    pub status: Status,
    pub rules: Vec<RuleTermination>,
}

pub struct TerminationChecker<'r> {
    engine: RewriteEngine<'r>,
    pools: Pools,
    max_instances: usize,
}

impl<'r> TerminationChecker<'r> {
    pub fn new(engine: RewriteEngine<'r>, pools: Pools, max_instances: usize) -> Self {
        Self {
            engine,
            pools,
            max_instances,
        }
    }

    pub fn check_rule(&self, index: usize, rule: &Rule) -> RuleTermination {
        let verdict = |status, fired, counterexample, reason: Option<String>| RuleTermination {
            rule: rule.name().to_owned(),
            measure: rule.measure().map(|measure| measure.name()),
            status,
            fired,
            counterexample,
            reason,
        };

        let Some(measure) = rule.measure() else {
            return verdict(Status::Fail, 0, None, Some("no measure declared".to_owned()));
        };
        let Some(instances) = self.pools.instances(rule.from()) else {
            let reason = "no samples for some variable sort".to_owned();
            return verdict(Status::Unknown, 0, None, Some(reason));
        };
        let total = instances.total();

        let mut fired = 0;
        for instance in instances.take(self.max_instances) {
            let reduct = self.engine.rewrite_at(instance.clone(), index, &Position::root());
            let Some(reduct) = reduct else {
                continue;
            };
            fired += 1;
            let before = measure.evaluate(&instance);
            let after = measure.evaluate(&reduct);
            if before <= after {
                tracing::info!(rule = rule.name(), %before, %after, "measure does not decrease");
                let counterexample = Counterexample {
                    instance,
                    reduct,
                    before,
                    after,
                };
                return verdict(Status::Fail, fired, Some(counterexample), None);
            }
        }

        if fired == 0 {
            verdict(Status::Unknown, 0, None, Some("no sampled instance is rewritten".to_owned()))
        } else if total > self.max_instances {
            let reason = format!("sampled {} of {total} instances", self.max_instances);
            verdict(Status::Unknown, fired, None, Some(reason))
        } else {
            verdict(Status::Pass, fired, None, None)
        }
    }

    pub fn check(&self) -> Termination {
        let rules: Vec<RuleTermination> = self
            .engine
            .rules()
            .rules()
            .par_iter()
            .enumerate()
            .map(|(index, rule)| self.check_rule(index, rule))
            .collect();
        let status = rules.iter().map(|rule| rule.status).fold(Status::Pass, Status::combine);
        tracing::debug!(rules = %self.engine.rules().identity(), ?status, "termination checked");
        Termination { status, rules }
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::Status;
    use crate::analysis::instances::Pools;
    use crate::analysis::measure::NODE_COUNT;
    use crate::config::EngineConfig;
    use crate::language::Domain;
    use crate::rewriting::{RewriteEngine, Rule, RuleSet};

    use super::TerminationChecker;

    fn check(rules: Vec<Rule>) -> super::Termination {
        let rules = RuleSet::new(Domain::Filter, "test", "1", rules).unwrap();
        let engine = RewriteEngine::new(&rules, EngineConfig::default());
        let pools = Pools::build(Domain::Filter, &engine, 3, 2);
        TerminationChecker::new(engine, pools, 512).check()
    }

    #[test]
    fn shrinking_rules_pass() {
        let rules = vec![
            Rule::parse(Domain::Filter, "not-not", "(not (not $0))", "$0")
                .unwrap()
                .measured_by(NODE_COUNT),
        ];
        let report = check(rules);
        assert_eq!(report.status, Status::Pass);
        assert!(report.rules[0].fired > 0);
    }

    #[test]
    fn growing_rules_fail_with_a_counterexample() {
        let rules = vec![
            Rule::parse(Domain::Filter, "wrap", "(not (lit $0))", "(not (not (not (lit $0))))")
                .unwrap()
                .measured_by(NODE_COUNT),
        ];
        let report = check(rules);
        assert_eq!(report.status, Status::Fail);
        let counterexample = report.rules[0].counterexample.as_ref().unwrap();
        assert!(counterexample.before < counterexample.after);
    }

    #[test]
    fn rules_without_measure_fail() {
        let rules = vec![Rule::parse(Domain::Filter, "not-not", "(not (not $0))", "$0").unwrap()];
        let report = check(rules);
        assert_eq!(report.status, Status::Fail);
        assert!(report.rules[0].reason.is_some());
    }

    #[test]
    fn shipped_rule_sets_decrease_their_measures() {
        for domain in Domain::ALL {
            let rules = domain.ruleset().unwrap();
            let engine = RewriteEngine::new(&rules, EngineConfig::default());
            let pools = Pools::build(domain, &engine, 11, 2);
            let report = TerminationChecker::new(engine, pools, 1024).check();
            assert!(
                report.rules.iter().all(|rule| rule.status != Status::Fail),
                "{domain}: {:?}",
                report.rules.iter().filter(|rule| rule.status == Status::Fail).collect::<Vec<_>>()
            );
        }
    }
}
