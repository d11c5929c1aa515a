//! Property checks of a rule set over a corpus of inputs.
//!
//! Corpus properties normalize every input and look for a concrete
//! violation, which is shrunk before it is reported. Confluence and
//! termination additionally draw on the critical pair and measure analyses.

pub mod corpus;
pub mod format;
pub mod report;
pub mod shrink;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::analysis::instances::Pools;
use crate::analysis::{
    CriticalPairAnalyzer, Joinability, LocalConfluence, Status, Termination, TerminationChecker,
};
use crate::config::{EngineConfig, VerifierConfig};
use crate::domains::Equivalence;
use crate::error::RuleSetError;
use crate::language::{Domain, Term};
use crate::rewriting::{RewriteEngine, RuleSet};

pub use report::{DomainReport, Property, PropertyResult, VerificationReport, Violation};

/// What one corpus input says about one property.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Verdict {
    Holds,
    Violated(String),
    /// The input says nothing, e.g. its normalization did not terminate.
    Undecided,
}

pub struct PropertyVerifier<'r> {
    rules: &'r RuleSet,
    config: VerifierConfig,
}

impl<'r> PropertyVerifier<'r> {
    pub fn new(rules: &'r RuleSet, config: VerifierConfig) -> Self {
        Self { rules, config }
    }

    fn domain(&self) -> Domain {
        self.rules.domain()
    }

    fn engine(&self) -> RewriteEngine<'r> {
        RewriteEngine::new(self.rules, self.config.engine.clone())
    }

    fn tracing_engine(&self) -> RewriteEngine<'r> {
        RewriteEngine::new(
            self.rules,
            EngineConfig {
                record_trace: true,
                ..self.config.engine.clone()
            },
        )
    }

    fn idempotence(&self, engine: &RewriteEngine<'_>, term: &Term) -> Verdict {
        let first = engine.normalize(term.clone());
        if !first.terminated {
            return Verdict::Undecided;
        }
        let second = engine.normalize(first.normal_form.clone());
        if second.steps_taken == 0 {
            Verdict::Holds
        } else {
            Verdict::Violated(format!(
                "normal form `{}` rewrites further to `{}`",
                first.normal_form, second.normal_form
            ))
        }
    }

    fn determinism(&self, engine: &RewriteEngine<'_>, term: &Term) -> Verdict {
        let first = engine.normalize(term.clone());
        for run in 1..=self.config.determinism_runs {
            let again = engine.normalize(term.clone());
            if again.normal_form != first.normal_form {
                return Verdict::Violated(format!(
                    "run {run} reached `{}` instead of `{}`",
                    again.normal_form, first.normal_form
                ));
            }
            if again.trace != first.trace {
                return Verdict::Violated(format!("run {run} took a different rewrite sequence"));
            }
        }
        Verdict::Holds
    }

    /// Replays leftmost-outermost normalization, checking that every
    /// contraction decreases the measure of the rule that fired.
    fn bounded_descent(&self, engine: &RewriteEngine<'_>, term: &Term) -> Verdict {
        let mut current = term.clone();
        for _ in 0..self.config.engine.max_steps {
            let Some(redex) = engine.find_redex(&current) else {
                return Verdict::Holds;
            };
            let Some(rule) = self.rules.rule(redex.rule_index) else {
                return Verdict::Undecided;
            };
            let next = engine.contract(current.clone(), &redex);
            let (Some(before), Some(after)) =
                (current.subterm(&redex.position), next.subterm(&redex.position))
            else {
                return Verdict::Undecided;
            };
            if let Some(measure) = rule.measure() {
                if !measure.decreases(before, after) {
                    return Verdict::Violated(format!(
                        "`{}` at {} does not decrease {}: {} to {}",
                        rule.name(),
                        redex.position,
                        measure.name(),
                        measure.evaluate(before),
                        measure.evaluate(after)
                    ));
                }
            }
            current = next;
        }
        match engine.find_redex(&current) {
            None => Verdict::Holds,
            Some(_) => Verdict::Violated(format!(
                "no normal form within {} steps",
                self.config.engine.max_steps
            )),
        }
    }

    fn soundness(&self, engine: &RewriteEngine<'_>, term: &Term) -> Verdict {
        let result = engine.normalize(term.clone());
        if !result.terminated {
            return Verdict::Undecided;
        }
        match self.domain().equivalent(term, &result.normal_form) {
            Equivalence::Equivalent => Verdict::Holds,
            Equivalence::Different(witness) => Verdict::Violated(witness),
            Equivalence::Undecided(reason) => {
                tracing::trace!(%reason, "equivalence undecided");
                Verdict::Undecided
            }
        }
    }

    fn round_trip(&self, engine: &RewriteEngine<'_>, term: &Term) -> Verdict {
        let result = engine.normalize(term.clone());
        if !result.terminated {
            return Verdict::Undecided;
        }
        let text = self.domain().serialize(&result.normal_form);
        let parsed = match self.domain().parse(&text) {
            Ok(parsed) => parsed,
            Err(error) => return Verdict::Violated(format!("`{text}` does not parse: {error}")),
        };
        if parsed.structural_equals(&result.normal_form) {
            Verdict::Holds
        } else {
            Verdict::Violated(format!(
                "`{text}` parses to `{parsed}`, not `{}`",
                result.normal_form
            ))
        }
    }

    fn strategy_independence(
        &self,
        engine: &RewriteEngine<'_>,
        index: usize,
        term: &Term,
    ) -> Verdict {
        let expected = engine.normalize(term.clone());
        if !expected.terminated {
            return Verdict::Undecided;
        }
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(index as u64));
        for _ in 0..self.config.strategy_runs {
            let random = engine.normalize_randomly(term.clone(), &mut rng);
            if !random.terminated {
                return Verdict::Undecided;
            }
            if random.normal_form != expected.normal_form {
                return Verdict::Violated(format!(
                    "a random strategy reached `{}` instead of `{}`",
                    random.normal_form, expected.normal_form
                ));
            }
        }
        Verdict::Holds
    }

    fn check(
        &self,
        property: Property,
        engine: &RewriteEngine<'_>,
        index: usize,
        term: &Term,
    ) -> Verdict {
        match property {
            Property::Idempotence => self.idempotence(engine, term),
            Property::Determinism => self.determinism(engine, term),
            Property::Termination => self.bounded_descent(engine, term),
            Property::Soundness => self.soundness(engine, term),
            Property::RoundTrip => self.round_trip(engine, term),
            Property::StrategyIndependence => self.strategy_independence(engine, index, term),
            Property::Confluence => Verdict::Undecided,
        }
    }

    /// Checks `property` on every corpus term and shrinks the first
    /// violations found.
    fn corpus_property(&self, property: Property, corpus: &[Term]) -> PropertyResult {
        let engine = match property {
            Property::Determinism => self.tracing_engine(),
            _ => self.engine(),
        };
        let verdicts: Vec<Verdict> = corpus
            .par_iter()
            .enumerate()
            .map(|(index, term)| self.check(property, &engine, index, term))
            .collect();

        let undecided = verdicts.iter().filter(|verdict| **verdict == Verdict::Undecided).count();
        let violations: Vec<Violation> = verdicts
            .into_iter()
            .enumerate()
            .filter_map(|(index, verdict)| match verdict {
                Verdict::Violated(detail) => Some((index, detail)),
                _ => None,
            })
            .take(self.config.max_violations)
            .map(|(index, detail)| {
                let input = &corpus[index];
                let minimal = shrink::shrink(input, self.config.shrink_limit, |candidate| {
                    matches!(self.check(property, &engine, index, candidate), Verdict::Violated(_))
                });
                tracing::debug!(%property, input = %input, %detail, "violation");
                Violation {
                    input: self.domain().serialize(input),
                    minimal: minimal.map(|term| self.domain().serialize(&term)),
                    detail,
                }
            })
            .collect();

        let result = PropertyResult::new(property, corpus.len(), violations);
        if !corpus.is_empty() && undecided == corpus.len() {
            result.with_status(Status::Unknown).with_note("no input could be decided")
        } else if undecided > 0 {
            result.with_note(format!("{undecided} inputs undecided"))
        } else {
            result
        }
    }

    fn confluence(&self, local: &LocalConfluence, termination: Status) -> PropertyResult {
        let violations = local
            .violations()
            .take(self.config.max_violations)
            .filter_map(|verdict| match &verdict.joinability {
                Joinability::NotJoinable {
                    instance,
                    outer_normal_form,
                    inner_normal_form,
                } => Some(Violation {
                    input: self.display(instance),
                    minimal: None,
                    detail: format!(
                        "`{}` and `{}` overlap at {} and reach `{}` and `{}`",
                        verdict.pair.outer,
                        verdict.pair.inner,
                        verdict.pair.position,
                        self.display(outer_normal_form),
                        self.display(inner_normal_form)
                    ),
                }),
                _ => None,
            })
            .collect();

        let mut result = PropertyResult::new(Property::Confluence, local.pairs.len(), violations)
            .with_status(Status::confluence(local.status, termination));
        let unknown = local
            .pairs
            .iter()
            .filter(|verdict| verdict.joinability.status() == Status::Unknown)
            .count();
        if unknown > 0 {
            result = result.with_note(format!("{unknown} critical pairs undecided"));
        } else if termination != Status::Pass && local.status == Status::Pass {
            result =
                result.with_note("every critical pair joins but termination is not established");
        }
        result
    }

    fn termination(&self, checked: &Termination, corpus: &[Term]) -> PropertyResult {
        let replay = self.corpus_property(Property::Termination, corpus);
        let mut violations = replay.violations;
        for rule in &checked.rules {
            if violations.len() >= self.config.max_violations {
                break;
            }
            if let Some(counterexample) = &rule.counterexample {
                violations.push(Violation {
                    input: self.display(&counterexample.instance),
                    minimal: None,
                    detail: format!(
                        "`{}` rewrites to `{}` but {} goes from {} to {}",
                        rule.rule,
                        self.display(&counterexample.reduct),
                        rule.measure.unwrap_or("its measure"),
                        counterexample.before,
                        counterexample.after
                    ),
                });
            } else if rule.status == Status::Fail {
                violations.push(Violation {
                    input: rule.rule.clone(),
                    minimal: None,
                    detail: rule
                        .reason
                        .clone()
                        .unwrap_or_else(|| "rule does not terminate".to_owned()),
                });
            }
        }

        let undecided_rules = checked
            .rules
            .iter()
            .filter(|rule| rule.status == Status::Unknown)
            .count();
        let checks = corpus.len() + checked.rules.len();
        let mut result = PropertyResult::new(Property::Termination, checks, violations)
            .with_status(replay.status)
            .with_status(checked.status);
        if undecided_rules > 0 {
            result = result.with_note(format!("{undecided_rules} rules without decisive evidence"));
        } else if let Some(note) = replay.note {
            result = result.with_note(note);
        }
        result
    }

    /// Surface syntax for ground terms, patterns for the rest.
    fn display(&self, term: &Term) -> String {
        if term.is_ground() {
            self.domain().serialize(term)
        } else {
            term.to_string()
        }
    }

    pub fn verify(&self) -> DomainReport {
        let domain = self.domain();
        let span = tracing::info_span!("verify", %domain, rules = %self.rules.identity());
        let _guard = span.enter();

        let config = &self.config;
        let corpus: Vec<Term> =
            corpus::build(domain, config.corpus_size, config.seed, config.max_depth)
                .into_iter()
                .map(|entry| entry.term)
                .collect();
        let engine = self.engine();
        let pools = Pools::build(domain, &engine, config.seed, config.max_depth);
        let local_confluence =
            CriticalPairAnalyzer::new(self.engine(), pools.clone(), config.max_instances).analyze();
        let termination =
            TerminationChecker::new(self.engine(), pools, config.max_instances).check();

        // Newman's lemma needs the full termination verdict, corpus replay included.
        let terminates = self.termination(&termination, &corpus);
        let mut properties = Vec::with_capacity(Property::ALL.len());
        for property in Property::ALL {
            let result = match property {
                Property::Confluence => self.confluence(&local_confluence, terminates.status),
                Property::Termination => terminates.clone(),
                _ => self.corpus_property(property, &corpus),
            };
            tracing::info!(
                %property,
                status = %result.status,
                violations = result.violations.len(),
                "checked"
            );
            properties.push(result);
        }

        DomainReport {
            domain,
            ruleset: self.rules.identity(),
            corpus: corpus.len(),
            properties,
            local_confluence,
            termination,
        }
    }
}

/// Verifies the shipped rule set of every domain in `domains`.
pub fn verify_domains(
    domains: &[Domain],
    config: &VerifierConfig,
) -> Result<VerificationReport, RuleSetError> {
    let mut reports = Vec::with_capacity(domains.len());
    for domain in domains {
        let rules = domain.ruleset()?;
        reports.push(PropertyVerifier::new(&rules, config.clone()).verify());
    }
    Ok(VerificationReport {
        seed: config.seed,
        domains: reports,
    })
}

#[cfg(test)]
mod tests {
    use crate::analysis::Status;
    use crate::analysis::measure::{Measure, NODE_COUNT};
    use crate::config::VerifierConfig;
    use crate::domains::filter::FilterOp;
    use crate::language::{Domain, Term};
    use crate::rewriting::{Rule, RuleSet};

    use super::{Property, PropertyVerifier};

    fn small() -> VerifierConfig {
        VerifierConfig {
            corpus_size: 30,
            max_instances: 256,
            ..VerifierConfig::default()
        }
    }

    #[test]
    fn license_rules_pass_corpus_properties() {
        let rules = Domain::License.ruleset().unwrap();
        let report = PropertyVerifier::new(&rules, small()).verify();
        for property in [Property::Idempotence, Property::Determinism, Property::RoundTrip] {
            let result = report.property(property).unwrap();
            assert_eq!(result.status, Status::Pass, "{property}: {:?}", result.violations);
        }
        assert_ne!(report.property(Property::Soundness).unwrap().status, Status::Fail);
    }

    #[test]
    fn unsound_rules_are_caught_and_shrunk() {
        let rules = RuleSet::new(
            Domain::Filter,
            "unsound",
            "1",
            vec![
                Rule::parse(Domain::Filter, "drop-negation", "(not $0)", "$0")
                    .unwrap()
                    .measured_by(NODE_COUNT),
            ],
        )
        .unwrap();
        let report = PropertyVerifier::new(&rules, small()).verify();
        let soundness = report.property(Property::Soundness).unwrap();
        assert_eq!(soundness.status, Status::Fail);
        assert!(!soundness.violations[0].detail.is_empty());
        assert_eq!(report.status(), Status::Fail);
    }

    #[test]
    fn looping_rules_fail_termination() {
        let rules = RuleSet::new(
            Domain::Filter,
            "looping",
            "1",
            vec![
                Rule::parse(Domain::Filter, "swap", "(union $0 $1)", "(union $1 $0)")
                    .unwrap()
                    .measured_by(NODE_COUNT),
            ],
        )
        .unwrap();
        let config = VerifierConfig {
            engine: crate::config::EngineConfig {
                max_steps: 50,
                ..Default::default()
            },
            ..small()
        };
        let report = PropertyVerifier::new(&rules, config).verify();
        assert_eq!(report.property(Property::Termination).unwrap().status, Status::Fail);
        assert_ne!(report.property(Property::Confluence).unwrap().status, Status::Pass);
    }

    fn bare_lits(term: &Term) -> u64 {
        let wrapped = term
            .preorder()
            .filter(|(_, node)| node.has_op(FilterOp::Not))
            .flat_map(|(_, node)| node.children())
            .filter(|child| child.has_op(FilterOp::Lit))
            .count();
        let lits = term.preorder().filter(|(_, node)| node.has_op(FilterOp::Lit)).count();
        (lits - wrapped) as u64
    }

    const BARE_LITS: Measure = Measure::new("bare-lits", &[("bare", bare_lits)]);

    #[test]
    fn confluence_waits_for_the_corpus_replay() {
        // Each rule decreases its own measure, yet together they cycle.
        let rules = RuleSet::new(
            Domain::Filter,
            "cycling",
            "1",
            vec![
                Rule::parse(Domain::Filter, "not-not", "(not (not $0))", "$0")
                    .unwrap()
                    .measured_by(NODE_COUNT),
                Rule::parse(Domain::Filter, "wrap", "(lit $0)", "(not (not (lit $0)))")
                    .unwrap()
                    .measured_by(BARE_LITS),
            ],
        )
        .unwrap();
        let config = VerifierConfig {
            engine: crate::config::EngineConfig {
                max_steps: 200,
                ..Default::default()
            },
            ..small()
        };
        let report = PropertyVerifier::new(&rules, config).verify();
        assert_ne!(report.termination.status, Status::Fail);
        assert_eq!(report.property(Property::Termination).unwrap().status, Status::Fail);
        assert_ne!(report.property(Property::Confluence).unwrap().status, Status::Pass);
    }
}
