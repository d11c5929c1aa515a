//! Critical pairs and their joinability.
//!
//! For rules `l1 -> r1` and `l2 -> r2`, renamed apart, every non-variable
//! position `p` of `l1` whose subterm unifies with `l2` under `σ` yields the
//! overlap `l1σ` and the two one-step reducts `r1σ` and `l1σ[r2σ]_p`. Root
//! overlaps of a rule with itself are trivial and skipped.
//!
//! Unguarded rule sets are checked symbolically: both reducts are normalized
//! with the variables standing for constants. Guards cannot be decided on
//! open terms, so guarded rule sets are checked on ground instances of the
//! overlap drawn from the sample pools.

use rayon::prelude::*;
use serde::Serialize;

use crate::language::{Position, Term, VariableId};
use crate::rewriting::unification::unify;
use crate::rewriting::{Rule, RewriteEngine, RuleSet};

use super::Status;
use super::instances::Pools;

#[derive(Clone, Debug, Serialize)]
pub struct CriticalPair {
    pub outer: String,
    pub outer_index: usize,
    pub inner: String,
    pub inner_index: usize,
    pub position: Position,
    pub overlap: Term,
    /// Reduct of the outer rule at the root, present when its right-hand side
    /// is fully determined by the unifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outer_reduct: Option<Term>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_reduct: Option<Term>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "verdict", rename_all = "kebab-case")]
pub enum Joinability {
    Joinable {
        instances: usize,
    },
    NotJoinable {
        /// The overlap instance, ground when found by sampling.
        instance: Term,
        outer_normal_form: Term,
        inner_normal_form: Term,
    },
    Unknown {
        reason: String,
    },
}

impl Joinability {
    pub fn status(&self) -> Status {
        match self {
            Joinability::Joinable { .. } => Status::Pass,
            Joinability::NotJoinable { .. } => Status::Fail,
            Joinability::Unknown { .. } => Status::Unknown,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PairVerdict {
    pub pair: CriticalPair,
    pub joinability: Joinability,
}

#[derive(Clone, Debug, Serialize)]
pub struct LocalConfluence {
    pub status: Status,
    pub pairs: Vec<PairVerdict>,
}

impl LocalConfluence {
    pub fn violations(&self) -> impl Iterator<Item = &PairVerdict> {
        self.pairs
            .iter()
            .filter(|verdict| verdict.joinability.status() == Status::Fail)
    }
}

/// First variable id unused by `rule`, including variables its guard binds.
fn fresh_offset(rule: &Rule) -> VariableId {
    let guard_max = rule.guard().and_then(|guard| guard.binds().iter().max().copied());
    [rule.from().max_variable(), rule.to().max_variable(), guard_max]
        .into_iter()
        .flatten()
        .max()
        .map_or(0, |max| max + 1)
}

/// Overlaps of `inner` into `outer`.
fn overlaps(outer: (usize, &Rule), inner: (usize, &Rule)) -> Vec<CriticalPair> {
    let (outer_index, outer_rule) = outer;
    let (inner_index, inner_rule) = inner;
    let offset = fresh_offset(outer_rule);
    let inner_from = inner_rule.from().offset_variables(offset);
    let inner_to = inner_rule.to().offset_variables(offset);
    let outer_computes = outer_rule.guard().is_some_and(|guard| !guard.binds().is_empty());
    let inner_computes = inner_rule.guard().is_some_and(|guard| !guard.binds().is_empty());

    let mut pairs = Vec::new();
    for (position, subterm) in outer_rule.from().preorder() {
        if !matches!(subterm, Term::Symbol(_)) {
            continue;
        }
        if position.is_root() && outer_index == inner_index {
            continue;
        }
        let Some(unifier) = unify(subterm, &inner_from) else {
            continue;
        };

        let overlap = outer_rule.from().substitute(&unifier);
        let outer_reduct = (!outer_computes).then(|| outer_rule.to().substitute(&unifier));
        let inner_reduct = (!inner_computes)
            .then(|| overlap.clone().replace_at(&position, inner_to.substitute(&unifier)));
        pairs.push(CriticalPair {
            outer: outer_rule.name().to_owned(),
            outer_index,
            inner: inner_rule.name().to_owned(),
            inner_index,
            position,
            overlap,
            outer_reduct,
            inner_reduct,
        });
    }
    pairs
}

/// Every critical pair of `rules`, ordered by rule indices then position.
pub fn critical_pairs(rules: &RuleSet) -> Vec<CriticalPair> {
    let indexed: Vec<(usize, &Rule)> = rules.rules().iter().enumerate().collect();
    let mut pairs: Vec<CriticalPair> = indexed
        .par_iter()
        .flat_map_iter(|outer| indexed.iter().flat_map(move |inner| overlaps(*outer, *inner)))
        .collect();
    pairs.sort_by(|left, right| {
        (left.outer_index, left.inner_index, &left.position)
            .cmp(&(right.outer_index, right.inner_index, &right.position))
    });
    pairs
}

pub struct CriticalPairAnalyzer<'r> {
    engine: RewriteEngine<'r>,
    pools: Pools,
    max_instances: usize,
}

impl<'r> CriticalPairAnalyzer<'r> {
    pub fn new(engine: RewriteEngine<'r>, pools: Pools, max_instances: usize) -> Self {
        Self {
            engine,
            pools,
            max_instances,
        }
    }

    fn symbolic(&self, pair: &CriticalPair) -> Joinability {
        let (Some(outer), Some(inner)) = (&pair.outer_reduct, &pair.inner_reduct) else {
            return Joinability::Unknown {
                reason: "a reduct depends on a guard".to_owned(),
            };
        };
        let outer = self.engine.normalize(outer.clone());
        let inner = self.engine.normalize(inner.clone());
        if !outer.terminated || !inner.terminated {
            return Joinability::Unknown {
                reason: "a reduct did not reach a normal form".to_owned(),
            };
        }
        if outer.normal_form.structural_equals(&inner.normal_form) {
            Joinability::Joinable { instances: 1 }
        } else {
            Joinability::NotJoinable {
                instance: pair.overlap.clone(),
                outer_normal_form: outer.normal_form,
                inner_normal_form: inner.normal_form,
            }
        }
    }

    fn sampled(&self, pair: &CriticalPair) -> Joinability {
        let Some(instances) = self.pools.instances(&pair.overlap) else {
            return Joinability::Unknown {
                reason: "no samples for some variable sort".to_owned(),
            };
        };
        let total = instances.total();

        let mut joined = 0;
        let mut smallest: Option<Joinability> = None;
        let mut smallest_size = usize::MAX;
        for instance in instances.take(self.max_instances) {
            let root = Position::root();
            let engine = &self.engine;
            let Some(outer) = engine.rewrite_at(instance.clone(), pair.outer_index, &root) else {
                continue;
            };
            let inner = engine.rewrite_at(instance.clone(), pair.inner_index, &pair.position);
            let Some(inner) = inner else {
                continue;
            };
            let outer = self.engine.normalize(outer);
            let inner = self.engine.normalize(inner);
            if !outer.terminated || !inner.terminated {
                continue;
            }
            if outer.normal_form.structural_equals(&inner.normal_form) {
                joined += 1;
            } else if instance.size() < smallest_size {
                smallest_size = instance.size();
                smallest = Some(Joinability::NotJoinable {
                    instance,
                    outer_normal_form: outer.normal_form,
                    inner_normal_form: inner.normal_form,
                });
            }
        }

        match smallest {
            Some(violation) => violation,
            None if total > self.max_instances => Joinability::Unknown {
                reason: format!("sampled {} of {total} instances", self.max_instances),
            },
            None if joined == 0 => Joinability::Unknown {
                reason: "no sampled instance fires both rules".to_owned(),
            },
            None => Joinability::Joinable { instances: joined },
        }
    }

    pub fn check(&self, pair: &CriticalPair) -> Joinability {
        if self.engine.rules().has_guards() {
            self.sampled(pair)
        } else {
            self.symbolic(pair)
        }
    }

    pub fn analyze(&self) -> LocalConfluence {
        let pairs = critical_pairs(self.engine.rules());
        tracing::debug!(
            rules = %self.engine.rules().identity(),
            pairs = pairs.len(),
            "checking critical pairs"
        );

        let pairs: Vec<PairVerdict> = pairs
            .into_par_iter()
            .map(|pair| PairVerdict {
                joinability: self.check(&pair),
                pair,
            })
            .collect();

        let status = pairs
            .iter()
            .map(|verdict| verdict.joinability.status())
            .fold(Status::Pass, Status::combine);
        for verdict in pairs.iter().filter(|verdict| verdict.joinability.status() == Status::Fail) {
            tracing::info!(
                outer = %verdict.pair.outer,
                inner = %verdict.pair.inner,
                position = %verdict.pair.position,
                "critical pair does not join"
            );
        }
        LocalConfluence { status, pairs }
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::Status;
    use crate::analysis::instances::Pools;
    use crate::config::EngineConfig;
    use crate::language::Domain;
    use crate::rewriting::{RewriteEngine, Rule, RuleSet};

    use super::{CriticalPairAnalyzer, Joinability, critical_pairs};

    fn ruleset(rules: Vec<Rule>) -> RuleSet {
        RuleSet::new(Domain::Filter, "test", "1", rules).unwrap()
    }

    fn analyze(rules: &RuleSet) -> super::LocalConfluence {
        let engine = RewriteEngine::new(rules, EngineConfig::default());
        let pools = Pools::build(Domain::Filter, &engine, 1, 2);
        CriticalPairAnalyzer::new(engine, pools, 256).analyze()
    }

    #[test]
    fn double_negation_overlaps_itself_below_the_root() {
        let not_not = Rule::parse(Domain::Filter, "not-not", "(not (not $0))", "$0").unwrap();
        let rules = ruleset(vec![not_not]);
        let pairs = critical_pairs(&rules);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].position.indices(), &[0]);
        assert_eq!(
            pairs[0].overlap,
            Domain::Filter.parse_pattern("(not (not (not $1)))").unwrap()
        );

        let report = analyze(&rules);
        assert_eq!(report.status, Status::Pass);
    }

    #[test]
    fn diverging_rules_are_reported() {
        let rules = ruleset(vec![
            Rule::parse(Domain::Filter, "to-a", "(not $0)", r#"(lit "a")"#).unwrap(),
            Rule::parse(Domain::Filter, "to-b", "(not (lit $0))", r#"(lit "b")"#).unwrap(),
        ]);
        let report = analyze(&rules);
        assert_eq!(report.status, Status::Fail);
        let violation = report.violations().next().unwrap();
        assert!(matches!(violation.joinability, Joinability::NotJoinable { .. }));
    }

    #[test]
    fn guarded_pairs_are_sampled() {
        let rules = Domain::Filter.ruleset().unwrap();
        let engine = RewriteEngine::new(&rules, EngineConfig::default());
        let pools = Pools::build(Domain::Filter, &engine, 1, 2);
        let analyzer = CriticalPairAnalyzer::new(engine, pools, 64);
        let pairs = critical_pairs(&rules);
        assert!(!pairs.is_empty());
        let not_not = pairs
            .iter()
            .find(|pair| pair.outer == "not-not" && pair.inner == "not-not")
            .unwrap();
        assert!(matches!(analyzer.check(not_not), Joinability::Joinable { .. }));
    }

    #[test]
    fn pairs_no_sample_can_fire_stay_unknown() {
        let rules = ruleset(vec![
            Rule::parse(Domain::Filter, "not-not", "(not (not $0))", "$0").unwrap(),
            Rule::parse(Domain::Filter, "never", "(not $0)", "$0")
                .unwrap()
                .when("never holds", |_| false),
        ]);
        let report = analyze(&rules);
        let guarded = report
            .pairs
            .iter()
            .filter(|verdict| verdict.pair.outer == "never" || verdict.pair.inner == "never")
            .collect::<Vec<_>>();
        assert!(!guarded.is_empty());
        for verdict in guarded {
            let joinability = &verdict.joinability;
            assert!(matches!(joinability, Joinability::Unknown { .. }), "{joinability:?}");
        }
        assert_ne!(report.status, Status::Pass);
    }
}
