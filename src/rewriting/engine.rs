//! Leftmost-outermost normalization.
//!
//! The engine repeatedly contracts the first redex met in a preorder
//! traversal; at a given position the first rule in declaration order wins.
//! Guarded rules are only admitted when every subterm bound by their
//! left-hand side is itself in normal form, which keeps guard decisions
//! stable under rewriting of the bound subterms.

use std::collections::HashMap;
use std::time::Instant;

use rand::Rng;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::language::{Position, Term};

use super::{Bindings, Rule, RuleSet};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RewriteStep {
    pub rule: String,
    pub rule_index: usize,
    pub position: Position,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    NormalForm,
    StepLimit,
    Deadline,
}

#[derive(Clone, Debug, Serialize)]
pub struct NormalizationResult {
    pub original: Term,
    pub normal_form: Term,
    pub steps_taken: usize,
    /// `true` iff `normal_form` admits no further rewrite.
    pub terminated: bool,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<RewriteStep>,
}

/// A rule instance ready to be contracted.
#[derive(Clone, Debug)]
pub struct Redex {
    pub rule_index: usize,
    pub position: Position,
    pub bindings: Bindings,
}

/// Normality of subterms of one borrowed term, keyed by address.
type Normality = HashMap<usize, bool>;

fn address(term: &Term) -> usize {
    term as *const Term as usize
}

pub struct RewriteEngine<'r> {
    rules: &'r RuleSet,
    config: EngineConfig,
}

impl<'r> RewriteEngine<'r> {
    pub fn new(rules: &'r RuleSet, config: EngineConfig) -> Self {
        Self { rules, config }
    }

    pub fn with_max_steps(rules: &'r RuleSet, max_steps: usize) -> Self {
        Self::new(
            rules,
            EngineConfig {
                max_steps,
                ..EngineConfig::default()
            },
        )
    }

    pub fn rules(&self) -> &'r RuleSet {
        self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn admit_with(&self, rule: &Rule, node: &Term, memo: &mut Normality) -> Option<Bindings> {
        let matched = rule.from().try_match(node)?;
        if rule.is_guarded() && !matched.terms().all(|bound| self.normal_in(bound, memo)) {
            return None;
        }
        rule.admit(&matched)
    }

    fn rule_at(&self, node: &Term, memo: &mut Normality) -> Option<(usize, Bindings)> {
        if !matches!(node, Term::Symbol(_)) {
            return None;
        }
        self.rules
            .rules()
            .iter()
            .enumerate()
            .find_map(|(index, rule)| Some((index, self.admit_with(rule, node, memo)?)))
    }

    /// Post-order over `term`; every subterm's normality is known before its parent's.
    fn normal_in(&self, term: &Term, memo: &mut Normality) -> bool {
        if let Some(&known) = memo.get(&address(term)) {
            return known;
        }

        let mut stack = vec![(term, false)];
        while let Some((node, expanded)) = stack.pop() {
            if memo.contains_key(&address(node)) {
                continue;
            }
            if !expanded && !node.children().is_empty() {
                stack.push((node, true));
                stack.extend(node.children().iter().map(|child| (child, false)));
                continue;
            }
            let normal = node
                .children()
                .iter()
                .all(|child| memo.get(&address(child)).copied().unwrap_or(true))
                && self.rule_at(node, memo).is_none();
            memo.insert(address(node), normal);
        }

        memo.get(&address(term)).copied().unwrap_or(true)
    }

    pub fn is_normal(&self, term: &Term) -> bool {
        self.normal_in(term, &mut Normality::new())
    }

    /// Bindings under which rule `rule_index` rewrites `subject` at its root.
    pub fn admits(&self, rule_index: usize, subject: &Term) -> Option<Bindings> {
        let rule = self.rules.rule(rule_index)?;
        self.admit_with(rule, subject, &mut Normality::new())
    }

    /// The leftmost-outermost redex of `term`.
    pub fn find_redex(&self, term: &Term) -> Option<Redex> {
        let mut memo = Normality::new();
        let mut stack = vec![(Position::root(), term)];

        while let Some((position, node)) = stack.pop() {
            if memo.get(&address(node)) == Some(&true) {
                continue;
            }
            if let Some((rule_index, bindings)) = self.rule_at(node, &mut memo) {
                return Some(Redex {
                    rule_index,
                    position,
                    bindings,
                });
            }
            for (index, child) in node.children().iter().enumerate().rev() {
                stack.push((position.child(index), child));
            }
        }

        None
    }

    /// Every rule instance applicable anywhere in `term`, in preorder.
    pub fn redexes(&self, term: &Term) -> Vec<Redex> {
        let mut memo = Normality::new();
        let mut found = Vec::new();
        for (position, node) in term.preorder() {
            if !matches!(node, Term::Symbol(_)) {
                continue;
            }
            for (rule_index, rule) in self.rules.rules().iter().enumerate() {
                if let Some(bindings) = self.admit_with(rule, node, &mut memo) {
                    found.push(Redex {
                        rule_index,
                        position: position.clone(),
                        bindings,
                    });
                }
            }
        }
        found
    }

    pub fn contract(&self, term: Term, redex: &Redex) -> Term {
        match self.rules.rule(redex.rule_index) {
            Some(rule) => term.replace_at(&redex.position, rule.instantiate(&redex.bindings)),
            None => term,
        }
    }

    fn record(&self, redex: &Redex) -> RewriteStep {
        RewriteStep {
            rule: self
                .rules
                .rule(redex.rule_index)
                .map(|rule| rule.name().to_owned())
                .unwrap_or_default(),
            rule_index: redex.rule_index,
            position: redex.position.clone(),
        }
    }

    /// One leftmost-outermost step, or `None` if `term` is in normal form.
    pub fn step(&self, term: Term) -> Option<(Term, RewriteStep)> {
        let redex = self.find_redex(&term)?;
        let step = self.record(&redex);
        Some((self.contract(term, &redex), step))
    }

    pub fn apply_step(&self, term: &Term) -> Option<Term> {
        self.step(term.clone()).map(|(next, _)| next)
    }

    /// Applies rule `rule_index` at `position` if it is admitted there.
    pub fn rewrite_at(&self, term: Term, rule_index: usize, position: &Position) -> Option<Term> {
        let bindings = self.admits(rule_index, term.subterm(position)?)?;
        let redex = Redex {
            rule_index,
            position: position.clone(),
            bindings,
        };
        Some(self.contract(term, &redex))
    }

    pub fn normalize(&self, term: Term) -> NormalizationResult {
        self.run(term, |engine, current| engine.find_redex(current))
    }

    /// Normalizes contracting a uniformly chosen redex at every step.
    pub fn normalize_randomly(&self, term: Term, rng: &mut impl Rng) -> NormalizationResult {
        self.run(term, |engine, current| {
            let mut candidates = engine.redexes(current);
            if candidates.is_empty() {
                return None;
            }
            let chosen = rng.gen_range(0..candidates.len());
            Some(candidates.swap_remove(chosen))
        })
    }

    fn run(
        &self,
        term: Term,
        mut select: impl FnMut(&Self, &Term) -> Option<Redex>,
    ) -> NormalizationResult {
        let original = term.clone();
        let started = Instant::now();
        let deadline = self.config.deadline();
        let mut current = term;
        let mut steps_taken = 0;
        let mut trace = Vec::new();

        let outcome = loop {
            if deadline.is_some_and(|deadline| started.elapsed() >= deadline) {
                break Outcome::Deadline;
            }
            let Some(redex) = select(self, &current) else {
                break Outcome::NormalForm;
            };
            if steps_taken >= self.config.max_steps {
                break Outcome::StepLimit;
            }
            tracing::trace!(
                rule = %self.record(&redex).rule,
                position = %redex.position,
                "rewrite"
            );
            if self.config.record_trace {
                trace.push(self.record(&redex));
            }
            current = self.contract(current, &redex);
            steps_taken += 1;
        };

        let terminated = outcome == Outcome::NormalForm;
        if !terminated {
            tracing::warn!(
                rules = %self.rules.identity(),
                steps = steps_taken,
                ?outcome,
                "normalization stopped before reaching a normal form"
            );
        }

        NormalizationResult {
            original,
            normal_form: current,
            steps_taken,
            terminated,
            outcome,
            trace,
        }
    }
}

/// Normalizes `term` under `rules` with at most `max_steps` rewrites.
pub fn normalize(term: Term, rules: &RuleSet, max_steps: usize) -> NormalizationResult {
    RewriteEngine::with_max_steps(rules, max_steps).normalize(term)
}

/// Performs one leftmost-outermost rewrite, `None` when `term` is in normal form.
pub fn apply_step(term: &Term, rules: &RuleSet) -> Option<Term> {
    RewriteEngine::new(rules, EngineConfig::default()).apply_step(term)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::config::EngineConfig;
    use crate::language::{Domain, Position, Term};
    use crate::rewriting::{Rule, RuleSet};

    use super::{Outcome, RewriteEngine, apply_step, normalize};

    fn term(text: &str) -> Term {
        Domain::Filter.parse_pattern(text).unwrap()
    }

    fn toy() -> RuleSet {
        let rules = vec![
            Rule::parse(Domain::Filter, "not-not", "(not (not $0))", "$0").unwrap(),
            Rule::parse(
                Domain::Filter,
                "union-idempotent",
                "(union $0 $0)",
                "$0",
            )
            .unwrap(),
        ];
        RuleSet::new(Domain::Filter, "toy", "1", rules).unwrap()
    }

    #[test]
    fn rewrites_outermost_first() {
        let rules = toy();
        let t = term(r#"(not (not (not (not (lit "a")))))"#);
        let engine = RewriteEngine::new(
            &rules,
            EngineConfig {
                record_trace: true,
                ..EngineConfig::default()
            },
        );
        let result = engine.normalize(t);
        assert_eq!(result.normal_form, term(r#"(lit "a")"#));
        assert_eq!(result.steps_taken, 2);
        assert!(result.terminated);
        assert!(result.trace.iter().all(|step| step.position == Position::root()));
    }

    #[test]
    fn normal_forms_are_fixed_points() {
        let rules = toy();
        let t = term(r#"(union (not (not (lit "a"))) (lit "a"))"#);
        let first = normalize(t, &rules, 100);
        assert_eq!(first.normal_form, term(r#"(lit "a")"#));
        let second = normalize(first.normal_form.clone(), &rules, 100);
        assert_eq!(second.normal_form, first.normal_form);
        assert_eq!(second.steps_taken, 0);
        assert!(apply_step(&first.normal_form, &rules).is_none());
    }

    #[test]
    fn step_limit_is_reported() {
        let flip = Rule::parse(Domain::Filter, "flip", "(union $0 $1)", "(union $1 $0)").unwrap();
        let loops = vec![flip];
        let rules = RuleSet::new(Domain::Filter, "loop", "1", loops).unwrap();
        let result = normalize(term(r#"(union (lit "a") (lit "b"))"#), &rules, 7);
        assert!(!result.terminated);
        assert_eq!(result.outcome, Outcome::StepLimit);
        assert_eq!(result.steps_taken, 7);
    }

    #[test]
    fn guards_wait_for_normal_bindings() {
        let rules = vec![
            Rule::parse(Domain::Filter, "not-not", "(not (not $0))", "$0").unwrap(),
            Rule::parse(Domain::Filter, "drop-literal", "(union (lit $0) $1)", "$1")
                .unwrap()
                .when("always", |_| true),
        ];
        let rules = RuleSet::new(Domain::Filter, "guarded", "1", rules).unwrap();
        let engine = RewriteEngine::with_max_steps(&rules, 100);
        let t = term(r#"(union (lit "a") (not (not (lit "b"))))"#);

        assert!(engine.admits(1, &t).is_none());
        let redex = engine.find_redex(&t).unwrap();
        assert_eq!(redex.rule_index, 0);
        assert_eq!(redex.position, Position::from(vec![1]));
        assert_eq!(engine.normalize(t).normal_form, term(r#"(lit "b")"#));
    }

    #[test]
    fn random_strategy_reaches_the_same_normal_form() {
        let rules = toy();
        let engine = RewriteEngine::with_max_steps(&rules, 100);
        let t = term(r#"(union (not (not (union (lit "a") (lit "a")))) (not (not (lit "a"))))"#);
        let expected = engine.normalize(t.clone()).normal_form;
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            assert_eq!(engine.normalize_randomly(t.clone(), &mut rng).normal_form, expected);
        }
    }

    #[test]
    fn rewrite_at_checks_applicability() {
        let rules = toy();
        let engine = RewriteEngine::with_max_steps(&rules, 100);
        let t = term(r#"(union (lit "a") (not (not (lit "b"))))"#);
        assert!(engine.rewrite_at(t.clone(), 0, &Position::root()).is_none());
        assert_eq!(
            engine.rewrite_at(t, 0, &Position::from(vec![1])),
            Some(term(r#"(union (lit "a") (lit "b"))"#))
        );
        assert_eq!(engine.redexes(&term(r#"(union (lit "a") (lit "a"))"#)).len(), 1);
    }
}
