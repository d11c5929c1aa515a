use std::fmt;
use std::sync::Arc;

use crate::analysis::measure::Measure;
use crate::error::RuleSetError;
use crate::language::{Domain, Term, VariableId};

use super::{Bindings, Match};

type GuardFn = dyn Fn(&Bindings) -> Option<Bindings> + Send + Sync;

/// Side condition of a rule.
///
/// A guard sees the bindings of the left-hand side and either rejects them or
/// returns them extended with the variables listed in [`Guard::binds`], which
/// the right-hand side may then use. Guards only ever see subterms that are
/// already in normal form.
#[derive(Clone)]
pub struct Guard {
    description: String,
    binds: Vec<VariableId>,
    eval: Arc<GuardFn>,
}

impl Guard {
    pub fn predicate(
        description: impl Into<String>,
        test: impl Fn(&Bindings) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            binds: Vec::new(),
            eval: Arc::new(move |bindings| test(bindings).then(|| bindings.clone())),
        }
    }

    /// A guard that computes the bindings for `binds` from the matched ones.
    pub fn computing(
        description: impl Into<String>,
        binds: &[VariableId],
        compute: impl Fn(&Bindings) -> Option<Bindings> + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            binds: binds.to_vec(),
            eval: Arc::new(move |bindings| {
                let computed = compute(bindings)?;
                bindings.try_merge(&computed)
            }),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn binds(&self) -> &[VariableId] {
        &self.binds
    }

    pub fn evaluate(&self, bindings: &Bindings) -> Option<Bindings> {
        (self.eval)(bindings)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("description", &self.description)
            .field("binds", &self.binds)
            .finish()
    }
}

/// A named, oriented rewrite rule `from -> to`, optionally guarded.
#[derive(Clone, Debug)]
pub struct Rule {
    name: String,
    from: Term,
    to: Term,
    guard: Option<Guard>,
    measure: Option<Measure>,
}

impl Rule {
    pub fn new(name: impl Into<String>, from: Term, to: Term) -> Result<Self, RuleSetError> {
        let name = name.into();
        if !matches!(from, Term::Symbol(_)) {
            return Err(RuleSetError::VariableLhs { rule: name });
        }
        Ok(Self {
            name,
            from,
            to,
            guard: None,
            measure: None,
        })
    }

    /// Builds a rule from two patterns in s-expression syntax.
    pub fn parse(domain: Domain, name: &str, from: &str, to: &str) -> Result<Self, RuleSetError> {
        let pattern = |source: &str| {
            domain
                .parse_pattern(source)
                .map_err(|source| RuleSetError::Pattern {
                    rule: name.to_owned(),
                    source,
                })
        };
        Self::new(name, pattern(from)?, pattern(to)?)
    }

    pub fn when(
        mut self,
        description: impl Into<String>,
        test: impl Fn(&Bindings) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.guard = Some(Guard::predicate(description, test));
        self
    }

    pub fn computing(
        mut self,
        description: impl Into<String>,
        binds: &[VariableId],
        compute: impl Fn(&Bindings) -> Option<Bindings> + Send + Sync + 'static,
    ) -> Self {
        self.guard = Some(Guard::computing(description, binds, compute));
        self
    }

    pub fn measured_by(mut self, measure: Measure) -> Self {
        self.measure = Some(measure);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn from(&self) -> &Term {
        &self.from
    }

    pub fn to(&self) -> &Term {
        &self.to
    }

    pub fn guard(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }

    pub fn measure(&self) -> Option<&Measure> {
        self.measure.as_ref()
    }

    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }

    /// Checks that every right-hand side variable is bound and that all
    /// operators belong to `domain`.
    pub fn validate(&self, domain: Domain) -> Result<(), RuleSetError> {
        let bound = self.from.variables();
        let computed = self.guard.as_ref().map(Guard::binds).unwrap_or_default();
        if let Some(variable) = self
            .to
            .variables()
            .into_iter()
            .find(|variable| !bound.contains(variable) && !computed.contains(variable))
        {
            return Err(RuleSetError::UnboundVariable {
                rule: self.name.clone(),
                variable,
            });
        }

        for (_, term) in self.from.preorder().chain(self.to.preorder()) {
            if let Some(op) = term.op() {
                if op.domain() != domain {
                    return Err(RuleSetError::ForeignOperator {
                        rule: self.name.clone(),
                        expected: domain,
                        found: op.domain(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Runs the guard, if any, on a match of the left-hand side.
    pub fn admit(&self, matched: &Match<'_>) -> Option<Bindings> {
        let bindings = matched.to_bindings();
        match &self.guard {
            Some(guard) => guard.evaluate(&bindings),
            None => Some(bindings),
        }
    }

    pub fn instantiate(&self, bindings: &Bindings) -> Term {
        self.to.substitute(bindings)
    }

    /// Rewrites `subject` at its root if the rule applies there.
    pub fn fire(&self, subject: &Term) -> Option<Term> {
        let matched = self.from.try_match(subject)?;
        self.admit(&matched).map(|bindings| self.instantiate(&bindings))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.name, self.from, self.to)?;
        if let Some(guard) = &self.guard {
            write!(f, " if {}", guard.description)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::RuleSetError;
    use crate::language::{Domain, Term};

    use super::Rule;

    fn term(text: &str) -> Term {
        Domain::Filter.parse_pattern(text).unwrap()
    }

    #[test]
    fn fires_at_root() {
        let rule = Rule::parse(Domain::Filter, "not-not", "(not (not $0))", "$0").unwrap();
        assert_eq!(rule.fire(&term(r#"(not (not (lit "a")))"#)), Some(term(r#"(lit "a")"#)));
        assert_eq!(rule.fire(&term(r#"(not (lit "a"))"#)), None);
    }

    #[test]
    fn guard_can_reject() {
        let rule = Rule::parse(Domain::Filter, "swap", "(union $0 $1)", "(union $1 $0)")
            .unwrap()
            .when("$1 < $0", |b| b.get(1) < b.get(0));
        assert!(rule.fire(&term(r#"(union (lit "b") (lit "a"))"#)).is_some());
        assert!(rule.fire(&term(r#"(union (lit "a") (lit "b"))"#)).is_none());
    }

    #[test]
    fn guard_can_compute_bindings() {
        let rule = Rule::parse(Domain::Filter, "wrap", "(lit $0)", "(not (lit $1))")
            .unwrap()
            .computing("$1 = $0", &[1], |b| Some(super::Bindings::single(1, b.get(0)?.clone())));
        rule.validate(Domain::Filter).unwrap();
        assert_eq!(
            rule.fire(&term(r#"(lit "a")"#)),
            Some(term(r#"(not (lit "a"))"#))
        );
    }

    #[test]
    fn validation() {
        assert!(matches!(
            Rule::parse(Domain::Filter, "var", "$0", "$0"),
            Err(RuleSetError::VariableLhs { .. })
        ));
        let unbound = Rule::parse(Domain::Filter, "unbound", "(not $0)", "$1").unwrap();
        assert!(matches!(
            unbound.validate(Domain::Filter),
            Err(RuleSetError::UnboundVariable { variable: 1, .. })
        ));
        let foreign = Rule::parse(Domain::Filter, "ok", "(not $0)", "$0").unwrap();
        assert!(matches!(
            foreign.validate(Domain::License),
            Err(RuleSetError::ForeignOperator { .. })
        ));
    }

    #[test]
    fn display() {
        let rule = Rule::parse(Domain::Filter, "not-not", "(not (not $0))", "$0").unwrap();
        assert_eq!(rule.to_string(), "not-not: (not (not $0)) -> $0");
    }
}
