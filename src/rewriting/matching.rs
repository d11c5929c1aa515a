//! One-sided matching of rule patterns against terms.
//!
//! Variables occurring in the subject are treated as opaque constants, so the
//! same code serves ground terms and the symbolic terms built during critical
//! pair analysis.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::language::{Term, VariableId};

/// A successful match that borrows the subterms it binds.
#[derive(Clone, Debug, Default)]
pub struct Match<'t> {
    substitutions: BTreeMap<VariableId, &'t Term>,
}

impl<'t> Match<'t> {
    /// Gets the subterm bound to a variable.
    pub fn at(&self, variable: VariableId) -> Option<&'t Term> {
        self.substitutions.get(&variable).copied()
    }

    /// Binds `variable`, failing on a conflicting earlier binding.
    fn bind(&mut self, variable: VariableId, term: &'t Term) -> bool {
        match self.substitutions.get(&variable) {
            Some(existing) => *existing == term,
            None => {
                self.substitutions.insert(variable, term);
                true
            }
        }
    }

    pub fn terms(&self) -> impl Iterator<Item = &'t Term> + '_ {
        self.substitutions.values().copied()
    }

    pub fn to_bindings(&self) -> Bindings {
        Bindings(
            self.substitutions
                .iter()
                .map(|(variable, term)| (*variable, (*term).clone()))
                .collect(),
        )
    }
}

/// Owned variable assignment, the result of matching, unification or a guard.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Bindings(BTreeMap<VariableId, Term>);

impl Bindings {
    pub fn single(variable: VariableId, term: Term) -> Self {
        Self(BTreeMap::from([(variable, term)]))
    }

    pub fn get(&self, variable: VariableId) -> Option<&Term> {
        self.0.get(&variable)
    }

    pub fn insert(&mut self, variable: VariableId, term: Term) {
        self.0.insert(variable, term);
    }

    /// Adds a binding and returns `self`, for chaining in guards.
    pub fn with(mut self, variable: VariableId, term: Term) -> Self {
        self.insert(variable, term);
        self
    }

    pub fn contains(&self, variable: VariableId) -> bool {
        self.0.contains_key(&variable)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariableId, &Term)> {
        self.0.iter().map(|(variable, term)| (*variable, term))
    }

    pub fn terms_mut(&mut self) -> impl Iterator<Item = &mut Term> {
        self.0.values_mut()
    }

    /// Tries to merge two assignments, returning `None` if they conflict.
    pub fn try_merge(&self, other: &Self) -> Option<Self> {
        let mut merged = self.clone();
        for (variable, term) in &other.0 {
            match merged.0.get(variable) {
                Some(existing) if existing != term => return None,
                Some(_) => {}
                None => {
                    merged.0.insert(*variable, term.clone());
                }
            }
        }
        Some(merged)
    }
}

impl FromIterator<(VariableId, Term)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (VariableId, Term)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Term {
    /// `self` is treated as a pattern which may match `subject`.
    pub fn try_match<'t>(&self, subject: &'t Term) -> Option<Match<'t>> {
        let mut result = Match::default();
        let mut pending = vec![(self, subject)];

        while let Some((pattern, subject)) = pending.pop() {
            match (pattern, subject) {
                (Term::Variable(variable), subject) => {
                    if !result.bind(*variable, subject) {
                        return None;
                    }
                }
                (Term::Literal(expected), Term::Literal(found)) => {
                    if expected != found {
                        return None;
                    }
                }
                (Term::Symbol(expected), Term::Symbol(found)) => {
                    if expected.op != found.op || expected.children.len() != found.children.len() {
                        return None;
                    }
                    pending.extend(expected.children.iter().zip(&found.children).rev());
                }
                _ => return None,
            }
        }

        Some(result)
    }

    /// Instantiates the variables of `self` bound in `bindings`; unbound
    /// variables are kept as they are.
    pub fn substitute(&self, bindings: &Bindings) -> Term {
        self.transform(|term| match term {
            Term::Variable(variable) => bindings.get(*variable).cloned(),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::language::{Domain, Term};

    use super::Bindings;

    fn term(text: &str) -> Term {
        Domain::License.parse_pattern(text).unwrap()
    }

    #[test]
    fn binds_variables() {
        let pattern = term("(or $0 $1)");
        let subject = term(r#"(or (license "A") (and (license "B") (license "C")))"#);
        let matched = pattern.try_match(&subject).unwrap();
        assert_eq!(matched.at(0), Some(&term(r#"(license "A")"#)));
        assert_eq!(matched.at(1), Some(&term(r#"(and (license "B") (license "C"))"#)));
    }

    #[test]
    fn nonlinear_patterns_require_equal_subterms() {
        let pattern = term("(or $0 $0)");
        assert!(pattern.try_match(&term(r#"(or (license "A") (license "A"))"#)).is_some());
        assert!(pattern.try_match(&term(r#"(or (license "A") (license "B"))"#)).is_none());
    }

    #[test]
    fn literals_and_operators_must_agree() {
        assert!(term(r#"(license "A")"#).try_match(&term(r#"(license "B")"#)).is_none());
        assert!(term("(or $0 $1)").try_match(&term("(and $0 $1)")).is_none());
        assert!(term("(or $0 $1)").try_match(&term("$0")).is_none());
    }

    #[test]
    fn subject_variables_are_constants() {
        let subject = term("(or $1 $0)");
        let matched = term("(or $0 $1)").try_match(&subject).unwrap();
        assert_eq!(matched.at(0), Some(&Term::Variable(1)));
    }

    #[test]
    fn substitute_instantiates_bound_variables() {
        let bindings = Bindings::single(0, term(r#"(license "MIT")"#));
        assert_eq!(
            term("(and $0 $1)").substitute(&bindings),
            term(r#"(and (license "MIT") $1)"#)
        );
    }

    #[test]
    fn try_merge_detects_conflicts() {
        let a = Bindings::single(0, term(r#"(license "A")"#));
        let b = Bindings::single(0, term(r#"(license "B")"#));
        let c = Bindings::single(1, term(r#"(license "B")"#));
        assert!(a.try_merge(&b).is_none());
        assert_eq!(a.try_merge(&c).unwrap().len(), 2);
    }
}
