//! The five normalization domains.
//!
//! Each domain contributes a [`DomainSpec`]: a surface parser and serializer,
//! its rule set, sample terms per sort for the analyses, a random term
//! generator and curated inputs for the verifier, and a semantic oracle.

pub mod filter;
pub mod license;
pub mod metric;
pub mod rdf;
pub mod semver;

use rand::rngs::StdRng;
use serde::Serialize;

use crate::error::{ParseError, RuleSetError, check_depth};
use crate::language::{Domain, Literal, Sort, Term};
use crate::rewriting::{Rule, RuleSet};

/// Verdict of a domain oracle on a term and its normal form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "kebab-case")]
pub enum Equivalence {
    Equivalent,
    /// The two terms denote different values; carries a distinguishing witness.
    Different(String),
    /// The oracle cannot decide, for instance because the input is too large.
    Undecided(String),
}

pub trait DomainSpec {
    const DOMAIN: Domain;
    /// Sort of complete expressions.
    const ROOT: Sort;
    const RULESET: &'static str;
    const VERSION: &'static str;

    fn parse(source: &str) -> Result<Term, ParseError>;

    fn serialize(term: &Term) -> String;

    fn rules() -> Result<Vec<Rule>, RuleSetError>;

    /// Small normal-form terms of `sort`, substituted for rule variables.
    fn samples(sort: Sort) -> Vec<Term>;

    fn generate(rng: &mut StdRng, depth: usize) -> Term;

    /// Hand-picked surface inputs exercising edge cases.
    fn curated() -> &'static [&'static str];

    fn equivalent(original: &Term, normalized: &Term) -> Equivalence;

    /// Bare tokens accepted as literals in s-expression patterns.
    fn parse_atom(_token: &str) -> Option<Literal> {
        None
    }
}

macro_rules! with_spec {
    ($domain:expr, $spec:ident => $body:expr) => {
        match $domain {
            Domain::License => {
                type $spec = license::License;
                $body
            }
            Domain::SemVer => {
                type $spec = semver::SemVer;
                $body
            }
            Domain::Rdf => {
                type $spec = rdf::Rdf;
                $body
            }
            Domain::Metric => {
                type $spec = metric::Metric;
                $body
            }
            Domain::Filter => {
                type $spec = filter::Filter;
                $body
            }
        }
    };
}

pub(crate) fn parse_atom(domain: Domain, token: &str) -> Option<Literal> {
    with_spec!(domain, S => S::parse_atom(token))
}

impl Domain {
    /// Parses surface syntax into a term. Empty or whitespace-only input is
    /// rejected with [`ParseError::Empty`].
    pub fn parse(self, source: &str) -> Result<Term, ParseError> {
        if source.trim().is_empty() {
            return Err(ParseError::Empty { domain: self });
        }
        let term = with_spec!(self, S => S::parse(source))?;
        check_depth(&term)?;
        Ok(term)
    }

    pub fn serialize(self, term: &Term) -> String {
        with_spec!(self, S => S::serialize(term))
    }

    pub fn ruleset(self) -> Result<RuleSet, RuleSetError> {
        with_spec!(self, S => RuleSet::new(self, S::RULESET, S::VERSION, S::rules()?))
    }

    pub fn root_sort(self) -> Sort {
        with_spec!(self, S => S::ROOT)
    }

    pub fn samples(self, sort: Sort) -> Vec<Term> {
        with_spec!(self, S => S::samples(sort))
    }

    pub fn generate(self, rng: &mut StdRng, depth: usize) -> Term {
        with_spec!(self, S => S::generate(rng, depth))
    }

    pub fn curated(self) -> &'static [&'static str] {
        with_spec!(self, S => S::curated())
    }

    pub fn equivalent(self, original: &Term, normalized: &Term) -> Equivalence {
        with_spec!(self, S => S::equivalent(original, normalized))
    }
}

/// Turns a pest failure into a positioned syntax error.
pub(crate) fn syntax_error<R: pest::RuleType>(
    domain: Domain,
    error: pest::error::Error<R>,
) -> ParseError {
    let offset = match error.location {
        pest::error::InputLocation::Pos(position) => position,
        pest::error::InputLocation::Span((start, _)) => start,
    };
    ParseError::Syntax {
        domain,
        offset,
        message: error.variant.message().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ParseError;
    use crate::language::Domain;

    #[test]
    fn empty_and_blank_input_is_rejected_everywhere() {
        for domain in Domain::ALL {
            for source in ["", "   ", "\n\t "] {
                assert_eq!(domain.parse(source), Err(ParseError::Empty { domain }));
            }
        }
    }

    #[test]
    fn every_rule_set_builds() {
        for domain in Domain::ALL {
            let rules = domain.ruleset().unwrap();
            assert!(!rules.is_empty(), "{domain} has no rules");
            assert!(
                rules.rules().iter().all(|rule| rule.measure().is_some()),
                "{domain} has a rule without a measure"
            );
        }
    }

    #[test]
    fn samples_have_their_sort() {
        for domain in Domain::ALL {
            let rules = domain.ruleset().unwrap();
            for rule in rules.rules() {
                for (_, sort) in rule.from().variable_sorts() {
                    for sample in domain.samples(sort) {
                        if let Some(op) = sample.op() {
                            assert_eq!(op.sort(), sort, "{domain}: {sample} is not a {sort:?}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn curated_inputs_parse() {
        for domain in Domain::ALL {
            for source in domain.curated() {
                assert!(domain.parse(source).is_ok(), "{domain}: `{source}` does not parse");
            }
        }
    }
}
