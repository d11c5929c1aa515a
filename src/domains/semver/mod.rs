//! Semantic version ranges in npm syntax.
//!
//! `^1.2.3 || >=2.0.0 <3.0.0-0` is a `union` chain of `range` chains of
//! comparators. Caret, tilde, x-ranges, hyphen ranges and comparators on
//! partial versions are sugar: normalization rewrites them into primitive
//! comparators on full versions, intersects the comparators of each range and
//! drops ranges that another one of the union already covers.

mod interval;
mod parser;
mod reference;
mod rules;
mod version;

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, RuleSetError};
use crate::language::{Domain, Literal, Op, Signature, Sort, Term, Theory};
use crate::rewriting::Rule;

pub use self::version::{Identifier, Version};

use super::{DomainSpec, Equivalence};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum SemVerOp {
    Any,
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    None,
    Range,
    Union,
    Caret,
    Tilde,
    XRange,
    Hyphen,
}

impl SemVerOp {
    /// Primitive comparators, the only leaves of a desugared range.
    pub fn is_comparator(self) -> bool {
        matches!(
            self,
            SemVerOp::Gt | SemVerOp::Gte | SemVerOp::Lt | SemVerOp::Lte | SemVerOp::Eq
        )
    }

    fn symbol(self) -> &'static str {
        match self {
            SemVerOp::Gt => ">",
            SemVerOp::Gte => ">=",
            SemVerOp::Lt => "<",
            SemVerOp::Lte => "<=",
            SemVerOp::Eq => "=",
            SemVerOp::Caret => "^",
            SemVerOp::Tilde => "~",
            _ => "",
        }
    }
}

impl Signature for SemVerOp {
    const ALL: &'static [Self] = &[
        SemVerOp::Any,
        SemVerOp::Gt,
        SemVerOp::Gte,
        SemVerOp::Lt,
        SemVerOp::Lte,
        SemVerOp::Eq,
        SemVerOp::None,
        SemVerOp::Range,
        SemVerOp::Union,
        SemVerOp::Caret,
        SemVerOp::Tilde,
        SemVerOp::XRange,
        SemVerOp::Hyphen,
    ];

    fn name(self) -> &'static str {
        match self {
            SemVerOp::Any => "any",
            SemVerOp::Gt => "gt",
            SemVerOp::Gte => "gte",
            SemVerOp::Lt => "lt",
            SemVerOp::Lte => "lte",
            SemVerOp::Eq => "eq",
            SemVerOp::None => "none",
            SemVerOp::Range => "range",
            SemVerOp::Union => "union",
            SemVerOp::Caret => "caret",
            SemVerOp::Tilde => "tilde",
            SemVerOp::XRange => "xrange",
            SemVerOp::Hyphen => "hyphen",
        }
    }

    fn arity(self) -> usize {
        match self {
            SemVerOp::Any | SemVerOp::None => 0,
            SemVerOp::Range | SemVerOp::Union | SemVerOp::Hyphen => 2,
            _ => 1,
        }
    }

    fn sort(self) -> Sort {
        Sort::Range
    }

    fn argument_sort(self, _index: usize) -> Sort {
        match self {
            SemVerOp::Range | SemVerOp::Union => Sort::Range,
            _ => Sort::Version,
        }
    }

    fn theory(self) -> Theory {
        match self {
            SemVerOp::Range | SemVerOp::Union => Theory::AssociativeCommutative,
            _ => Theory::Free,
        }
    }
}

pub(crate) fn comparator(op: SemVerOp, version: Version) -> Term {
    Term::symbol(op, vec![Term::version(version)])
}

pub struct SemVer;

const VERSIONS: &[&str] = &["0.3.1", "1.0.0", "1.2.3", "1.5.0-rc.1", "2.0.0", "1.2", "1", "*"];

impl SemVer {
    fn generate_element(rng: &mut StdRng) -> Term {
        let version = |rng: &mut StdRng| {
            let text = VERSIONS[rng.gen_range(0..VERSIONS.len())];
            Version::parse(text).unwrap_or_else(|_| Version::wildcard())
        };
        match rng.gen_range(0..9) {
            0 => comparator(SemVerOp::Gt, version(rng)),
            1 => comparator(SemVerOp::Gte, version(rng)),
            2 => comparator(SemVerOp::Lt, version(rng)),
            3 => comparator(SemVerOp::Lte, version(rng)),
            4 => comparator(SemVerOp::Caret, version(rng)),
            5 => comparator(SemVerOp::Tilde, version(rng)),
            6 => comparator(SemVerOp::XRange, version(rng)),
            7 => Term::symbol(
                SemVerOp::Hyphen,
                vec![Term::version(version(rng)), Term::version(version(rng))],
            ),
            _ => {
                let full = version(rng);
                if full.is_full() {
                    comparator(SemVerOp::Eq, full)
                } else {
                    comparator(SemVerOp::XRange, full)
                }
            }
        }
    }
}

impl DomainSpec for SemVer {
    const DOMAIN: Domain = Domain::SemVer;
    const ROOT: Sort = Sort::Range;
    const RULESET: &'static str = "semver-range";
    const VERSION: &'static str = "1.0.0";

    fn parse(source: &str) -> Result<Term, ParseError> {
        parser::parse(source)
    }

    fn serialize(term: &Term) -> String {
        let mut out = String::new();
        write_range(term, &mut out);
        out
    }

    fn rules() -> Result<Vec<Rule>, RuleSetError> {
        rules::rules()
    }

    fn samples(sort: Sort) -> Vec<Term> {
        match sort {
            Sort::Range => vec![
                Term::constant(SemVerOp::Any),
                Term::constant(SemVerOp::None),
                comparator(SemVerOp::Gte, Version::new(1, 0, 0)),
                comparator(SemVerOp::Lt, Version::new(2, 0, 0)),
            ],
            Sort::Version => ["1.0.0", "2.0.0", "1.2", "*"]
                .iter()
                .filter_map(|text| Version::parse(text).ok())
                .map(Term::version)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Unions never occur inside ranges: the surface syntax cannot express it.
    fn generate(rng: &mut StdRng, depth: usize) -> Term {
        let ranges = if depth <= 1 { 1 } else { rng.gen_range(1..=2) };
        let alternatives = (0..ranges)
            .map(|_| {
                let width = rng.gen_range(1..=depth.clamp(1, 3));
                let elements = (0..width).map(|_| Self::generate_element(rng)).collect();
                Term::chain(SemVerOp::Range, elements)
                    .unwrap_or_else(|| Term::constant(SemVerOp::Any))
            })
            .collect();
        Term::chain(SemVerOp::Union, alternatives).unwrap_or_else(|| Term::constant(SemVerOp::Any))
    }

    fn curated() -> &'static [&'static str] {
        &[
            "1.0.0 - 2.0.0",
            "^1.2.3",
            "^0.2.3",
            "^0.0.3",
            "~1.2",
            "~1",
            "1.x",
            "*",
            ">1.2",
            "<=1.2",
            "=1.2.3",
            ">=2.0.0 <1.0.0",
            ">=1.0.0 >=1.2.0 <3.0.0 <2.0.0",
            ">=1.0.0 <=1.0.0",
            "1.2.3 || 1.2.3",
            ">=1.0.0 <2.0.0 || >=1.5.0 <1.8.0",
            "<0.0.0-0",
            ">=1.0.0-rc.1 <1.0.0",
            "v1.2.3 || ^2",
            "1.2 - 2",
        ]
    }

    fn equivalent(original: &Term, normalized: &Term) -> Equivalence {
        reference::equivalent(original, normalized)
    }

    fn parse_atom(token: &str) -> Option<Literal> {
        Version::parse(token).ok().map(Literal::Version)
    }
}

fn write_version(term: &Term, out: &mut String) {
    match term.as_version() {
        Some(version) => out.push_str(&version.to_string()),
        None => out.push_str(&term.to_string()),
    }
}

/// `none` is written as `<0.0.0-0`, which nothing satisfies; the parser reads
/// it back as `none`.
fn write_range(term: &Term, out: &mut String) {
    let Some(Op::SemVer(op)) = term.op() else {
        out.push_str(&term.to_string());
        return;
    };
    let children = term.children();
    match op {
        SemVerOp::Any => out.push('*'),
        SemVerOp::None => out.push_str("<0.0.0-0"),
        SemVerOp::Union | SemVerOp::Range => {
            let separator = if op == SemVerOp::Union { " || " } else { " " };
            for (index, element) in term.chain_elements(op).into_iter().enumerate() {
                if index > 0 {
                    out.push_str(separator);
                }
                let nested_union = op == SemVerOp::Range && element.has_op(SemVerOp::Union);
                if nested_union {
                    out.push('(');
                }
                write_range(element, out);
                if nested_union {
                    out.push(')');
                }
            }
        }
        SemVerOp::XRange => write_version(&children[0], out),
        SemVerOp::Hyphen => {
            write_version(&children[0], out);
            out.push_str(" - ");
            write_version(&children[1], out);
        }
        _ => {
            out.push_str(op.symbol());
            write_version(&children[0], out);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domains::DomainSpec;
    use crate::language::Domain;

    use super::SemVer;

    #[test]
    fn serializes_surface_syntax() {
        let sources = [
            ">=1.0.0 <2.0.0",
            "^1.2.3 || ~2.1",
            "1.2",
            "1.0.0 - 2.0.0",
            "=1.2.3",
            "*",
            "<0.0.0-0",
        ];
        for source in sources {
            let term = Domain::SemVer.parse(source).unwrap();
            assert_eq!(SemVer::serialize(&term), source);
        }
    }

    #[test]
    fn bare_full_version_is_an_exact_match() {
        let term = Domain::SemVer.parse("1.2.3").unwrap();
        assert_eq!(SemVer::serialize(&term), "=1.2.3");
    }
}
