//! Path filter patterns.
//!
//! `src/** & !**/*.snap | Cargo.toml` combines literal paths and globs with
//! union, intersection and negation. The normal form is a negation normal
//! form over sorted, deduplicated chains in which `**` absorbs unions and
//! vanishes from intersections, `!**` does the reverse, and a literal path
//! next to a glob matching it is reduced to whichever of the two the chain
//! denotes.

pub mod glob;
mod oracle;
mod parser;
mod rules;

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, RuleSetError};
use crate::language::{Domain, Op, Signature, Sort, Term, Theory};
use crate::rewriting::Rule;

use super::{DomainSpec, Equivalence};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum FilterOp {
    Lit,
    Glob,
    Union,
    Intersect,
    Not,
}

impl Signature for FilterOp {
    const ALL: &'static [Self] = &[
        FilterOp::Lit,
        FilterOp::Glob,
        FilterOp::Union,
        FilterOp::Intersect,
        FilterOp::Not,
    ];

    fn name(self) -> &'static str {
        match self {
            FilterOp::Lit => "lit",
            FilterOp::Glob => "glob",
            FilterOp::Union => "union",
            FilterOp::Intersect => "intersect",
            FilterOp::Not => "not",
        }
    }

    fn arity(self) -> usize {
        match self {
            FilterOp::Union | FilterOp::Intersect => 2,
            _ => 1,
        }
    }

    fn sort(self) -> Sort {
        Sort::Filter
    }

    fn argument_sort(self, _index: usize) -> Sort {
        match self {
            FilterOp::Lit | FilterOp::Glob => Sort::Text,
            _ => Sort::Filter,
        }
    }

    fn theory(self) -> Theory {
        match self {
            FilterOp::Union | FilterOp::Intersect => Theory::AssociativeCommutative,
            _ => Theory::Free,
        }
    }
}

pub fn everything() -> Term {
    Term::text(FilterOp::Glob, glob::EVERYTHING)
}

pub struct Filter;

const PATHS: &[&str] = &["Cargo.toml", "src/main.rs", "README.md", "target"];
const GLOBS: &[&str] = &["**", "**/*.rs", "src/**", "*.md", "**/**/*.toml", "docs/?.txt"];

impl DomainSpec for Filter {
    const DOMAIN: Domain = Domain::Filter;
    const ROOT: Sort = Sort::Filter;
    const RULESET: &'static str = "filter-nnf";
    const VERSION: &'static str = "1.0.0";

    fn parse(source: &str) -> Result<Term, ParseError> {
        parser::parse(source)
    }

    fn serialize(term: &Term) -> String {
        let mut out = String::new();
        write_filter(term, 0, &mut out);
        out
    }

    fn rules() -> Result<Vec<Rule>, RuleSetError> {
        rules::rules()
    }

    fn samples(sort: Sort) -> Vec<Term> {
        let lit = |path: &str| Term::text(FilterOp::Lit, path);
        let glob = |pattern: &str| Term::text(FilterOp::Glob, pattern);
        match sort {
            Sort::Filter => vec![
                lit("a.rs"),
                glob("*.rs"),
                everything(),
                Term::symbol(FilterOp::Not, vec![lit("a.rs")]),
                Term::symbol(FilterOp::Union, vec![lit("a.rs"), lit("b.md")]),
                Term::symbol(FilterOp::Intersect, vec![glob("*.rs"), glob("a*")]),
            ],
            Sort::Text => vec![Term::Literal("a.rs".into()), Term::Literal("*.rs".into())],
            _ => Vec::new(),
        }
    }

    fn generate(rng: &mut StdRng, depth: usize) -> Term {
        if depth <= 1 || rng.gen_bool(0.3) {
            return if rng.gen_bool(0.5) {
                Term::text(FilterOp::Lit, PATHS[rng.gen_range(0..PATHS.len())])
            } else {
                Term::text(FilterOp::Glob, GLOBS[rng.gen_range(0..GLOBS.len())])
            };
        }
        match rng.gen_range(0..5) {
            0 => Term::symbol(FilterOp::Not, vec![Self::generate(rng, depth - 1)]),
            choice => {
                let op = if choice <= 2 { FilterOp::Union } else { FilterOp::Intersect };
                let width = rng.gen_range(2..=3);
                let operands = (0..width).map(|_| Self::generate(rng, depth - 1)).collect();
                Term::chain(op, operands).unwrap_or_else(everything)
            }
        }
    }

    fn curated() -> &'static [&'static str] {
        &[
            "src/main.rs",
            "!!src/main.rs",
            "!(a | b)",
            "!(a & *.rs)",
            "b | a | b",
            "** | README.md",
            "** & *.md",
            "**/**/*.rs",
            "main.rs | *.rs",
            "src/** & !**/*.snap | Cargo.toml",
            "a & (a | b)",
            "!(!a | !b)",
            "[!x]? | ab",
            "!** & a.rs",
            "!(** | a.rs)",
            "!(**/*.rs | src/main.rs)",
            "a.rs & (a.rs | *.rs)",
        ]
    }

    fn equivalent(original: &Term, normalized: &Term) -> Equivalence {
        oracle::equivalent(original, normalized)
    }
}

/// Writes `term` with the fewest parentheses. `level` is the binding strength
/// of the surrounding operator: 0 at top level, 1 inside `&`, 2 under `!`.
fn write_filter(term: &Term, level: u8, out: &mut String) {
    match term.op() {
        Some(Op::Filter(op @ (FilterOp::Union | FilterOp::Intersect))) => {
            let (own, separator) = if op == FilterOp::Union { (0, " | ") } else { (1, " & ") };
            let bracket = level > own;
            if bracket {
                out.push('(');
            }
            for (index, element) in term.chain_elements(op).into_iter().enumerate() {
                if index > 0 {
                    out.push_str(separator);
                }
                write_filter(element, own + 1, out);
            }
            if bracket {
                out.push(')');
            }
        }
        Some(Op::Filter(FilterOp::Not)) => {
            out.push('!');
            if let Some(operand) = term.children().first() {
                write_filter(operand, 2, out);
            }
        }
        _ => match term.leaf_text() {
            Some(text) => out.push_str(text),
            None => out.push_str(&term.to_string()),
        },
    }
}
