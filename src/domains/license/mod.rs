//! SPDX license expressions.
//!
//! `MIT OR (Apache-2.0 AND BSD-3-Clause)` is a term over `or`, `and` (both
//! associative, commutative and idempotent) and `with`, with license and
//! exception identifiers as leaves. Normalization sorts and deduplicates the
//! chains and applies absorption.

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

/// Declaration order is the canonical order of the operators.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum LicenseOp {
    License,
    Exception,
    With,
    And,
    Or,
}

impl Signature for LicenseOp {
    const ALL: &'static [Self] = &[
        LicenseOp::License,
        LicenseOp::Exception,
        LicenseOp::With,
        LicenseOp::And,
        LicenseOp::Or,
    ];

    fn name(self) -> &'static str {
        match self {
            LicenseOp::License => "license",
            LicenseOp::Exception => "exception",
            LicenseOp::With => "with",
            LicenseOp::And => "and",
            LicenseOp::Or => "or",
        }
    }

    fn arity(self) -> usize {
        match self {
            LicenseOp::License | LicenseOp::Exception => 1,
            LicenseOp::With | LicenseOp::And | LicenseOp::Or => 2,
        }
    }

    fn sort(self) -> Sort {
        match self {
            LicenseOp::Exception => Sort::Exception,
            _ => Sort::License,
        }
    }

    fn argument_sort(self, index: usize) -> Sort {
        match (self, index) {
            (LicenseOp::License | LicenseOp::Exception, _) => Sort::Text,
            (LicenseOp::With, 1) => Sort::Exception,
            _ => Sort::License,
        }
    }

    fn theory(self) -> Theory {
        match self {
            LicenseOp::And | LicenseOp::Or => Theory::AssociativeCommutative,
            _ => Theory::Free,
        }
    }
}

pub struct License;

const IDENTIFIERS: &[&str] = &[
    "MIT",
    "Apache-2.0",
    "BSD-3-Clause",
    "ISC",
    "GPL-2.0-only",
    "MPL-2.0",
];

impl DomainSpec for License {
    const DOMAIN: Domain = Domain::License;
    const ROOT: Sort = Sort::License;
    const RULESET: &'static str = "spdx";
    const VERSION: &'static str = "1.0.0";

    fn parse(source: &str) -> Result<Term, ParseError> {
        parser::parse(source)
    }

    fn serialize(term: &Term) -> String {
        let mut out = String::new();
        write_expression(term, false, &mut out);
        out
    }

    fn rules() -> Result<Vec<Rule>, RuleSetError> {
        rules::rules()
    }

    fn samples(sort: Sort) -> Vec<Term> {
        let leaf = |id: &str| Term::text(LicenseOp::License, id);
        match sort {
            Sort::License => vec![
                leaf("Apache-2.0"),
                leaf("MIT"),
                Term::symbol(LicenseOp::And, vec![leaf("Apache-2.0"), leaf("MIT")]),
                Term::symbol(LicenseOp::Or, vec![leaf("Apache-2.0"), leaf("MIT")]),
            ],
            Sort::Exception => vec![
                Term::text(LicenseOp::Exception, "Classpath-exception-2.0"),
                Term::text(LicenseOp::Exception, "LLVM-exception"),
            ],
            Sort::Text => vec![Term::Literal("Apache-2.0".into()), Term::Literal("MIT".into())],
            _ => Vec::new(),
        }
    }

    fn generate(rng: &mut StdRng, depth: usize) -> Term {
        if depth <= 1 || rng.gen_bool(0.3) {
            let id = IDENTIFIERS[rng.gen_range(0..IDENTIFIERS.len())];
            if rng.gen_bool(0.1) {
                return Term::symbol(
                    LicenseOp::With,
                    vec![
                        Term::text(LicenseOp::License, "GPL-2.0-only"),
                        Term::text(LicenseOp::Exception, "Classpath-exception-2.0"),
                    ],
                );
            }
            return Term::text(LicenseOp::License, id);
        }
        let op = if rng.gen_bool(0.5) { LicenseOp::And } else { LicenseOp::Or };
        let width = rng.gen_range(2..=4);
        let operands = (0..width).map(|_| Self::generate(rng, depth - 1)).collect();
        Term::chain(op, operands).unwrap_or_else(|| Term::text(LicenseOp::License, "MIT"))
    }

    fn curated() -> &'static [&'static str] {
        &[
            "MIT",
            "Apache-2.0 OR Apache-2.0",
            "MIT AND (MIT OR Apache-2.0)",
            "MIT OR Apache-2.0",
            "Apache-2.0 OR MIT",
            "(MIT OR Apache-2.0) AND (Apache-2.0 OR MIT)",
            "BSD-3-Clause OR MIT OR Apache-2.0 OR MIT",
            "GPL-2.0-only WITH Classpath-exception-2.0 OR MIT",
            "LicenseRef-Custom AND MIT AND LicenseRef-Custom",
            "(ISC AND MIT) OR ISC",
            "((MIT))",
            "(MIT AND ISC) OR (ISC AND MIT AND BSD-3-Clause)",
        ]
    }

    fn equivalent(original: &Term, normalized: &Term) -> Equivalence {
        oracle::equivalent(original, normalized)
    }
}

/// Writes `term` with the fewest parentheses; `in_and` is set for operands of
/// an `AND` chain, where an `OR` chain must be bracketed.
fn write_expression(term: &Term, in_and: bool, out: &mut String) {
    match term {
        Term::Variable(id) => out.push_str(&format!("${id}")),
        Term::Literal(literal) => out.push_str(literal.as_text().unwrap_or_default()),
        Term::Symbol(symbol) => match symbol.op {
            Op::License(op @ (LicenseOp::Or | LicenseOp::And)) => {
                let bracket = in_and && op == LicenseOp::Or;
                if bracket {
                    out.push('(');
                }
                let separator = if op == LicenseOp::Or { " OR " } else { " AND " };
                for (index, element) in term.chain_elements(op).into_iter().enumerate() {
                    if index > 0 {
                        out.push_str(separator);
                    }
                    write_expression(element, op == LicenseOp::And, out);
                }
                if bracket {
                    out.push(')');
                }
            }
            Op::License(LicenseOp::With) => {
                for (index, child) in symbol.children.iter().enumerate() {
                    if index > 0 {
                        out.push_str(" WITH ");
                    }
                    write_expression(child, true, out);
                }
            }
            _ => match term.leaf_text() {
                Some(text) => out.push_str(text),
                None => out.push_str(&term.to_string()),
            },
        },
    }
}
