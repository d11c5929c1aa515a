//! RDF graph fragments.
//!
//! A document is `(graph body)` where the body is a `merge` chain of triples,
//! read as a set. Normalization sorts and deduplicates the triples and renames
//! blank nodes to canonical `c14nN` labels, so isomorphic graphs end up
//! identical. Output is N-Quads in the default graph, one line per triple in
//! chain order, so a normal form prints in canonical term order and reads back
//! as the same chain.

pub mod canonical;
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

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum RdfOp {
    Iri,
    Blank,
    /// Lexical form and suffix: empty, `@lang` or `^^<datatype>`.
    Literal,
    Triple,
    Merge,
    Graph,
}

impl Signature for RdfOp {
    const ALL: &'static [Self] = &[
        RdfOp::Iri,
        RdfOp::Blank,
        RdfOp::Literal,
        RdfOp::Triple,
        RdfOp::Merge,
        RdfOp::Graph,
    ];

    fn name(self) -> &'static str {
        match self {
            RdfOp::Iri => "iri",
            RdfOp::Blank => "blank",
            RdfOp::Literal => "literal",
            RdfOp::Triple => "triple",
            RdfOp::Merge => "merge",
            RdfOp::Graph => "graph",
        }
    }

    fn arity(self) -> usize {
        match self {
            RdfOp::Iri | RdfOp::Blank | RdfOp::Graph => 1,
            RdfOp::Literal | RdfOp::Merge => 2,
            RdfOp::Triple => 3,
        }
    }

    fn sort(self) -> Sort {
        match self {
            RdfOp::Iri | RdfOp::Blank | RdfOp::Literal => Sort::RdfNode,
            RdfOp::Triple | RdfOp::Merge => Sort::Graph,
            RdfOp::Graph => Sort::Document,
        }
    }

    fn argument_sort(self, _index: usize) -> Sort {
        match self {
            RdfOp::Iri | RdfOp::Blank | RdfOp::Literal => Sort::Text,
            RdfOp::Triple => Sort::RdfNode,
            RdfOp::Merge | RdfOp::Graph => Sort::Graph,
        }
    }

    fn theory(self) -> Theory {
        match self {
            RdfOp::Merge => Theory::AssociativeCommutative,
            _ => Theory::Free,
        }
    }
}

fn escape(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
}

/// Writes a node or a triple in N-Quads syntax.
pub(crate) fn write_node(term: &Term, out: &mut String) {
    let text = |index: usize| {
        term.children()
            .get(index)
            .and_then(|child| child.as_literal()?.as_text())
            .unwrap_or_default()
    };
    match term.op() {
        Some(Op::Rdf(RdfOp::Iri)) => {
            out.push('<');
            out.push_str(text(0));
            out.push('>');
        }
        Some(Op::Rdf(RdfOp::Blank)) => {
            out.push_str("_:");
            out.push_str(text(0));
        }
        Some(Op::Rdf(RdfOp::Literal)) => {
            out.push('"');
            escape(text(0), out);
            out.push('"');
            out.push_str(text(1));
        }
        Some(Op::Rdf(RdfOp::Triple)) => {
            for child in term.children() {
                write_node(child, out);
                out.push(' ');
            }
            out.push('.');
        }
        _ => out.push_str(&term.to_string()),
    }
}

pub struct Rdf;

const IRIS: &[&str] = &["http://example.org/a", "http://example.org/b", "http://example.org/c"];
const PREDICATES: &[&str] = &["http://example.org/p", "http://example.org/q", RDF_TYPE];
const BLANKS: &[&str] = &["x", "y", "z"];

impl Rdf {
    fn generate_node(rng: &mut StdRng, object: bool) -> Term {
        match rng.gen_range(0..if object { 3 } else { 2 }) {
            0 => Term::text(RdfOp::Iri, IRIS[rng.gen_range(0..IRIS.len())]),
            1 => Term::text(RdfOp::Blank, BLANKS[rng.gen_range(0..BLANKS.len())]),
            _ => {
                let suffix = if rng.gen_bool(0.3) { "@en" } else { "" };
                Term::symbol(
                    RdfOp::Literal,
                    vec![
                        Term::Literal(["v", "w"][rng.gen_range(0..2)].into()),
                        Term::Literal(suffix.into()),
                    ],
                )
            }
        }
    }
}

impl DomainSpec for Rdf {
    const DOMAIN: Domain = Domain::Rdf;
    const ROOT: Sort = Sort::Document;
    const RULESET: &'static str = "rdf-c14n";
    const VERSION: &'static str = "1.0.0";

    fn parse(source: &str) -> Result<Term, ParseError> {
        parser::parse(source)
    }

    fn serialize(term: &Term) -> String {
        let Some(body) = term.children().first().filter(|_| term.has_op(RdfOp::Graph)) else {
            let mut out = String::new();
            write_node(term, &mut out);
            return out;
        };
        let mut out = String::new();
        for triple in body.chain_elements(RdfOp::Merge) {
            write_node(triple, &mut out);
            out.push('\n');
        }
        out
    }

    fn rules() -> Result<Vec<Rule>, RuleSetError> {
        rules::rules()
    }

    fn samples(sort: Sort) -> Vec<Term> {
        let iri = |text: &str| Term::text(RdfOp::Iri, text);
        let with_blank = Term::symbol(
            RdfOp::Triple,
            vec![
                Term::text(RdfOp::Blank, "b0"),
                iri("http://example.org/p"),
                Term::symbol(
                    RdfOp::Literal,
                    vec![Term::Literal("v".into()), Term::Literal("".into())],
                ),
            ],
        );
        let ground = Term::symbol(
            RdfOp::Triple,
            vec![
                iri("http://example.org/a"),
                iri("http://example.org/p"),
                iri("http://example.org/b"),
            ],
        );
        match sort {
            Sort::RdfNode => vec![iri("http://example.org/a"), Term::text(RdfOp::Blank, "b0")],
            Sort::Graph => vec![ground.clone(), with_blank],
            Sort::Document => vec![Term::symbol(RdfOp::Graph, vec![ground])],
            Sort::Text => vec![Term::Literal("a".into()), Term::Literal("".into())],
            _ => Vec::new(),
        }
    }

    fn generate(rng: &mut StdRng, depth: usize) -> Term {
        let count = rng.gen_range(1..=depth.max(1) + 1);
        let triples = (0..count)
            .map(|_| {
                let predicate = PREDICATES[rng.gen_range(0..PREDICATES.len())];
                let predicate = Term::text(RdfOp::Iri, predicate);
                Term::symbol(
                    RdfOp::Triple,
                    vec![
                        Self::generate_node(rng, false),
                        predicate,
                        Self::generate_node(rng, true),
                    ],
                )
            })
            .collect();
        let body = Term::chain(RdfOp::Merge, triples)
            .unwrap_or_else(|| Term::text(RdfOp::Iri, IRIS[0]));
        Term::symbol(RdfOp::Graph, vec![body])
    }

    fn curated() -> &'static [&'static str] {
        &[
            "_:a <http://example.org/p> <http://example.org/o> .",
            "_:b <http://example.org/p> <http://example.org/o> .",
            "<http://example.org/s> <http://example.org/p> \"v\" .\n\
             <http://example.org/s> <http://example.org/p> \"v\" .",
            "_:x <http://example.org/p> _:y .\n_:y <http://example.org/p> _:x .",
            "_:x <http://example.org/knows> _:y .\n_:y <http://example.org/name> \"Bob\"@EN .",
            "@prefix ex: <http://example.org/> .\nex:s a ex:C ; ex:p ex:o1 , ex:o2 .",
            "<http://example.org/s> <http://example.org/p> \
             \"v\"^^<http://www.w3.org/2001/XMLSchema#string> .",
            "_:n1 <http://example.org/p> _:n2 .\n\
             _:n2 <http://example.org/p> _:n3 .\n\
             _:n3 <http://example.org/p> _:n1 .",
            "<http://example.org/b> <http://example.org/p> _:q .\n\
             <http://example.org/a> <http://example.org/p> _:q .",
            "_:s <http://example.org/p> \"line\\nbreak \\\"quoted\\\"\" . # trailing comment",
        ]
    }

    fn equivalent(original: &Term, normalized: &Term) -> Equivalence {
        oracle::equivalent(original, normalized)
    }
}
