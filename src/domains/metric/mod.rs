//! Metric aggregation formulas.
//!
//! `sum(coverage * 0.5, max(a, b))` is a tree of aggregations over `cons`
//! lists, weighted products and variables. Argument lists are bags: the
//! normal form sorts them, flattens nested sums, minima and maxima, removes
//! duplicate arguments of `min`/`max` and folds numeric constants.

mod oracle;
mod parser;
mod rules;

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, RuleSetError};
use crate::language::{Domain, Literal, Op, Signature, Sort, Term, Theory};
use crate::rewriting::Rule;

use super::{DomainSpec, Equivalence};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum MetricOp {
    Var,
    Weighted,
    Sum,
    Avg,
    Min,
    Max,
    Cons,
    Nil,
}

impl MetricOp {
    pub fn is_aggregation(self) -> bool {
        matches!(self, MetricOp::Sum | MetricOp::Avg | MetricOp::Min | MetricOp::Max)
    }
}

impl Signature for MetricOp {
    const ALL: &'static [Self] = &[
        MetricOp::Var,
        MetricOp::Weighted,
        MetricOp::Sum,
        MetricOp::Avg,
        MetricOp::Min,
        MetricOp::Max,
        MetricOp::Cons,
        MetricOp::Nil,
    ];

    fn name(self) -> &'static str {
        match self {
            MetricOp::Var => "var",
            MetricOp::Weighted => "weighted",
            MetricOp::Sum => "sum",
            MetricOp::Avg => "avg",
            MetricOp::Min => "min",
            MetricOp::Max => "max",
            MetricOp::Cons => "cons",
            MetricOp::Nil => "nil",
        }
    }

    fn arity(self) -> usize {
        match self {
            MetricOp::Nil => 0,
            MetricOp::Weighted | MetricOp::Cons => 2,
            _ => 1,
        }
    }

    fn sort(self) -> Sort {
        match self {
            MetricOp::Cons | MetricOp::Nil => Sort::MetricList,
            _ => Sort::Metric,
        }
    }

    fn argument_sort(self, index: usize) -> Sort {
        match (self, index) {
            (MetricOp::Var, _) => Sort::Text,
            (MetricOp::Weighted, _) | (MetricOp::Cons, 0) => Sort::Metric,
            _ => Sort::MetricList,
        }
    }

    fn theory(self) -> Theory {
        match self {
            MetricOp::Weighted => Theory::Commutative,
            MetricOp::Cons => Theory::Bag,
            _ => Theory::Free,
        }
    }
}

/// `nil`-terminated argument list.
pub fn list(elements: Vec<Term>) -> Term {
    Term::list(MetricOp::Cons, elements, Term::constant(MetricOp::Nil))
}

pub struct Metric;

const VARIABLES: &[&str] = &["a", "b", "coverage", "x"];
const NUMBERS: &[f64] = &[0.0, 0.5, 1.0, 2.0, 3.0];

impl DomainSpec for Metric {
    const DOMAIN: Domain = Domain::Metric;
    const ROOT: Sort = Sort::Metric;
    const RULESET: &'static str = "metric-aggregation";
    const VERSION: &'static str = "1.0.0";

    fn parse(source: &str) -> Result<Term, ParseError> {
        parser::parse(source)
    }

    fn serialize(term: &Term) -> String {
        let mut out = String::new();
        write_formula(term, &mut out);
        out
    }

    fn rules() -> Result<Vec<Rule>, RuleSetError> {
        rules::rules()
    }

    fn samples(sort: Sort) -> Vec<Term> {
        let var = |name: &str| Term::text(MetricOp::Var, name);
        match sort {
            Sort::Metric => vec![Term::number(2.0), var("x"), var("y")],
            Sort::MetricList => vec![
                list(vec![Term::number(1.0), Term::number(2.0)]),
                list(vec![var("x"), var("x")]),
                list(vec![var("x")]),
                list(vec![Term::symbol(MetricOp::Sum, vec![list(vec![var("x"), var("y")])])]),
            ],
            Sort::Text => vec![Term::Literal("x".into()), Term::Literal("y".into())],
            _ => Vec::new(),
        }
    }

    fn generate(rng: &mut StdRng, depth: usize) -> Term {
        if depth <= 1 || rng.gen_bool(0.3) {
            return if rng.gen_bool(0.4) {
                Term::number(NUMBERS[rng.gen_range(0..NUMBERS.len())])
            } else {
                Term::text(MetricOp::Var, VARIABLES[rng.gen_range(0..VARIABLES.len())])
            };
        }
        match rng.gen_range(0..5) {
            0 => Term::symbol(
                MetricOp::Weighted,
                vec![Self::generate(rng, depth - 1), Self::generate(rng, depth - 1)],
            ),
            choice => {
                let op = [MetricOp::Sum, MetricOp::Avg, MetricOp::Min, MetricOp::Max][choice - 1];
                let width = rng.gen_range(1..=3);
                let elements = (0..width).map(|_| Self::generate(rng, depth - 1)).collect();
                Term::symbol(op, vec![list(elements)])
            }
        }
    }

    fn curated() -> &'static [&'static str] {
        &[
            "sum(a)",
            "sum(b, a, b)",
            "max(a, max(b, c))",
            "min(x, x)",
            "1 + 2 + x",
            "avg(2, 4)",
            "avg(x)",
            "2 * 3 * x",
            "x * 1",
            "0 * y",
            "sum([a, b])",
            "min(3, 1, y)",
            "sum(sum(a, 1), 2)",
            "coverage * 0.5 + complexity * 0.5",
            "max(min(a, b), min(b, a))",
            "avg(sum(a, b), sum(b, a))",
        ]
    }

    fn equivalent(original: &Term, normalized: &Term) -> Equivalence {
        oracle::equivalent(original, normalized)
    }

    fn parse_atom(token: &str) -> Option<Literal> {
        token
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Literal::from)
    }
}

fn write_formula(term: &Term, out: &mut String) {
    match term.op() {
        Some(Op::Metric(MetricOp::Var)) => out.push_str(term.leaf_text().unwrap_or_default()),
        Some(Op::Metric(MetricOp::Weighted)) => {
            let [left, right] = term.children() else {
                return;
            };
            let bracket = left.has_op(MetricOp::Weighted);
            if bracket {
                out.push('(');
            }
            write_formula(left, out);
            if bracket {
                out.push(')');
            }
            out.push_str(" * ");
            write_formula(right, out);
        }
        Some(Op::Metric(op)) if op.is_aggregation() => {
            out.push_str(op.name());
            out.push('(');
            if let Some(arguments) = term.children().first() {
                write_list(arguments, out);
            }
            out.push(')');
        }
        Some(Op::Metric(MetricOp::Cons | MetricOp::Nil)) => {
            out.push('[');
            write_list(term, out);
            out.push(']');
        }
        _ => out.push_str(&term.to_string()),
    }
}

fn write_list(list: &Term, out: &mut String) {
    let (heads, tail) = list.list_elements(MetricOp::Cons);
    for (index, head) in heads.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        write_formula(head, out);
    }
    if !tail.has_op(MetricOp::Nil) {
        if !heads.is_empty() {
            out.push_str(", ");
        }
        out.push_str("..");
        write_formula(tail, out);
    }
}

#[cfg(test)]
mod tests {
    use crate::domains::DomainSpec;
    use crate::language::Domain;

    use super::Metric;

    #[test]
    fn serializes_calls_and_products() {
        for source in ["sum(a, 2 * b)", "max(x)", "(a * b) * c", "-1.5 * avg(x, y)"] {
            let term = Domain::Metric.parse(source).unwrap();
            assert_eq!(Metric::serialize(&term), source);
        }
    }

    #[test]
    fn infix_sums_print_as_calls() {
        let term = Domain::Metric.parse("a + b").unwrap();
        assert_eq!(Metric::serialize(&term), "sum(a, b)");
    }
}
