//! Numeric equivalence of metric formulas under random valuations.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domains::{DomainSpec, Equivalence};
use crate::language::{Op, Term};

use super::{Metric, MetricOp};

const SEED: u64 = 0x5eed;
const VALUATIONS: usize = 16;
const TOLERANCE: f64 = 1e-9;

type Valuation<'t> = BTreeMap<&'t str, f64>;

fn collect_variables<'t>(term: &'t Term, names: &mut BTreeSet<&'t str>) {
    for (_, node) in term.preorder() {
        if node.has_op(MetricOp::Var) {
            if let Some(name) = node.leaf_text() {
                names.insert(name);
            }
        }
    }
}

fn arguments(term: &Term, valuation: &Valuation<'_>) -> Option<Vec<f64>> {
    let (heads, tail) = term.children().first()?.list_elements(MetricOp::Cons);
    if !tail.has_op(MetricOp::Nil) || heads.is_empty() {
        return None;
    }
    heads.into_iter().map(|head| evaluate(head, valuation)).collect()
}

/// Value of `term`, `None` for terms that are not well-formed formulas.
fn evaluate(term: &Term, valuation: &Valuation<'_>) -> Option<f64> {
    if let Some(value) = term.as_number() {
        return Some(value);
    }
    let Some(Op::Metric(op)) = term.op() else {
        return None;
    };
    match op {
        MetricOp::Var => valuation.get(term.leaf_text()?).copied(),
        MetricOp::Weighted => {
            let [left, right] = term.children() else {
                return None;
            };
            Some(evaluate(left, valuation)? * evaluate(right, valuation)?)
        }
        MetricOp::Sum => Some(arguments(term, valuation)?.iter().sum()),
        MetricOp::Avg => {
            let values = arguments(term, valuation)?;
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
        MetricOp::Min => arguments(term, valuation)?.into_iter().reduce(f64::min),
        MetricOp::Max => arguments(term, valuation)?.into_iter().reduce(f64::max),
        MetricOp::Cons | MetricOp::Nil => None,
    }
}

fn close(left: f64, right: f64) -> bool {
    (left - right).abs() <= TOLERANCE * left.abs().max(right.abs()).max(1.0)
}

pub fn equivalent(original: &Term, normalized: &Term) -> Equivalence {
    let mut names = BTreeSet::new();
    collect_variables(original, &mut names);
    collect_variables(normalized, &mut names);

    let mut rng = StdRng::seed_from_u64(SEED);
    let mut compared = 0;
    for _ in 0..VALUATIONS {
        let valuation: Valuation<'_> = names
            .iter()
            .map(|name| (*name, rng.gen_range(-100.0..=100.0)))
            .collect();

        let Some(expected) = evaluate(original, &valuation) else {
            let input = Metric::serialize(original);
            return Equivalence::Undecided(format!("cannot evaluate {input}"));
        };
        if !expected.is_finite() {
            continue;
        }
        compared += 1;

        let actual = evaluate(normalized, &valuation);
        if !actual.is_some_and(|actual| close(expected, actual)) {
            let assignment = valuation
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            let actual = actual.map_or_else(|| "nothing".to_owned(), |value| value.to_string());
            return Equivalence::Different(format!(
                "{assignment}: expected {expected}, got {actual}"
            ));
        }
    }

    if compared == 0 {
        return Equivalence::Undecided("no valuation gives a finite value".to_owned());
    }
    Equivalence::Equivalent
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::domains::Equivalence;
    use crate::language::{Domain, Term};

    use super::{equivalent, evaluate};

    fn parse(source: &str) -> Term {
        Domain::Metric.parse(source).unwrap()
    }

    #[test]
    fn evaluates_aggregations() {
        let valuation = BTreeMap::from([("a", 1.0), ("b", 3.0)]);
        assert_eq!(evaluate(&parse("avg(a, b) * 2"), &valuation), Some(4.0));
        assert_eq!(evaluate(&parse("max(a, b, 2) + min(a)"), &valuation), Some(4.0));
        assert_eq!(evaluate(&parse("c"), &valuation), None);
    }

    #[test]
    fn reordered_formulas_are_equivalent() {
        assert_eq!(equivalent(&parse("sum(b, a)"), &parse("a + b")), Equivalence::Equivalent);
        assert_eq!(equivalent(&parse("2 * 3 * x"), &parse("6 * x")), Equivalence::Equivalent);
        assert_eq!(equivalent(&parse("0.1 + 0.2"), &parse("0.3")), Equivalence::Equivalent);
    }

    #[test]
    fn wrong_folds_are_caught() {
        assert!(matches!(
            equivalent(&parse("sum(x, x)"), &parse("x")),
            Equivalence::Different(_)
        ));
        assert!(matches!(
            equivalent(&parse("avg(a, b, b)"), &parse("avg(a, b)")),
            Equivalence::Different(_)
        ));
    }
}
