use std::collections::BTreeSet;

use crate::analysis::measure::ORDERED_AC;
use crate::error::RuleSetError;
use crate::language::{Domain, Signature, Term};
use crate::rewriting::{Bindings, Rule};

use super::{MetricOp, list};

/// Elements of a `nil`-terminated list.
fn elements(list: &Term) -> Option<Vec<&Term>> {
    let (heads, tail) = list.list_elements(MetricOp::Cons);
    tail.has_op(MetricOp::Nil).then_some(heads)
}

fn finite(value: f64) -> Option<Term> {
    value.is_finite().then(|| Term::number(value))
}

/// Splices the arguments of nested `op` aggregations into the list.
fn flatten(op: MetricOp, arguments: &Term) -> Option<Term> {
    let outer = elements(arguments)?;
    if !outer.iter().any(|element| element.has_op(op)) {
        return None;
    }
    let mut flat = Vec::new();
    for element in outer {
        let nested = element
            .children()
            .first()
            .filter(|_| element.has_op(op))
            .and_then(|inner| elements(inner));
        match nested {
            Some(inner) => flat.extend(inner.into_iter().cloned()),
            None => flat.push(element.clone()),
        }
    }
    Some(list(flat))
}

fn dedupe(arguments: &Term) -> Option<Term> {
    let all = elements(arguments)?;
    let mut seen = BTreeSet::new();
    let unique: Vec<Term> = all
        .iter()
        .filter(|element| seen.insert(**element))
        .map(|element| (*element).clone())
        .collect();
    (unique.len() < all.len()).then(|| list(unique))
}

/// Folds the numeric arguments of `op` into one constant. Sums also drop a
/// zero that sits next to other arguments.
fn fold(op: MetricOp, arguments: &Term) -> Option<Term> {
    let (numbers, others): (Vec<&Term>, Vec<&Term>) = elements(arguments)?
        .into_iter()
        .partition(|element| element.as_number().is_some());
    let values: Vec<f64> = numbers.iter().filter_map(|number| number.as_number()).collect();
    let drops_zero = op == MetricOp::Sum && !others.is_empty();
    if values.len() < 2 && !(drops_zero && values == [0.0]) {
        return None;
    }

    let folded = match op {
        MetricOp::Sum => values.iter().sum::<f64>(),
        MetricOp::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        MetricOp::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        _ => return None,
    };

    let mut kept = Vec::new();
    if !(drops_zero && folded == 0.0) {
        kept.push(finite(folded)?);
    }
    kept.extend(others.into_iter().cloned());
    Some(list(kept))
}

fn mean(arguments: &Term) -> Option<Term> {
    let values = elements(arguments)?
        .iter()
        .map(|element| element.as_number())
        .collect::<Option<Vec<f64>>>()?;
    if values.len() < 2 {
        return None;
    }
    finite(values.iter().sum::<f64>() / values.len() as f64)
}

fn aggregation_rules(op: MetricOp) -> Result<Vec<Rule>, RuleSetError> {
    let name = op.name();
    type Compute = fn(MetricOp, &Term) -> Option<Term>;
    let rewrite_list = |suffix: &str, description: &str, compute: Compute| {
        Rule::parse(
            Domain::Metric,
            &format!("{name}-{suffix}"),
            &format!("({name} $0)"),
            &format!("({name} $1)"),
        )
        .map(|rule| {
            rule.computing(description.to_owned(), &[1], move |b| {
                compute(op, b.get(0)?).map(|arguments| Bindings::single(1, arguments))
            })
        })
    };

    let mut rules = vec![Rule::parse(
        Domain::Metric,
        &format!("{name}-singleton"),
        &format!("({name} (cons $0 (nil)))"),
        "$0",
    )?];
    if op != MetricOp::Avg {
        rules.push(rewrite_list("flatten", "$1 = $0 with nested arguments spliced in", flatten)?);
    }
    if matches!(op, MetricOp::Min | MetricOp::Max) {
        rules.push(rewrite_list("dedupe", "$1 = $0 without duplicates", |_, arguments| {
            dedupe(arguments)
        })?);
    }
    if op == MetricOp::Avg {
        rules.push(
            Rule::parse(Domain::Metric, "avg-fold", "(avg $0)", "$1")?
                .computing("$1 = mean of the constant arguments $0", &[1], |b| {
                    mean(b.get(0)?).map(|value| Bindings::single(1, value))
                }),
        );
    } else {
        rules.push(rewrite_list("fold", "$1 = $0 with constants folded", fold)?);
    }
    Ok(rules)
}

fn product(left: &Term, right: &Term) -> Option<Term> {
    finite(left.as_number()? * right.as_number()?)
}

fn weighted_rules() -> Result<Vec<Rule>, RuleSetError> {
    Ok(vec![
        Rule::parse(Domain::Metric, "weighted-commute", "(weighted $0 $1)", "(weighted $1 $0)")?
            .when("$1 < $0", |b| b.get(1) < b.get(0)),
        Rule::parse(Domain::Metric, "weighted-fold", "(weighted $0 $1)", "$2")?
            .computing("$2 = $0 * $1 for constants", &[2], |b| {
                product(b.get(0)?, b.get(1)?).map(|value| Bindings::single(2, value))
            }),
        Rule::parse(
            Domain::Metric,
            "weighted-fold-nested",
            "(weighted $0 (weighted $1 $2))",
            "(weighted $3 $2)",
        )?
        .computing("$3 = $0 * $1 for constants", &[3], |b| {
            product(b.get(0)?, b.get(1)?).map(|value| Bindings::single(3, value))
        }),
        Rule::parse(Domain::Metric, "weighted-one", "(weighted 1 $0)", "$0")?,
        Rule::parse(Domain::Metric, "weighted-zero", "(weighted 0 $0)", "0")?,
    ])
}

pub fn rules() -> Result<Vec<Rule>, RuleSetError> {
    let mut rules = vec![
        Rule::parse(
            Domain::Metric,
            "cons-sort",
            "(cons $0 (cons $1 $2))",
            "(cons $1 (cons $0 $2))",
        )?
            .when("$1 < $0", |b| b.get(1) < b.get(0)),
    ];
    for op in [MetricOp::Sum, MetricOp::Avg, MetricOp::Min, MetricOp::Max] {
        rules.extend(aggregation_rules(op)?);
    }
    rules.extend(weighted_rules()?);
    Ok(rules.into_iter().map(|rule| rule.measured_by(ORDERED_AC)).collect())
}

#[cfg(test)]
mod tests {
    use crate::language::Domain;
    use crate::rewriting::engine::normalize;

    fn normal(source: &str) -> String {
        let rules = Domain::Metric.ruleset().unwrap();
        let result = normalize(Domain::Metric.parse(source).unwrap(), &rules, 10_000);
        assert!(result.terminated, "{source} did not terminate");
        Domain::Metric.serialize(&result.normal_form)
    }

    #[test]
    fn singletons_collapse() {
        assert_eq!(normal("sum(a)"), "a");
        assert_eq!(normal("avg(x)"), "x");
    }

    #[test]
    fn arguments_are_sorted_and_flattened() {
        assert_eq!(normal("sum(b, a)"), "sum(a, b)");
        assert_eq!(normal("max(a, max(c, b))"), "max(a, b, c)");
        assert_eq!(normal("avg(avg(a, b), c)"), "avg(c, avg(a, b))");
    }

    #[test]
    fn min_max_drop_duplicates_but_sums_do_not() {
        assert_eq!(normal("min(x, x)"), "x");
        assert_eq!(normal("sum(b, a, b)"), "sum(a, b, b)");
    }

    #[test]
    fn constants_fold() {
        assert_eq!(normal("1 + 2 + x"), "sum(3, x)");
        assert_eq!(normal("sum(sum(a, 1), -1)"), "a");
        assert_eq!(normal("avg(2, 4)"), "3");
        assert_eq!(normal("min(3, 1, y)"), "min(1, y)");
        assert_eq!(normal("2 * 3 * x"), "6 * x");
        assert_eq!(normal("x * 1"), "x");
        assert_eq!(normal("0 * y"), "0");
    }
}
