//! Rewrite rules for version ranges.
//!
//! Sugar goes first: each caret, tilde, x-range, hyphen range and comparator
//! on a partial version is replaced by primitive comparators on full versions.
//! Range chains are then sorted, adjacent comparators intersected, and union
//! alternatives covered by another alternative dropped.

use crate::analysis::measure::{Measure, ac_inversions, ac_left_nesting, node_count};
use crate::error::RuleSetError;
use crate::language::{Domain, Op, Signature, Term};
use crate::rewriting::{Bindings, Rule, ordered};

use super::interval::{drop_covered, meet};
use super::{SemVerOp, Version, comparator};

/// Sugar nodes first, so desugaring may grow the term.
pub const DESUGARED: Measure = Measure::new(
    "desugared",
    &[
        ("sugar", sugar_count),
        ("nodes", node_count),
        ("inversions", ac_inversions),
        ("left-nesting", ac_left_nesting),
    ],
);

/// Sugar operators plus comparators on partial versions.
pub fn sugar_count(term: &Term) -> u64 {
    term.preorder()
        .filter(|(_, node)| match node.op() {
            Some(Op::SemVer(
                SemVerOp::Caret | SemVerOp::Tilde | SemVerOp::XRange | SemVerOp::Hyphen,
            )) => true,
            Some(Op::SemVer(op)) if op.is_comparator() => node
                .children()
                .first()
                .and_then(Term::as_version)
                .is_some_and(|version| !version.is_full()),
            _ => false,
        })
        .count() as u64
}

fn any() -> Term {
    Term::constant(SemVerOp::Any)
}

fn none() -> Term {
    Term::constant(SemVerOp::None)
}

fn between(lower: Option<Term>, upper: Option<Term>) -> Term {
    match (lower, upper) {
        (Some(lower), Some(upper)) => Term::symbol(SemVerOp::Range, vec![lower, upper]),
        (Some(bound), None) | (None, Some(bound)) => bound,
        (None, None) => any(),
    }
}

/// Versions matching the prefix given by a partial version.
fn x_range(version: &Version) -> Term {
    if version.is_wildcard() {
        return any();
    }
    if version.is_full() {
        return comparator(SemVerOp::Eq, version.clone());
    }
    between(
        Some(comparator(SemVerOp::Gte, version.lower())),
        version.upper().map(|upper| comparator(SemVerOp::Lt, upper)),
    )
}

fn caret(version: &Version) -> Term {
    let Some(major) = version.major else {
        return any();
    };
    let upper = match (major, version.minor, version.patch) {
        (0, Some(0), Some(patch)) => patch.checked_add(1).map(|next| Version::floor_of(0, 0, next)),
        (0, Some(minor), _) => minor.checked_add(1).map(|next| Version::floor_of(0, next, 0)),
        (major, _, _) => major.checked_add(1).map(|next| Version::floor_of(next, 0, 0)),
    };
    between(
        Some(comparator(SemVerOp::Gte, version.lower())),
        upper.map(|upper| comparator(SemVerOp::Lt, upper)),
    )
}

fn tilde(version: &Version) -> Term {
    let Some(major) = version.major else {
        return any();
    };
    let upper = match version.minor {
        None => major.checked_add(1).map(|next| Version::floor_of(next, 0, 0)),
        Some(minor) => minor.checked_add(1).map(|next| Version::floor_of(major, next, 0)),
    };
    between(
        Some(comparator(SemVerOp::Gte, version.lower())),
        upper.map(|upper| comparator(SemVerOp::Lt, upper)),
    )
}

fn hyphen(from: &Version, to: &Version) -> Term {
    let lower = (!from.is_wildcard()).then(|| comparator(SemVerOp::Gte, from.lower()));
    let upper = if to.is_wildcard() {
        None
    } else if to.is_full() {
        Some(comparator(SemVerOp::Lte, to.clone()))
    } else {
        to.upper().map(|upper| comparator(SemVerOp::Lt, upper))
    };
    between(lower, upper)
}

/// Primitive comparators equivalent to a sugar node, `None` if `op` applied to
/// `versions` is already primitive.
pub fn desugar(op: SemVerOp, versions: &[&Version]) -> Option<Term> {
    match (op, versions) {
        (SemVerOp::Caret, [version]) => Some(caret(version)),
        (SemVerOp::Tilde, [version]) => Some(tilde(version)),
        (SemVerOp::XRange, [version]) => Some(x_range(version)),
        (SemVerOp::Hyphen, [from, to]) => Some(hyphen(from, to)),
        (_, [version]) if version.is_full() => None,
        (SemVerOp::Eq, [version]) => Some(x_range(version)),
        (SemVerOp::Gte, [version]) if version.is_wildcard() => Some(any()),
        (SemVerOp::Gte, [version]) => Some(comparator(SemVerOp::Gte, version.lower())),
        (SemVerOp::Gt, [version]) => Some(
            version
                .upper()
                .map_or_else(none, |upper| comparator(SemVerOp::Gte, upper)),
        ),
        (SemVerOp::Lt, [version]) if version.is_wildcard() => Some(none()),
        (SemVerOp::Lt, [version]) => {
            let (major, minor, patch) = version.core();
            Some(comparator(SemVerOp::Lt, Version::floor_of(major, minor, patch)))
        }
        (SemVerOp::Lte, [version]) => Some(
            version
                .upper()
                .map_or_else(any, |upper| comparator(SemVerOp::Lt, upper)),
        ),
        _ => None,
    }
}

fn desugar_rule(op: SemVerOp, name: &str) -> Result<Rule, RuleSetError> {
    let arity = op.arity();
    let variables: Vec<String> = (0..arity).map(|index| format!("${index}")).collect();
    let from = format!("({} {})", op.name(), variables.join(" "));
    let result = arity;

    Ok(Rule::parse(Domain::SemVer, name, &from, &format!("${result}"))?
        .computing(
            format!("${result} = primitive comparators for {from}"),
            &[result],
            move |b| {
                let versions = (0..arity)
                    .map(|index| b.get(index)?.as_version())
                    .collect::<Option<Vec<_>>>()?;
                desugar(op, &versions).map(|term| Bindings::single(result, term))
            },
        )
        .measured_by(DESUGARED))
}

fn is_none(term: &Term) -> bool {
    term.has_op(SemVerOp::None)
}

fn is_any(term: &Term) -> bool {
    term.has_op(SemVerOp::Any)
}

fn whole(op: SemVerOp, b: &Bindings) -> Option<Term> {
    Some(Term::symbol(op, vec![b.get(0)?.clone(), b.get(1)?.clone()]))
}

fn at_floor(b: &Bindings) -> bool {
    b.get(0).and_then(Term::as_version) == Some(&Version::floor_of(0, 0, 0))
}

fn bounds_rules() -> Result<Vec<Rule>, RuleSetError> {
    let mentions = |op: SemVerOp, element: fn(&Term) -> bool| {
        move |b: &Bindings| {
            whole(op, b).is_some_and(|chain| chain.chain_elements(op).into_iter().any(element))
        }
    };
    let neutral = |op: SemVerOp, name: &str, drop: fn(&Term) -> bool| {
        let rule_name = format!("{}-{name}", op.name());
        let pattern = format!("({} $0 $1)", op.name());
        Rule::parse(Domain::SemVer, &rule_name, &pattern, "$2").map(|rule| {
            let description = format!("$2 = {} chain without {name}", op.name());
            rule.computing(description, &[2], move |b| {
                let kept = ordered::without(&whole(op, b)?, op.into(), drop)?;
                Some(Bindings::single(2, kept))
            })
        })
    };

    let rules = vec![
        Rule::parse(Domain::SemVer, "lt-floor", "(lt $0)", "(none)")?
            .when("$0 = 0.0.0-0", at_floor),
        Rule::parse(Domain::SemVer, "gte-floor", "(gte $0)", "(any)")?
            .when("$0 = 0.0.0-0", at_floor),
        Rule::parse(Domain::SemVer, "range-none", "(range $0 $1)", "(none)")?
            .when("the range contains none", mentions(SemVerOp::Range, is_none)),
        Rule::parse(Domain::SemVer, "union-any", "(union $0 $1)", "(any)")?
            .when("the union contains any", mentions(SemVerOp::Union, is_any)),
        neutral(SemVerOp::Range, "any", is_any)?,
        neutral(SemVerOp::Union, "none", is_none)?,
    ];
    Ok(rules.into_iter().map(|rule| rule.measured_by(DESUGARED)).collect())
}

fn meet_rules() -> Result<Vec<Rule>, RuleSetError> {
    Ok(vec![
        Rule::parse(Domain::SemVer, "range-meet", "(range $0 $1)", "$2")?
            .computing("$2 = $0 & $1", &[2], |b| {
                meet(b.get(0)?, b.get(1)?).map(|met| Bindings::single(2, met))
            })
            .measured_by(DESUGARED),
        Rule::parse(
            Domain::SemVer,
            "range-meet-chain",
            "(range $0 (range $1 $2))",
            "(range $3 $2)",
        )?
            .computing("$3 = $0 & $1", &[3], |b| {
                meet(b.get(0)?, b.get(1)?).map(|met| Bindings::single(3, met))
            })
            .measured_by(DESUGARED),
        Rule::parse(Domain::SemVer, "union-cover", "(union $0 $1)", "$2")?
            .computing("$2 = union without covered alternatives", &[2], |b| {
                drop_covered(&whole(SemVerOp::Union, b)?).map(|kept| Bindings::single(2, kept))
            })
            .measured_by(DESUGARED),
    ])
}

pub fn rules() -> Result<Vec<Rule>, RuleSetError> {
    let mut rules = vec![
        desugar_rule(SemVerOp::Caret, "caret")?,
        desugar_rule(SemVerOp::Tilde, "tilde")?,
        desugar_rule(SemVerOp::XRange, "xrange")?,
        desugar_rule(SemVerOp::Hyphen, "hyphen")?,
        desugar_rule(SemVerOp::Eq, "eq-partial")?,
        desugar_rule(SemVerOp::Gt, "gt-partial")?,
        desugar_rule(SemVerOp::Gte, "gte-partial")?,
        desugar_rule(SemVerOp::Lt, "lt-partial")?,
        desugar_rule(SemVerOp::Lte, "lte-partial")?,
    ];
    rules.extend(bounds_rules()?);
    rules.extend(ordered::ac_rules(SemVerOp::Range, DESUGARED)?);
    rules.extend(ordered::ac_rules(SemVerOp::Union, DESUGARED)?);
    rules.extend(meet_rules()?);
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use crate::language::{Domain, Term};
    use crate::rewriting::engine::normalize;

    use super::{desugar, sugar_count};
    use crate::domains::semver::{SemVerOp, Version, comparator};

    fn normal(source: &str) -> String {
        let rules = Domain::SemVer.ruleset().unwrap();
        let result = normalize(Domain::SemVer.parse(source).unwrap(), &rules, 10_000);
        assert!(result.terminated, "{source} did not terminate");
        Domain::SemVer.serialize(&result.normal_form)
    }

    #[test]
    fn hyphen_ranges_become_comparators() {
        assert_eq!(normal("1.0.0 - 2.0.0"), ">=1.0.0 <=2.0.0");
        assert_eq!(normal("1.2 - 2"), ">=1.2.0 <3.0.0-0");
    }

    #[test]
    fn caret_and_tilde() {
        assert_eq!(normal("^1.2.3"), ">=1.2.3 <2.0.0-0");
        assert_eq!(normal("^0.2.3"), ">=0.2.3 <0.3.0-0");
        assert_eq!(normal("^0.0.3"), ">=0.0.3 <0.0.4-0");
        assert_eq!(normal("~1.2"), ">=1.2.0 <1.3.0-0");
        assert_eq!(normal("~1"), ">=1.0.0 <2.0.0-0");
    }

    #[test]
    fn partial_comparators() {
        assert_eq!(normal(">1.2"), ">=1.3.0-0");
        assert_eq!(normal("<=1.2"), "<1.3.0-0");
        assert_eq!(normal("<1.2"), "<1.2.0-0");
        assert_eq!(normal(">=1"), ">=1.0.0");
        assert_eq!(normal("1.x"), ">=1.0.0 <2.0.0-0");
        assert_eq!(normal(">*"), "<0.0.0-0");
    }

    #[test]
    fn comparators_are_intersected() {
        assert_eq!(normal(">=1.0.0 >=1.2.0 <3.0.0 <2.0.0"), ">=1.2.0 <2.0.0");
        assert_eq!(normal(">=2.0.0 <1.0.0"), "<0.0.0-0");
        assert_eq!(normal(">=1.0.0 <=1.0.0"), "=1.0.0");
        assert_eq!(normal("<2.0.0 >=1.0.0"), ">=1.0.0 <2.0.0");
    }

    #[test]
    fn unions_drop_covered_and_empty_alternatives() {
        assert_eq!(normal("1.2.3 || 1.2.3"), "=1.2.3");
        assert_eq!(normal(">=1.0.0 <2.0.0 || >=1.5.0 <1.8.0"), ">=1.0.0 <2.0.0");
        assert_eq!(normal(">=2.0.0 <1.0.0 || 1.2.3"), "=1.2.3");
        assert_eq!(normal("^1.0.0 || *"), "*");
    }

    #[test]
    fn x_range_on_a_full_version_is_exact() {
        let version = Version::new(1, 2, 3);
        assert_eq!(
            desugar(SemVerOp::XRange, &[&version]),
            Some(comparator(SemVerOp::Eq, version.clone()))
        );
        let xrange = Term::symbol(SemVerOp::XRange, vec![Term::version(version)]);
        let rules = Domain::SemVer.ruleset().unwrap();
        let result = normalize(xrange, &rules, 10_000);
        assert_eq!(Domain::SemVer.serialize(&result.normal_form), "=1.2.3");
    }

    #[test]
    fn desugaring_removes_sugar() {
        let version = Version::parse("1.2").unwrap();
        let term = desugar(SemVerOp::Caret, &[&version]).unwrap();
        assert_eq!(sugar_count(&term), 0);
        assert_eq!(desugar(SemVerOp::Gte, &[&Version::new(1, 0, 0)]), None);
        assert_eq!(sugar_count(&Term::constant(SemVerOp::Any)), 0);
    }
}
