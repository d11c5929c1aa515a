use crate::analysis::measure::{Measure, ac_inversions, ac_left_nesting, node_count, text_length};
use crate::error::RuleSetError;
use crate::language::{Domain, Op, Term};
use crate::rewriting::{Bindings, Rule, ordered};

use super::glob::{self, Glob};
use super::FilterOp;

/// Negations pushed inwards first, then size, then glob length, then chain order.
pub const NEGATION_NORMAL: Measure = Measure::new(
    "negation-normal",
    &[
        ("negation", negation_weight),
        ("nodes", node_count),
        ("text", text_length),
        ("inversions", ac_inversions),
        ("left-nesting", ac_left_nesting),
    ],
);

/// Interpretation with `[!x] = 2^[x]` and `[x | y] = [x & y] = [x] + [y] + 1`
/// over leaves of weight 1. Monotone, so De Morgan and double negation
/// decrease it in every context; saturates instead of overflowing.
pub fn negation_weight(term: &Term) -> u64 {
    match term.op() {
        Some(Op::Filter(FilterOp::Not)) => {
            let inner = term.children().first().map_or(1, negation_weight);
            u32::try_from(inner)
                .ok()
                .and_then(|shift| 1u64.checked_shl(shift))
                .unwrap_or(u64::MAX)
        }
        Some(Op::Filter(FilterOp::Union | FilterOp::Intersect)) => term
            .children()
            .iter()
            .fold(1u64, |total, child| total.saturating_add(negation_weight(child))),
        _ => 1,
    }
}

fn is_everything(term: &Term) -> bool {
    term.has_op(FilterOp::Glob) && term.leaf_text() == Some(glob::EVERYTHING)
}

/// `!**`, the empty filter.
fn is_nothing(term: &Term) -> bool {
    term.has_op(FilterOp::Not) && term.children().first().is_some_and(is_everything)
}

/// The operand of `element`, looked at through one negation when `negated`.
fn operand(element: &Term, negated: bool) -> Option<&Term> {
    if !negated {
        return Some(element);
    }
    element.children().first().filter(|_| element.has_op(FilterOp::Not))
}

fn leaf_of(element: &Term, negated: bool, leaf: FilterOp) -> Option<&str> {
    operand(element, negated).filter(|term| term.has_op(leaf))?.leaf_text()
}

/// Which side of a literal/glob containment a subsumption rule removes.
#[derive(Clone, Copy)]
enum Redundant {
    /// `p | g` keeps `g`; negated, `!p & !g` keeps `!g`.
    Literals,
    /// `p & g` keeps `p`; negated, `!p | !g` keeps `!p`.
    Globs,
}

/// Drops the elements of an `op` chain made redundant by a literal path that
/// a glob of the same chain matches.
fn drop_subsumed(chain: &Term, op: FilterOp, negated: bool, side: Redundant) -> Option<Term> {
    let elements = chain.chain_elements(op);
    let paths: Vec<&str> = elements
        .iter()
        .filter_map(|element| leaf_of(element, negated, FilterOp::Lit))
        .collect();
    let globs: Vec<Glob> = elements
        .iter()
        .filter_map(|element| leaf_of(element, negated, FilterOp::Glob))
        .filter_map(|pattern| Glob::compile(pattern).ok())
        .collect();
    if paths.is_empty() || globs.is_empty() {
        return None;
    }
    ordered::without(chain, Op::Filter(op), |element| match side {
        Redundant::Literals => leaf_of(element, negated, FilterOp::Lit)
            .is_some_and(|path| globs.iter().any(|glob| glob.matches(path))),
        Redundant::Globs => leaf_of(element, negated, FilterOp::Glob)
            .and_then(|pattern| Glob::compile(pattern).ok())
            .is_some_and(|glob| paths.iter().any(|path| glob.matches(path))),
    })
}

fn whole(op: FilterOp, bindings: &Bindings) -> Option<Term> {
    Some(Term::symbol(op, vec![bindings.get(0)?.clone(), bindings.get(1)?.clone()]))
}

fn chain_contains(bindings: &Bindings, op: FilterOp, test: fn(&Term) -> bool) -> bool {
    [bindings.get(0), bindings.get(1)]
        .into_iter()
        .flatten()
        .any(|side| side.chain_elements(op).into_iter().any(test))
}

/// `**` absorbs unions and vanishes from intersections; `!**` the other way round.
fn everything_rules() -> Result<Vec<Rule>, RuleSetError> {
    Ok(vec![
        Rule::parse(Domain::Filter, "union-everything", "(union $0 $1)", r#"(glob "**")"#)?
            .when("the chain contains **", |b| chain_contains(b, FilterOp::Union, is_everything))
            .measured_by(NEGATION_NORMAL),
        Rule::parse(Domain::Filter, "intersect-everything", "(intersect $0 $1)", "$2")?
            .computing("$2 = intersect chain without **", &[2], |b| {
                let chain = whole(FilterOp::Intersect, b)?;
                let kept =
                    ordered::without(&chain, Op::Filter(FilterOp::Intersect), is_everything)?;
                Some(Bindings::single(2, kept))
            })
            .measured_by(NEGATION_NORMAL),
        Rule::parse(
            Domain::Filter,
            "intersect-nothing",
            "(intersect $0 $1)",
            r#"(not (glob "**"))"#,
        )?
            .when("the chain contains !**", |b| chain_contains(b, FilterOp::Intersect, is_nothing))
            .measured_by(NEGATION_NORMAL),
        Rule::parse(Domain::Filter, "union-nothing", "(union $0 $1)", "$2")?
            .computing("$2 = union chain without !**", &[2], |b| {
                let chain = whole(FilterOp::Union, b)?;
                let kept = ordered::without(&chain, Op::Filter(FilterOp::Union), is_nothing)?;
                Some(Bindings::single(2, kept))
            })
            .measured_by(NEGATION_NORMAL),
    ])
}

fn subsumption_rule(
    name: &str,
    op: FilterOp,
    negated: bool,
    side: Redundant,
) -> Result<Rule, RuleSetError> {
    let from = if op == FilterOp::Union { "(union $0 $1)" } else { "(intersect $0 $1)" };
    let description = match side {
        Redundant::Literals => "$2 = chain without literals covered by its globs",
        Redundant::Globs => "$2 = chain without globs covering its literals",
    };
    Ok(Rule::parse(Domain::Filter, name, from, "$2")?
        .computing(description, &[2], move |b| {
            drop_subsumed(&whole(op, b)?, op, negated, side).map(|kept| Bindings::single(2, kept))
        })
        .measured_by(NEGATION_NORMAL))
}

fn glob_rules() -> Result<Vec<Rule>, RuleSetError> {
    Ok(vec![
        subsumption_rule("union-subsumed", FilterOp::Union, false, Redundant::Literals)?,
        subsumption_rule("intersect-subsumed", FilterOp::Intersect, false, Redundant::Globs)?,
        subsumption_rule(
            "intersect-negated-subsumed",
            FilterOp::Intersect,
            true,
            Redundant::Literals,
        )?,
        subsumption_rule("union-negated-subsumed", FilterOp::Union, true, Redundant::Globs)?,
        Rule::parse(Domain::Filter, "glob-collapse", "(glob $0)", "(glob $1)")?
            .computing("$1 = $0 with repeated ** segments collapsed", &[1], |b| {
                let collapsed = glob::collapse(b.get(0)?.as_literal()?.as_text()?)?;
                Some(Bindings::single(1, Term::Literal(collapsed.as_str().into())))
            })
            .measured_by(NEGATION_NORMAL),
    ])
}

pub fn rules() -> Result<Vec<Rule>, RuleSetError> {
    let negation = rules!(Domain::Filter;
        "not-not": "(not (not $0))" => "$0",
        "de-morgan-union": "(not (union $0 $1))" => "(intersect (not $0) (not $1))",
        "de-morgan-intersect": "(not (intersect $0 $1))" => "(union (not $0) (not $1))",
    );

    let mut rules: Vec<Rule> = negation
        .into_iter()
        .map(|rule| rule.measured_by(NEGATION_NORMAL))
        .collect();
    rules.extend(glob_rules()?);
    rules.extend(everything_rules()?);
    rules.extend(ordered::ac_rules(FilterOp::Union, NEGATION_NORMAL)?);
    rules.extend(ordered::ac_rules(FilterOp::Intersect, NEGATION_NORMAL)?);
    rules.extend(ordered::absorption_rules(FilterOp::Union, FilterOp::Intersect, NEGATION_NORMAL)?);
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use crate::language::{Domain, Term};
    use crate::rewriting::engine::normalize;

    use super::{NEGATION_NORMAL, negation_weight};

    fn normal(source: &str) -> String {
        let rules = Domain::Filter.ruleset().unwrap();
        let result = normalize(Domain::Filter.parse(source).unwrap(), &rules, 10_000);
        assert!(result.terminated, "{source} did not terminate");
        Domain::Filter.serialize(&result.normal_form)
    }

    fn term(text: &str) -> Term {
        Domain::Filter.parse_pattern(text).unwrap()
    }

    #[test]
    fn negation_normal_form() {
        assert_eq!(normal("!!a"), "a");
        assert_eq!(normal("!(a | b)"), "!a & !b");
        assert_eq!(normal("!(b & *.rs)"), "!b | !*.rs");
        assert_eq!(normal("!(!a | !b)"), "a & b");
    }

    #[test]
    fn chains_are_sorted_and_deduplicated() {
        assert_eq!(normal("b | a | b"), "a | b");
        assert_eq!(normal("a & (a | b)"), "a");
    }

    #[test]
    fn double_star() {
        assert_eq!(normal("** | README.md"), "**");
        assert_eq!(normal("** & *.md"), "*.md");
        assert_eq!(normal("**/**/*.rs"), "**/*.rs");
    }

    #[test]
    fn literals_matched_by_a_glob_are_dropped() {
        assert_eq!(normal("main.rs | *.rs"), "*.rs");
        assert_eq!(normal("main.c | *.rs"), "main.c | *.rs");
        assert_eq!(normal("main.rs & *.rs"), "main.rs");
        assert_eq!(normal("main.c & *.rs"), "main.c & *.rs");
    }

    #[test]
    fn negated_subsumption_is_the_dual() {
        assert_eq!(normal("!main.rs & !*.rs"), "!*.rs");
        assert_eq!(normal("!main.rs | !*.rs"), "!main.rs");
        assert_eq!(normal("!(**/*.rs | src/main.rs)"), "!**/*.rs");
        assert_eq!(normal("!(src/main.rs & **/*.rs)"), "!src/main.rs");
    }

    #[test]
    fn negated_double_star_is_empty() {
        assert_eq!(normal("!** & a.rs"), "!**");
        assert_eq!(normal("!** | a.rs"), "a.rs");
        assert_eq!(normal("!(** | a.rs)"), "!**");
        assert_eq!(normal("!(** & a.rs)"), "!a.rs");
    }

    #[test]
    fn de_morgan_decreases_the_measure() {
        let before = term(r#"(not (union (lit "a") (not (lit "b"))))"#);
        let after = term(r#"(intersect (not (lit "a")) (not (not (lit "b"))))"#);
        assert!(negation_weight(&before) > negation_weight(&after));
        assert!(NEGATION_NORMAL.decreases(&before, &after));
    }
}
