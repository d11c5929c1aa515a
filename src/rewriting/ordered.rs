//! Ordered rewriting modulo associativity, commutativity and idempotence.
//!
//! Binary AC operators are kept as right-nested chains. Instead of matching
//! modulo AC, a fixed family of oriented rules sorts every chain into the
//! canonical term order and removes duplicates; the commuting rules are guarded
//! by that order so they cannot loop.

use std::collections::BTreeSet;

use crate::analysis::measure::Measure;
use crate::error::RuleSetError;
use crate::language::{Domain, Op, Term};

use super::{Bindings, Rule};

fn parse(domain: Domain, name: String, from: String, to: String) -> Result<Rule, RuleSetError> {
    Rule::parse(domain, &name, &from, &to)
}

/// Associativity, idempotence and guarded commutativity for `op`.
pub fn ac_rules(op: impl Into<Op>, measure: Measure) -> Result<Vec<Rule>, RuleSetError> {
    let op = op.into();
    let domain = op.domain();
    let name = op.name();

    let not_chain = move |bindings: &Bindings, variable| {
        bindings.get(variable).is_some_and(|term| !term.has_op(op))
    };

    Ok(vec![
        parse(
            domain,
            format!("{name}-assoc"),
            format!("({name} ({name} $0 $1) $2)"),
            format!("({name} $0 ({name} $1 $2))"),
        )?
        .measured_by(measure),
        parse(
            domain,
            format!("{name}-idempotent"),
            format!("({name} $0 $0)"),
            "$0".to_owned(),
        )?
        .measured_by(measure),
        parse(
            domain,
            format!("{name}-idempotent-chain"),
            format!("({name} $0 ({name} $0 $1))"),
            format!("({name} $0 $1)"),
        )?
        .measured_by(measure),
        parse(
            domain,
            format!("{name}-commute"),
            format!("({name} $0 $1)"),
            format!("({name} $1 $0)"),
        )?
        .when("$1 < $0, both elements", move |b| {
            not_chain(b, 0) && not_chain(b, 1) && b.get(1) < b.get(0)
        })
        .measured_by(measure),
        parse(
            domain,
            format!("{name}-left-commute"),
            format!("({name} $0 ({name} $1 $2))"),
            format!("({name} $1 ({name} $0 $2))"),
        )?
        .when("$1 < $0, both elements", move |b| {
            not_chain(b, 0) && not_chain(b, 1) && b.get(1) < b.get(0)
        })
        .measured_by(measure),
    ])
}

/// Absorption for a lattice given by `join` and `meet`.
///
/// Inside a `join` chain an element is dropped when the `meet` elements of
/// another element form a strict subset of its own (`a | (a & b) = a`), and
/// dually inside a `meet` chain.
pub fn absorption_rules(
    join: impl Into<Op>,
    meet: impl Into<Op>,
    measure: Measure,
) -> Result<Vec<Rule>, RuleSetError> {
    let (join, meet) = (join.into(), meet.into());
    let rule = |outer: Op, inner: Op| -> Result<Rule, RuleSetError> {
        let name = outer.name();
        Ok(parse(
            outer.domain(),
            format!("{name}-absorb"),
            format!("({name} $0 $1)"),
            "$2".to_owned(),
        )?
        .computing(
            format!("$2 = {name} chain without elements absorbed by another"),
            &[2],
            move |b| {
                let whole = Term::symbol(outer, vec![b.get(0)?.clone(), b.get(1)?.clone()]);
                let kept = absorb(&whole, outer, inner)?;
                Some(Bindings::single(2, kept))
            },
        )
        .measured_by(measure))
    };

    Ok(vec![rule(join, meet)?, rule(meet, join)?])
}

/// Rebuilds the `outer` chain of `chain` without absorbed elements, `None` if
/// nothing is absorbed.
pub fn absorb(chain: &Term, outer: Op, inner: Op) -> Option<Term> {
    let elements = chain.chain_elements(outer);
    let parts: Vec<BTreeSet<&Term>> = elements
        .iter()
        .map(|element| element.chain_elements(inner).into_iter().collect())
        .collect();

    let absorbed = |index: usize| {
        parts.iter().enumerate().any(|(other, part)| {
            other != index && part.is_subset(&parts[index]) && *part != parts[index]
        })
    };

    let kept: Vec<Term> = elements
        .iter()
        .enumerate()
        .filter(|(index, _)| !absorbed(*index))
        .map(|(_, element)| (*element).clone())
        .collect();

    if kept.len() == elements.len() {
        return None;
    }
    Term::chain(outer, kept)
}

/// Rebuilds the `op` chain of `chain` without the elements selected by
/// `drop`, `None` if none is selected or every element is.
pub fn without(chain: &Term, op: Op, drop: impl Fn(&Term) -> bool) -> Option<Term> {
    let elements = chain.chain_elements(op);
    let kept: Vec<Term> = elements
        .iter()
        .filter(|element| !drop(element))
        .map(|element| (*element).clone())
        .collect();
    if kept.len() == elements.len() {
        return None;
    }
    Term::chain(op, kept)
}
