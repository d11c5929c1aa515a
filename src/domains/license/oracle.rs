//! Truth-table equivalence of license expressions.
//!
//! Every identifier leaf and every `WITH` pair is a propositional atom;
//! `AND`/`OR` are conjunction and disjunction.

use std::collections::BTreeMap;

use crate::domains::Equivalence;
use crate::language::{Op, Term};

use super::{License, LicenseOp};
use crate::domains::DomainSpec;

const MAX_ATOMS: usize = 16;

fn collect_atoms<'t>(term: &'t Term, atoms: &mut BTreeMap<&'t Term, usize>) {
    let mut stack = vec![term];
    while let Some(node) = stack.pop() {
        match node.op() {
            Some(Op::License(LicenseOp::And | LicenseOp::Or)) => stack.extend(node.children()),
            _ => {
                let next = atoms.len();
                atoms.entry(node).or_insert(next);
            }
        }
    }
}

fn evaluate(term: &Term, atoms: &BTreeMap<&Term, usize>, assignment: u32) -> bool {
    match term.op() {
        Some(Op::License(LicenseOp::And)) => term
            .chain_elements(LicenseOp::And)
            .into_iter()
            .all(|element| evaluate(element, atoms, assignment)),
        Some(Op::License(LicenseOp::Or)) => term
            .chain_elements(LicenseOp::Or)
            .into_iter()
            .any(|element| evaluate(element, atoms, assignment)),
        _ => atoms
            .get(term)
            .is_some_and(|index| assignment & (1 << index) != 0),
    }
}

pub fn equivalent(original: &Term, normalized: &Term) -> Equivalence {
    let mut atoms = BTreeMap::new();
    collect_atoms(original, &mut atoms);
    collect_atoms(normalized, &mut atoms);

    if atoms.len() > MAX_ATOMS {
        return Equivalence::Undecided(format!(
            "{} atoms exceed the limit of {MAX_ATOMS}",
            atoms.len()
        ));
    }

    for assignment in 0..(1u32 << atoms.len()) {
        if evaluate(original, &atoms, assignment) != evaluate(normalized, &atoms, assignment) {
            let witness = atoms
                .iter()
                .map(|(atom, index)| {
                    let value = assignment & (1 << index) != 0;
                    format!("{}={}", License::serialize(atom), u8::from(value))
                })
                .collect::<Vec<_>>()
                .join(" ");
            return Equivalence::Different(witness);
        }
    }

    Equivalence::Equivalent
}

#[cfg(test)]
mod tests {
    use crate::domains::Equivalence;
    use crate::language::{Domain, Term};

    use super::equivalent;

    fn parse(source: &str) -> Term {
        Domain::License.parse(source).unwrap()
    }

    #[test]
    fn absorption_is_equivalent() {
        let verdict = equivalent(&parse("MIT AND (MIT OR ISC)"), &parse("MIT"));
        assert_eq!(verdict, Equivalence::Equivalent);
        assert_eq!(
            equivalent(&parse("(MIT OR ISC) AND (ISC OR MIT)"), &parse("ISC OR MIT")),
            Equivalence::Equivalent
        );
    }

    #[test]
    fn different_expressions_have_a_witness() {
        let verdict = equivalent(&parse("MIT AND ISC"), &parse("MIT OR ISC"));
        assert!(matches!(verdict, Equivalence::Different(witness) if witness.contains("MIT=")));
    }

    #[test]
    fn with_pairs_are_atoms() {
        let verdict = equivalent(
            &parse("GPL-2.0-only WITH Classpath-exception-2.0"),
            &parse("GPL-2.0-only"),
        );
        assert!(matches!(verdict, Equivalence::Different(_)));
    }

    #[test]
    fn too_many_atoms_is_undecided() {
        let source = (0..20).map(|i| format!("L{i}")).collect::<Vec<_>>().join(" OR ");
        let term = parse(&source);
        assert!(matches!(equivalent(&term, &term), Equivalence::Undecided(_)));
    }
}
