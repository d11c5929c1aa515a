//! Syntactic unification, that is matching but in the case that both sides
//! include variables.

use super::{Bindings, equation::Equation};
use crate::language::Term;

/// Most general unifier of `left` and `right`, if one exists.
///
/// Robinson-style: a worklist of equations, each either decomposed, dropped as
/// trivial, or solved for a variable after the occurs check. The returned
/// substitution is idempotent.
pub fn unify(left: &Term, right: &Term) -> Option<Bindings> {
    let mut solved = Bindings::default();
    let mut pending = vec![Equation::new(left.clone(), right.clone())];

    while let Some(equation) = pending.pop() {
        let mut equation = Equation::new(
            equation.left.substitute(&solved),
            equation.right.substitute(&solved),
        );

        if equation.is_trivial() {
            continue;
        }

        if let Some(parts) = equation.decompose_if_matching_symbol() {
            pending.extend(parts);
            continue;
        }

        if !equation.left.is_variable() && equation.right.is_variable() {
            equation.reorient();
        }

        let Term::Variable(variable) = &equation.left else {
            return None;
        };
        let variable = *variable;
        if equation.right.contains_variable(variable) {
            return None;
        }

        let elimination = Bindings::single(variable, equation.right.clone());
        for term in solved.terms_mut() {
            *term = term.substitute(&elimination);
        }
        solved.insert(variable, equation.right);
    }

    Some(solved)
}
