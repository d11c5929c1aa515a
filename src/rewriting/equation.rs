use itertools::Itertools;

use crate::language::Term;

/// The constraint `left = right`, the unit of work of unification.
#[derive(Clone, Debug)]
pub struct Equation {
    pub left: Term,
    pub right: Term,
}

impl Equation {
    pub fn new(left: Term, right: Term) -> Self {
        Self { left, right }
    }

    /// Checks if the equation is trivial (both sides are identical).
    pub fn is_trivial(&self) -> bool {
        self.left == self.right
    }

    /// Checks if both sides are applications of the same operator.
    /// If so, decomposes the equation into equations comparing the children.
    pub fn decompose_if_matching_symbol(&self) -> Option<Vec<Equation>> {
        let (Term::Symbol(left), Term::Symbol(right)) = (&self.left, &self.right) else {
            return None;
        };

        if left.op != right.op || left.children.len() != right.children.len() {
            return None;
        }

        Some(
            left.children
                .iter()
                .zip_eq(&right.children)
                .map(|(left, right)| Self::new(left.clone(), right.clone()))
                .collect(),
        )
    }

    /// Changes the equation from `u = t` to `t = u`
    pub fn reorient(&mut self) {
        std::mem::swap(&mut self.left, &mut self.right);
    }
}
