//! Well-founded measures used to argue termination.
//!
//! A [`Measure`] maps terms to tuples of naturals compared lexicographically.
//! A rule is terminating under its measure when every instance of its left-hand
//! side measures strictly more than the corresponding right-hand side.

use std::fmt;

use serde::Serialize;

use crate::language::{Op, Term, Theory};

pub type Component = fn(&Term) -> u64;

#[derive(Clone, Copy)]
pub struct Measure {
    name: &'static str,
    components: &'static [(&'static str, Component)],
}

impl Measure {
    pub const fn new(name: &'static str, components: &'static [(&'static str, Component)]) -> Self {
        Self { name, components }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn component_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.components.iter().map(|(name, _)| *name)
    }

    pub fn evaluate(&self, term: &Term) -> MeasureValue {
        MeasureValue(self.components.iter().map(|(_, component)| component(term)).collect())
    }

    pub fn decreases(&self, before: &Term, after: &Term) -> bool {
        self.evaluate(before) > self.evaluate(after)
    }
}

impl fmt::Debug for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Measure").field(&self.name).finish()
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize)]
pub struct MeasureValue(pub Vec<u64>);

impl fmt::Display for MeasureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (index, value) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

pub const NODE_COUNT: Measure = Measure::new("nodes", &[("nodes", node_count)]);

/// Size first, then sortedness, then right association.
pub const ORDERED_AC: Measure = Measure::new(
    "ordered-ac",
    &[
        ("nodes", node_count),
        ("inversions", ac_inversions),
        ("left-nesting", ac_left_nesting),
    ],
);

/// Number of nodes, the right measure for purely simplifying rules.
pub fn node_count(term: &Term) -> u64 {
    term.size() as u64
}

/// Total length of all text literals.
pub fn text_length(term: &Term) -> u64 {
    term.preorder()
        .filter_map(|(_, t)| t.as_literal()?.as_text().map(|text| text.chars().count() as u64))
        .sum()
}

/// Out-of-order element pairs across every commutative structure.
///
/// Each maximal chain of an associative-commutative operator, each `cons`
/// list, and each commutative pair is flattened and the pairs `(i, j)` with
/// `i < j` and `e_i > e_j` are counted. Sorting rules strictly decrease it.
pub fn ac_inversions(term: &Term) -> u64 {
    let mut total = 0;
    let mut stack: Vec<(&Term, Option<Op>, usize)> = vec![(term, None, 0)];

    while let Some((node, parent, index)) = stack.pop() {
        let Some(op) = node.op() else {
            continue;
        };
        for (child_index, child) in node.children().iter().enumerate() {
            stack.push((child, Some(op), child_index));
        }

        let continues_parent = parent == Some(op);
        match op.theory() {
            Theory::AssociativeCommutative if !continues_parent => {
                total += inversions(&node.chain_elements(op));
            }
            Theory::Bag if !(continues_parent && index == 1) => {
                total += inversions(&node.list_elements(op).0);
            }
            Theory::Commutative => {
                if let [left, right] = node.children() {
                    total += u64::from(right < left);
                }
            }
            _ => {}
        }
    }

    total
}

fn inversions(elements: &[&Term]) -> u64 {
    let mut count = 0;
    for (i, left) in elements.iter().enumerate() {
        count += elements[i + 1..].iter().filter(|right| *right < left).count() as u64;
    }
    count
}

/// Weight of left-nested associative chains.
///
/// Every associative-commutative node whose left child carries the same
/// operator contributes the number of chain nodes in that child, so
/// re-associating to the right strictly decreases the sum.
pub fn ac_left_nesting(term: &Term) -> u64 {
    let mut total = 0;
    for (_, node) in term.preorder() {
        let Some(op) = node.op() else {
            continue;
        };
        if op.theory() != Theory::AssociativeCommutative {
            continue;
        }
        if let Some(left) = node.children().first() {
            if left.op() == Some(op) {
                total += left.preorder().filter(|(_, t)| t.op() == Some(op)).count() as u64;
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use crate::language::{Domain, Term};

    use super::{ORDERED_AC as ORDERED, ac_inversions, ac_left_nesting, text_length};

    fn term(text: &str) -> Term {
        Domain::License.parse_pattern(text).unwrap()
    }

    #[test]
    fn inversions_over_flattened_chain() {
        assert_eq!(ac_inversions(&term(r#"(or (license "A") (license "B"))"#)), 0);
        assert_eq!(ac_inversions(&term(r#"(or (license "B") (license "A"))"#)), 1);
        assert_eq!(
            ac_inversions(&term(r#"(or (license "C") (or (license "B") (license "A")))"#)),
            3
        );
        assert_eq!(
            ac_inversions(&term(r#"(or (or (license "B") (license "C")) (license "A"))"#)),
            2
        );
    }

    #[test]
    fn separate_chains_are_counted_separately() {
        let t = term(r#"(or (license "C") (and (license "B") (license "A")))"#);
        assert_eq!(ac_inversions(&t), 1);
    }

    #[test]
    fn commutative_pairs_and_lists() {
        let metric = |text: &str| Domain::Metric.parse_pattern(text).unwrap();
        assert_eq!(ac_inversions(&metric(r#"(weighted (var "x") 2)"#)), 1);
        assert_eq!(ac_inversions(&metric(r#"(weighted 2 (var "x"))"#)), 0);
        assert_eq!(
            ac_inversions(&metric(r#"(sum (cons (var "b") (cons (var "a") (nil))))"#)),
            1
        );
    }

    #[test]
    fn reassociation_decreases_left_nesting() {
        let before = term(r#"(or (or (license "A") (license "B")) (license "C"))"#);
        let after = term(r#"(or (license "A") (or (license "B") (license "C")))"#);
        assert!(ac_left_nesting(&before) > ac_left_nesting(&after));
        assert!(ORDERED.decreases(&before, &after));
    }

    #[test]
    fn lexicographic_comparison() {
        let before = term(r#"(or (license "B") (license "A"))"#);
        let after = term(r#"(or (license "A") (license "B"))"#);
        assert!(ORDERED.decreases(&before, &after));
        assert!(!ORDERED.decreases(&after, &before));
        assert_eq!(ORDERED.evaluate(&after).to_string(), "(5, 0, 0)");
    }

    #[test]
    fn text_length_counts_characters() {
        assert_eq!(text_length(&term(r#"(or (license "MIT") (license "BSD"))"#)), 6);
    }
}
