//! Greedy shrinking of failing inputs.

use crate::language::{Sort, Term};

fn sort_of(term: &Term) -> Option<Sort> {
    term.op().map(|op| op.sort())
}

/// Smaller terms of the same sort as `term`: proper subterms promoted to the
/// root, then single nodes replaced by one of their same-sorted children.
fn candidates(term: &Term) -> Vec<Term> {
    let Some(root) = sort_of(term) else {
        return Vec::new();
    };
    let mut candidates: Vec<Term> = term
        .preorder()
        .skip(1)
        .filter(|(_, subterm)| sort_of(subterm) == Some(root))
        .map(|(_, subterm)| subterm.clone())
        .collect();

    for (position, node) in term.preorder() {
        let Some(sort) = sort_of(node) else {
            continue;
        };
        for child in node.children() {
            if sort_of(child) == Some(sort) {
                candidates.push(term.clone().replace_at(&position, child.clone()));
            }
        }
    }
    candidates.sort_by_key(Term::size);
    candidates.dedup();
    candidates
}

/// Shrinks `term` while `fails` keeps holding, evaluating `fails` at most
/// `limit` times. Returns `None` when nothing smaller fails.
pub fn shrink(term: &Term, limit: usize, mut fails: impl FnMut(&Term) -> bool) -> Option<Term> {
    let mut current = term.clone();
    let mut budget = limit;
    'search: while budget > 0 {
        for candidate in candidates(&current) {
            if budget == 0 {
                break 'search;
            }
            if candidate.size() >= current.size() {
                continue;
            }
            budget -= 1;
            if fails(&candidate) {
                current = candidate;
                continue 'search;
            }
        }
        break;
    }
    (current.size() < term.size()).then_some(current)
}

#[cfg(test)]
mod tests {
    use crate::language::{Domain, Term};

    use super::shrink;

    fn filter(text: &str) -> Term {
        Domain::Filter.parse(text).unwrap()
    }

    fn mentions(term: &Term, text: &str) -> bool {
        term.preorder().any(|(_, subterm)| subterm.leaf_text() == Some(text))
    }

    #[test]
    fn shrinks_to_the_failing_core() {
        let input = filter("(a | !(b & c)) & !!d");
        let minimal = shrink(&input, 200, |term| mentions(term, "c")).unwrap();
        assert_eq!(minimal, filter("c"));
    }

    #[test]
    fn keeps_inputs_that_cannot_shrink() {
        assert_eq!(shrink(&filter("a"), 200, |_| true), None);
        assert_eq!(shrink(&filter("a | b"), 200, |term| term.size() > 3), None);
    }

    #[test]
    fn respects_the_evaluation_limit() {
        let input = filter("a | b | c | d");
        let mut calls = 0;
        shrink(&input, 3, |_| {
            calls += 1;
            false
        });
        assert_eq!(calls, 3);
    }
}
