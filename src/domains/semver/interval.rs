//! Comparator sets read as intervals of the version order.

use std::cmp::Ordering;

use crate::language::{Op, Term};

use super::{SemVerOp, Version, comparator};

/// A primitive comparator on a full version.
pub fn primitive(term: &Term) -> Option<(SemVerOp, &Version)> {
    match term.op()? {
        Op::SemVer(op) if op.is_comparator() => {
            let version = term.children().first()?.as_version()?;
            version.is_full().then_some((op, version))
        }
        _ => None,
    }
}

fn holds(op: SemVerOp, bound: &Version, version: &Version) -> bool {
    match op {
        SemVerOp::Gt => version > bound,
        SemVerOp::Gte => version >= bound,
        SemVerOp::Lt => version < bound,
        SemVerOp::Lte => version <= bound,
        SemVerOp::Eq => version == bound,
        _ => false,
    }
}

/// Intersection of two primitive comparators when it is again a single
/// comparator (or `none`); `None` when both bounds have to stay.
pub fn meet(left: &Term, right: &Term) -> Option<Term> {
    let (a, x) = primitive(left)?;
    let (b, y) = primitive(right)?;
    let none = || Term::constant(SemVerOp::None);

    use SemVerOp::{Eq, Gt, Gte, Lt, Lte};
    let met = match (a, b) {
        (Eq, _) => {
            if holds(b, y, x) {
                left.clone()
            } else {
                none()
            }
        }
        (_, Eq) => {
            if holds(a, x, y) {
                right.clone()
            } else {
                none()
            }
        }
        (Gt | Gte, Gt | Gte) => match x.cmp(y) {
            Ordering::Greater => left.clone(),
            Ordering::Less => right.clone(),
            Ordering::Equal if a == Gt => left.clone(),
            Ordering::Equal => right.clone(),
        },
        (Lt | Lte, Lt | Lte) => match x.cmp(y) {
            Ordering::Less => left.clone(),
            Ordering::Greater => right.clone(),
            Ordering::Equal if a == Lt => left.clone(),
            Ordering::Equal => right.clone(),
        },
        (Gt | Gte, Lt | Lte) => return between(a, x, b, y),
        (Lt | Lte, Gt | Gte) => return between(b, y, a, x),
        _ => return None,
    };
    Some(met)
}

fn between(low_op: SemVerOp, low: &Version, high_op: SemVerOp, high: &Version) -> Option<Term> {
    match low.cmp(high) {
        Ordering::Greater => Some(Term::constant(SemVerOp::None)),
        Ordering::Equal if low_op == SemVerOp::Gte && high_op == SemVerOp::Lte => {
            Some(comparator(SemVerOp::Eq, low.clone()))
        }
        Ordering::Equal => Some(Term::constant(SemVerOp::None)),
        Ordering::Less => None,
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
struct Bound {
    version: Version,
    inclusive: bool,
}

/// A convex set of versions; `None` bounds are unbounded.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Interval {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

/// Whether lower bound `a` admits everything lower bound `b` admits.
fn lower_admits(a: &Option<Bound>, b: &Option<Bound>) -> bool {
    match (a, b) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(a), Some(b)) => {
            a.version < b.version || (a.version == b.version && (a.inclusive || !b.inclusive))
        }
    }
}

fn upper_admits(a: &Option<Bound>, b: &Option<Bound>) -> bool {
    match (a, b) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(a), Some(b)) => {
            a.version > b.version || (a.version == b.version && (a.inclusive || !b.inclusive))
        }
    }
}

impl Interval {
    /// The interval denoted by `any`, a primitive comparator or a range chain
    /// of primitive comparators.
    pub fn of(term: &Term) -> Option<Interval> {
        if term.has_op(SemVerOp::Any) {
            return Some(Interval::default());
        }
        let mut interval = Interval::default();
        for element in term.chain_elements(SemVerOp::Range) {
            let (op, version) = primitive(element)?;
            interval.restrict(op, version);
        }
        Some(interval)
    }

    fn restrict(&mut self, op: SemVerOp, version: &Version) {
        let bound = |inclusive| {
            Some(Bound {
                version: version.clone(),
                inclusive,
            })
        };
        if matches!(op, SemVerOp::Gt | SemVerOp::Gte | SemVerOp::Eq) {
            let candidate = bound(op != SemVerOp::Gt);
            if lower_admits(&self.lower, &candidate) {
                self.lower = candidate;
            }
        }
        if matches!(op, SemVerOp::Lt | SemVerOp::Lte | SemVerOp::Eq) {
            let candidate = bound(op != SemVerOp::Lt);
            if upper_admits(&self.upper, &candidate) {
                self.upper = candidate;
            }
        }
    }

    pub fn contains(&self, other: &Interval) -> bool {
        lower_admits(&self.lower, &other.lower) && upper_admits(&self.upper, &other.upper)
    }
}

/// Rebuilds the union chain without alternatives covered by another one,
/// `None` when nothing is covered. Of two alternatives with the same interval
/// the first is kept.
pub fn drop_covered(chain: &Term) -> Option<Term> {
    let elements = chain.chain_elements(SemVerOp::Union);
    let intervals: Vec<Option<Interval>> = elements.iter().copied().map(Interval::of).collect();

    let covered = |index: usize| {
        let Some(inner) = &intervals[index] else {
            return false;
        };
        intervals.iter().enumerate().any(|(other, outer)| {
            other != index
                && outer.as_ref().is_some_and(|outer| {
                    outer.contains(inner) && (outer != inner || other < index)
                })
        })
    };

    let kept: Vec<Term> = elements
        .iter()
        .enumerate()
        .filter(|(index, _)| !covered(*index))
        .map(|(_, element)| (*element).clone())
        .collect();
    if kept.len() == elements.len() {
        return None;
    }
    Term::chain(SemVerOp::Union, kept)
}

#[cfg(test)]
mod tests {
    use crate::language::{Domain, Term};

    use super::{Interval, drop_covered, meet};

    fn term(text: &str) -> Term {
        Domain::SemVer.parse_pattern(text).unwrap()
    }

    #[test]
    fn meets() {
        let cases = [
            ("(gte 1.0.0)", "(gte 1.2.0)", Some("(gte 1.2.0)")),
            ("(gt 1.0.0)", "(gte 1.0.0)", Some("(gt 1.0.0)")),
            ("(lt 2.0.0)", "(lte 2.0.0)", Some("(lt 2.0.0)")),
            ("(gte 2.0.0)", "(lt 1.0.0)", Some("(none)")),
            ("(gte 1.0.0)", "(lte 1.0.0)", Some("(eq 1.0.0)")),
            ("(gt 1.0.0)", "(lte 1.0.0)", Some("(none)")),
            ("(eq 1.5.0)", "(lt 2.0.0)", Some("(eq 1.5.0)")),
            ("(eq 1.5.0)", "(eq 1.6.0)", Some("(none)")),
            ("(gte 1.0.0)", "(lt 2.0.0)", None),
            ("(gte 1.2)", "(lt 2.0.0)", None),
        ];
        for (left, right, expected) in cases {
            assert_eq!(meet(&term(left), &term(right)), expected.map(term), "{left} & {right}");
        }
    }

    #[test]
    fn containment() {
        let wide = Interval::of(&term("(range (gte 1.0.0) (lt 2.0.0))")).unwrap();
        let narrow = Interval::of(&term("(range (gte 1.5.0) (lt 1.8.0))")).unwrap();
        assert!(wide.contains(&narrow));
        assert!(!narrow.contains(&wide));
        assert!(Interval::of(&term("(any)")).unwrap().contains(&wide));
        assert!(Interval::of(&term("(caret 1.0.0)")).is_none());
    }

    #[test]
    fn covered_alternatives_are_dropped() {
        let chain = term("(union (range (gte 1.0.0) (lt 2.0.0)) (range (gte 1.5.0) (lt 1.8.0)))");
        assert_eq!(drop_covered(&chain), Some(term("(range (gte 1.0.0) (lt 2.0.0))")));
        let disjoint = term("(union (lt 1.0.0) (gte 2.0.0))");
        assert_eq!(drop_covered(&disjoint), None);
    }
}
