//! Reference semantics of ranges, written directly against the sugar.
//!
//! Two ranges are compared on every version near a version mentioned in
//! either of them. Both denote finite unions of intervals whose endpoints are
//! among those versions, so agreeing on the witnesses means agreeing everywhere.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::domains::Equivalence;
use crate::language::{Literal, Op, Term};

use super::{Identifier, SemVerOp, Version};

/// Compares the components `prefix` fixes against those of `version`.
fn prefix_cmp(prefix: &Version, version: &Version) -> Ordering {
    let (major, minor, patch) = version.core();
    [prefix.major, prefix.minor, prefix.patch]
        .into_iter()
        .zip([major, minor, patch])
        .map_while(|(fixed, actual)| fixed.map(|fixed| actual.cmp(&fixed)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Whether the first `length` core components agree.
fn same_prefix(length: usize, bound: &Version, version: &Version) -> bool {
    let (a, b, c) = bound.core();
    let (x, y, z) = version.core();
    [a, b, c][..length] == [x, y, z][..length]
}

pub fn satisfies(term: &Term, version: &Version) -> bool {
    let Some(Op::SemVer(op)) = term.op() else {
        return false;
    };
    let bound = term.children().first().and_then(Term::as_version);

    match (op, bound) {
        (SemVerOp::Any, _) => true,
        (SemVerOp::None, _) => false,
        (SemVerOp::Range, _) => term
            .chain_elements(SemVerOp::Range)
            .into_iter()
            .all(|element| satisfies(element, version)),
        (SemVerOp::Union, _) => term
            .chain_elements(SemVerOp::Union)
            .into_iter()
            .any(|element| satisfies(element, version)),
        (SemVerOp::Hyphen, Some(from)) => {
            let Some(to) = term.children().get(1).and_then(Term::as_version) else {
                return false;
            };
            let above = from.is_wildcard() || version >= &from.lower();
            let below = if to.is_full() {
                version <= to
            } else {
                prefix_cmp(to, version).is_le()
            };
            above && below
        }
        (_, None) => false,
        (_, Some(bound)) if bound.is_wildcard() => {
            !matches!(op, SemVerOp::Gt | SemVerOp::Lt)
        }
        (SemVerOp::Gt, Some(bound)) if bound.is_full() => version > bound,
        (SemVerOp::Gte, Some(bound)) if bound.is_full() => version >= bound,
        (SemVerOp::Lt, Some(bound)) if bound.is_full() => version < bound,
        (SemVerOp::Lte, Some(bound)) if bound.is_full() => version <= bound,
        (SemVerOp::Eq | SemVerOp::XRange, Some(bound)) if bound.is_full() => version == bound,
        (SemVerOp::Gt, Some(bound)) => prefix_cmp(bound, version).is_gt(),
        (SemVerOp::Gte, Some(bound)) => version >= &bound.lower(),
        (SemVerOp::Lt, Some(bound)) => prefix_cmp(bound, version).is_lt(),
        (SemVerOp::Lte, Some(bound)) => prefix_cmp(bound, version).is_le(),
        (SemVerOp::Eq | SemVerOp::XRange, Some(bound)) => {
            version >= &bound.lower() && prefix_cmp(bound, version).is_eq()
        }
        (SemVerOp::Caret, Some(bound)) => {
            let fixed = match (bound.major, bound.minor, bound.patch) {
                (Some(0), Some(0), Some(_)) => 3,
                (Some(0), Some(_), _) => 2,
                _ => 1,
            };
            version >= &bound.lower() && same_prefix(fixed, bound, version)
        }
        (SemVerOp::Tilde, Some(bound)) => {
            let fixed = if bound.minor.is_some() { 2 } else { 1 };
            version >= &bound.lower() && same_prefix(fixed, bound, version)
        }
    }
}

/// Versions around every version literal of `terms`.
fn witnesses<'t>(terms: impl IntoIterator<Item = &'t Term>) -> BTreeSet<Version> {
    let mut witnesses = BTreeSet::from([Version::floor_of(0, 0, 0), Version::new(0, 0, 0)]);
    let alpha = vec![Identifier::AlphaNumeric("alpha".into())];

    for term in terms {
        for (_, node) in term.preorder() {
            let Some(Literal::Version(version)) = node.as_literal() else {
                continue;
            };
            let (major, minor, patch) = version.core();
            let cores = [
                (major, minor, patch),
                (major, minor, patch.saturating_add(1)),
                (major, minor.saturating_add(1), 0),
                (major.saturating_add(1), 0, 0),
                (major, minor, patch.saturating_sub(1)),
                (major, minor.saturating_sub(1), 0),
                (major.saturating_sub(1), 0, 0),
            ];
            for (major, minor, patch) in cores {
                witnesses.insert(Version::new(major, minor, patch));
                witnesses.insert(Version::floor_of(major, minor, patch));
                witnesses.insert(Version::new(major, minor, patch).with_pre(alpha.clone()));
            }
            if version.is_full() && !version.pre.is_empty() {
                let mut longer = version.pre.clone();
                longer.push(Identifier::Numeric(0));
                witnesses.insert(version.clone());
                witnesses.insert(version.release().with_pre(longer));
            }
        }
    }
    witnesses
}

pub fn equivalent(original: &Term, normalized: &Term) -> Equivalence {
    for witness in witnesses([original, normalized]) {
        let before = satisfies(original, &witness);
        if before != satisfies(normalized, &witness) {
            let (holds, fails) = if before {
                ("the input", "its normal form")
            } else {
                ("the normal form", "the input")
            };
            return Equivalence::Different(format!("{witness} satisfies {holds} but not {fails}"));
        }
    }
    Equivalence::Equivalent
}

#[cfg(test)]
mod tests {
    use crate::domains::Equivalence;
    use crate::domains::semver::Version;
    use crate::language::{Domain, Term};

    use super::{equivalent, satisfies};

    fn range(source: &str) -> Term {
        Domain::SemVer.parse(source).unwrap()
    }

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    #[test]
    fn sugar_semantics() {
        assert!(satisfies(&range("^1.2.3"), &v("1.9.0")));
        assert!(!satisfies(&range("^1.2.3"), &v("2.0.0-0")));
        assert!(!satisfies(&range("^0.2.3"), &v("0.3.0")));
        assert!(satisfies(&range("~1.2"), &v("1.2.9")));
        assert!(!satisfies(&range("~1.2"), &v("1.3.0")));
        assert!(satisfies(&range("1.x"), &v("1.0.0")));
        assert!(!satisfies(&range(">1.2"), &v("1.2.7")));
        assert!(satisfies(&range("<=1.2"), &v("1.2.7")));
        assert!(satisfies(&range("1.0.0 - 2"), &v("2.9.9")));
        assert!(!satisfies(&range("<0.0.0-0"), &v("0.0.0-0")));
    }

    #[test]
    fn desugared_forms_are_equivalent() {
        for (sugar, plain) in [
            ("^1.2.3", ">=1.2.3 <2.0.0-0"),
            ("~1.2", ">=1.2.0 <1.3.0-0"),
            ("1.0.0 - 2.0.0", ">=1.0.0 <=2.0.0"),
            (">1.2", ">=1.3.0-0"),
        ] {
            let verdict = equivalent(&range(sugar), &range(plain));
            assert_eq!(verdict, Equivalence::Equivalent, "{sugar}");
        }
    }

    #[test]
    fn wrong_bounds_are_caught() {
        let verdict = equivalent(&range("^1.2.3"), &range(">=1.2.3 <2.0.0"));
        assert!(matches!(verdict, Equivalence::Different(witness) if witness.contains("2.0.0-")));
    }
}
