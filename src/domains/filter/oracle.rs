//! Membership agreement on paths drawn from the patterns themselves.
//!
//! Every literal, every sample path of every glob, and a few fixed paths are
//! tested against both filters; the first disagreement is the witness.

use std::collections::BTreeSet;

use crate::domains::Equivalence;
use crate::language::{Op, Term};

use super::FilterOp;
use super::glob::Glob;

const FIXED_PATHS: &[&str] = &["a", "x/y", "src/main.rs", "README.md", ".hidden"];

/// Whether `path` belongs to the set denoted by `term`, `None` for malformed terms.
fn contains(term: &Term, path: &str) -> Option<bool> {
    let Some(Op::Filter(op)) = term.op() else {
        return None;
    };
    match op {
        FilterOp::Lit => Some(term.leaf_text()? == path),
        FilterOp::Glob => Some(Glob::compile(term.leaf_text()?).ok()?.matches(path)),
        FilterOp::Not => Some(!contains(term.children().first()?, path)?),
        FilterOp::Union => {
            let mut found = false;
            for element in term.chain_elements(op) {
                found |= contains(element, path)?;
            }
            Some(found)
        }
        FilterOp::Intersect => {
            let mut all = true;
            for element in term.chain_elements(op) {
                all &= contains(element, path)?;
            }
            Some(all)
        }
    }
}

fn collect_paths(term: &Term, paths: &mut BTreeSet<String>) {
    for (_, node) in term.preorder() {
        match (node.op(), node.leaf_text()) {
            (Some(Op::Filter(FilterOp::Lit)), Some(path)) => {
                paths.insert(path.to_owned());
            }
            (Some(Op::Filter(FilterOp::Glob)), Some(pattern)) => {
                if let Ok(glob) = Glob::compile(pattern) {
                    paths.extend(glob.samples());
                }
            }
            _ => {}
        }
    }
}

pub fn equivalent(original: &Term, normalized: &Term) -> Equivalence {
    let mut paths: BTreeSet<String> = FIXED_PATHS.iter().map(|path| (*path).to_owned()).collect();
    collect_paths(original, &mut paths);
    collect_paths(normalized, &mut paths);

    for path in &paths {
        let expected = contains(original, path);
        let actual = contains(normalized, path);
        match (expected, actual) {
            (None, _) => {
                return Equivalence::Undecided(format!("cannot evaluate the input on `{path}`"));
            }
            (Some(expected), Some(actual)) if expected == actual => {}
            (Some(expected), _) => {
                let verdict = if expected { "accepts" } else { "rejects" };
                return Equivalence::Different(format!(
                    "the input {verdict} `{path}` but its normal form does not"
                ));
            }
        }
    }
    Equivalence::Equivalent
}

#[cfg(test)]
mod tests {
    use crate::domains::Equivalence;
    use crate::language::{Domain, Term};

    use super::{contains, equivalent};

    fn parse(source: &str) -> Term {
        Domain::Filter.parse(source).unwrap()
    }

    #[test]
    fn membership() {
        let filter = parse("src/** & !**/*.snap | Cargo.toml");
        assert_eq!(contains(&filter, "src/lib.rs"), Some(true));
        assert_eq!(contains(&filter, "src/tests/a.snap"), Some(false));
        assert_eq!(contains(&filter, "Cargo.toml"), Some(true));
        assert_eq!(contains(&filter, "README.md"), Some(false));
    }

    #[test]
    fn rewritten_filters_agree() {
        assert_eq!(equivalent(&parse("!(a | b)"), &parse("!a & !b")), Equivalence::Equivalent);
        assert_eq!(equivalent(&parse("main.rs | *.rs"), &parse("*.rs")), Equivalence::Equivalent);
        assert_eq!(equivalent(&parse("**/**/*.rs"), &parse("**/*.rs")), Equivalence::Equivalent);
    }

    #[test]
    fn disagreement_has_a_witness() {
        let verdict = equivalent(&parse("!(a | b)"), &parse("!a | !b"));
        let Equivalence::Different(witness) = verdict else {
            panic!("expected a difference");
        };
        assert!(witness.contains("`a`") || witness.contains("`b`"), "{witness}");
        assert!(matches!(
            equivalent(&parse("*.rs | main.c"), &parse("*.rs")),
            Equivalence::Different(_)
        ));
    }
}
