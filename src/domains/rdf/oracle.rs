//! Graph isomorphism by trying every blank node bijection.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;

use crate::domains::Equivalence;
use crate::language::{Op, Term};

use super::canonical::triples;
use super::{RdfOp, write_node};

const MAX_BLANKS: usize = 8;

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
enum Key {
    Blank(usize),
    Fixed(String),
}

struct Encoded {
    blanks: usize,
    triples: Vec<[Key; 3]>,
}

fn encode(graph: &Term) -> Encoded {
    let body = if graph.has_op(RdfOp::Graph) {
        graph.children().first().unwrap_or(graph)
    } else {
        graph
    };

    let mut blanks: BTreeMap<&str, usize> = BTreeMap::new();
    let mut encoded = Vec::new();
    for triple in triples(body) {
        let mut keys = [Key::Blank(0), Key::Blank(0), Key::Blank(0)];
        for (slot, node) in keys.iter_mut().zip(triple.children()) {
            *slot = match (node.op(), node.leaf_text()) {
                (Some(Op::Rdf(RdfOp::Blank)), Some(label)) => {
                    let next = blanks.len();
                    Key::Blank(*blanks.entry(label).or_insert(next))
                }
                _ => {
                    let mut fixed = String::new();
                    write_node(node, &mut fixed);
                    Key::Fixed(fixed)
                }
            };
        }
        encoded.push(keys);
    }
    Encoded {
        blanks: blanks.len(),
        triples: encoded,
    }
}

fn mapped(triples: &[[Key; 3]], bijection: &[usize]) -> BTreeSet<[Key; 3]> {
    triples
        .iter()
        .map(|triple| {
            triple.clone().map(|key| match key {
                Key::Blank(index) => Key::Blank(bijection[index]),
                fixed => fixed,
            })
        })
        .collect()
}

pub fn equivalent(original: &Term, normalized: &Term) -> Equivalence {
    let (before, after) = (encode(original), encode(normalized));
    if before.blanks != after.blanks {
        return Equivalence::Different(format!(
            "{} blank nodes in the input, {} in the normal form",
            before.blanks, after.blanks
        ));
    }
    if before.blanks > MAX_BLANKS {
        return Equivalence::Undecided(format!(
            "{} blank nodes exceed the limit of {MAX_BLANKS}",
            before.blanks
        ));
    }

    let identity: Vec<usize> = (0..after.blanks).collect();
    let target = mapped(&after.triples, &identity);
    if before.blanks == 0 {
        return if mapped(&before.triples, &identity) == target {
            Equivalence::Equivalent
        } else {
            Equivalence::Different("the triple sets differ".to_owned())
        };
    }

    let isomorphic = (0..before.blanks)
        .permutations(before.blanks)
        .any(|bijection| mapped(&before.triples, &bijection) == target);
    if isomorphic {
        Equivalence::Equivalent
    } else {
        Equivalence::Different(
            "no blank node renaming maps the input onto its normal form".to_owned(),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::domains::Equivalence;
    use crate::language::{Domain, Term};

    use super::equivalent;

    fn graph(source: &str) -> Term {
        Domain::Rdf.parse(source).unwrap()
    }

    #[test]
    fn renamed_blanks_are_isomorphic() {
        let verdict = equivalent(
            &graph("_:a <http://e/p> _:b .\n_:b <http://e/q> \"v\" ."),
            &graph("_:c14n1 <http://e/q> \"v\" .\n_:c14n0 <http://e/p> _:c14n1 ."),
        );
        assert_eq!(verdict, Equivalence::Equivalent);
    }

    #[test]
    fn lost_triples_are_detected() {
        let verdict = equivalent(
            &graph("<http://e/s> <http://e/p> \"v\" .\n<http://e/s> <http://e/p> \"w\" ."),
            &graph("<http://e/s> <http://e/p> \"v\" ."),
        );
        assert!(matches!(verdict, Equivalence::Different(_)));
    }

    #[test]
    fn swapped_structure_is_not_isomorphic() {
        let verdict = equivalent(
            &graph("_:a <http://e/p> _:b .\n_:b <http://e/q> \"v\" ."),
            &graph("_:a <http://e/q> _:b .\n_:b <http://e/p> \"v\" ."),
        );
        assert!(matches!(verdict, Equivalence::Different(_)));
    }
}
