//! Canonical blank node labels.
//!
//! Blank nodes are coloured by the shape of the triples they occur in, the
//! colouring is refined until stable, and remaining ties are broken by
//! individualising each member of the first non-trivial colour class in turn.
//! Among all leaves of that search the labelling whose serialization sorts
//! first wins, which makes the result independent of the input labels.

use std::collections::{BTreeMap, BTreeSet};

use crate::language::{Op, Term};

use super::{RdfOp, write_node};

/// Search leaves explored before settling for the best labelling so far.
const MAX_LEAVES: usize = 512;

pub const LABEL_PREFIX: &str = "c14n";

type Colouring<'t> = BTreeMap<&'t str, usize>;

fn blank_label(term: &Term) -> Option<&str> {
    match term.op() {
        Some(Op::Rdf(RdfOp::Blank)) => term.leaf_text(),
        _ => None,
    }
}

/// Triples of a graph body; other chain elements (pattern variables) are ignored.
pub fn triples(body: &Term) -> Vec<&Term> {
    body.chain_elements(RdfOp::Merge)
        .into_iter()
        .filter(|element| element.has_op(RdfOp::Triple))
        .collect()
}

fn blanks<'t>(triples: &[&'t Term]) -> BTreeSet<&'t str> {
    triples
        .iter()
        .flat_map(|triple| triple.children())
        .filter_map(blank_label)
        .collect()
}

/// How `triple` looks from blank node `own`, with other blanks replaced by
/// their colour.
fn shape(triple: &Term, own: &str, colours: &Colouring<'_>) -> String {
    let mut out = String::new();
    for node in triple.children() {
        match blank_label(node) {
            Some(label) if label == own => out.push('@'),
            Some(label) => {
                let colour = colours.get(label).copied().unwrap_or_default();
                out.push_str(&format!("_{colour}"));
            }
            None => write_node(node, &mut out),
        }
        out.push(' ');
    }
    out
}

fn refine<'t>(triples: &[&'t Term], mut colours: Colouring<'t>) -> Colouring<'t> {
    loop {
        let classes = colours.values().collect::<BTreeSet<_>>().len();
        let signatures: BTreeMap<&str, (usize, Vec<String>)> = colours
            .iter()
            .map(|(&blank, &colour)| {
                let mut shapes: Vec<String> = triples
                    .iter()
                    .filter(|triple| {
                        triple.children().iter().any(|node| blank_label(node) == Some(blank))
                    })
                    .map(|triple| shape(triple, blank, &colours))
                    .collect();
                shapes.sort();
                (blank, (colour, shapes))
            })
            .collect();

        let ranks: BTreeMap<&(usize, Vec<String>), usize> = signatures
            .values()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .enumerate()
            .map(|(rank, signature)| (signature, rank))
            .collect();
        let refined: Colouring<'t> = signatures
            .iter()
            .map(|(&blank, signature)| (blank, ranks[signature]))
            .collect();

        let refined_classes = ranks.len();
        if refined_classes == classes {
            return refined;
        }
        colours = refined;
    }
}

fn rename(term: &Term, labels: &BTreeMap<String, String>) -> Term {
    term.transform(|node| {
        let label = labels.get(blank_label(node)?)?;
        Some(Term::text(RdfOp::Blank, label.clone()))
    })
}

fn serialize_sorted(triples: &[&Term], labels: &BTreeMap<String, String>) -> String {
    let mut lines: Vec<String> = triples
        .iter()
        .map(|triple| {
            let mut line = String::new();
            write_node(&rename(triple, labels), &mut line);
            line
        })
        .collect();
    lines.sort();
    lines.join("\n")
}

struct Search<'a, 't> {
    triples: &'a [&'t Term],
    leaves: usize,
    best: Option<(String, BTreeMap<String, String>)>,
}

impl<'t> Search<'_, 't> {
    fn explore(&mut self, colours: Colouring<'t>) {
        let colours = refine(self.triples, colours);

        let mut classes: BTreeMap<usize, Vec<&'t str>> = BTreeMap::new();
        for (&blank, &colour) in &colours {
            classes.entry(colour).or_default().push(blank);
        }

        match classes.values().find(|members| members.len() > 1) {
            None => {
                self.leaves += 1;
                let labels: BTreeMap<String, String> = colours
                    .iter()
                    .map(|(&blank, &colour)| (blank.to_owned(), format!("{LABEL_PREFIX}{colour}")))
                    .collect();
                let rendered = serialize_sorted(self.triples, &labels);
                if self.best.as_ref().is_none_or(|(best, _)| rendered < *best) {
                    self.best = Some((rendered, labels));
                }
            }
            Some(members) => {
                for &member in members {
                    if self.leaves >= MAX_LEAVES {
                        break;
                    }
                    let mut individualised = colours.clone();
                    individualised.insert(member, usize::MAX);
                    self.explore(individualised);
                }
            }
        }
    }
}

/// Best labelling of `triples` with its rendering, `None` without blank nodes.
fn search(triples: &[&Term]) -> Option<(String, BTreeMap<String, String>)> {
    let blanks = blanks(triples);
    if blanks.is_empty() {
        return None;
    }

    let mut search = Search {
        triples,
        leaves: 0,
        best: None,
    };
    search.explore(blanks.iter().map(|&blank| (blank, 0)).collect());
    if search.leaves >= MAX_LEAVES {
        tracing::debug!(blanks = blanks.len(), "blank node labelling search truncated");
    }
    search.best
}

/// Maps every blank label of `triples` to its canonical label.
pub fn canonical_labels(triples: &[&Term]) -> BTreeMap<String, String> {
    search(triples).map(|(_, labels)| labels).unwrap_or_default()
}

/// Canonical labels for `triples`, or `None` when the current labelling
/// already renders like the best one. Graphs with automorphisms have several
/// best labellings; any of them counts as canonical.
fn pending_labels(triples: &[&Term]) -> Option<BTreeMap<String, String>> {
    let (rendered, labels) = search(triples)?;
    let identity = labels.iter().all(|(old, new)| old == new);
    if identity || serialize_sorted(triples, &BTreeMap::new()) == rendered {
        return None;
    }
    Some(labels)
}

/// Body of a graph with its blank nodes relabelled canonically, `None` when
/// the labels are canonical already.
pub fn relabel(body: &Term) -> Option<Term> {
    let labels = pending_labels(&triples(body))?;
    Some(rename(body, &labels))
}

/// Blank node occurrences whose label differs from the canonical one, summed
/// over every graph in `term`. Zero exactly when `relabel` has nothing to do.
pub fn displacement(term: &Term) -> u64 {
    term.preorder()
        .filter(|(_, node)| node.has_op(RdfOp::Graph))
        .map(|(_, graph)| {
            let Some(body) = graph.children().first() else {
                return 0;
            };
            let triples = triples(body);
            let Some(labels) = pending_labels(&triples) else {
                return 0;
            };
            triples
                .iter()
                .flat_map(|triple| triple.children())
                .filter_map(blank_label)
                .filter(|label| labels.get(*label).is_some_and(|canonical| canonical != label))
                .count() as u64
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use crate::language::{Domain, Term};

    use super::{canonical_labels, displacement, relabel, triples};

    fn graph(source: &str) -> Term {
        Domain::Rdf.parse(source).unwrap()
    }

    fn canonical(source: &str) -> Term {
        let graph = graph(source);
        let body = &graph.children()[0];
        relabel(body).unwrap_or_else(|| body.clone())
    }

    fn sorted_lines(body: &Term) -> Vec<String> {
        let mut lines: Vec<String> = triples(body).iter().map(|t| t.to_string()).collect();
        lines.sort();
        lines
    }

    #[test]
    fn labels_do_not_depend_on_input_names() {
        let a = canonical("_:x <http://e/p> _:y .\n_:y <http://e/q> \"v\" .");
        let b = canonical("_:q <http://e/q> \"v\" .\n_:zz <http://e/p> _:q .");
        assert_eq!(sorted_lines(&a), sorted_lines(&b));
    }

    #[test]
    fn symmetric_blanks_are_resolved() {
        let a = canonical("_:a <http://e/p> _:b .\n_:b <http://e/p> _:a .");
        let b = canonical("_:m <http://e/p> _:n .\n_:n <http://e/p> _:m .");
        assert_eq!(sorted_lines(&a), sorted_lines(&b));
        assert!(a.to_string().contains("c14n0") && a.to_string().contains("c14n1"));
    }

    #[test]
    fn relabelling_a_symmetric_graph_is_a_fixpoint() {
        let once = canonical("_:x <http://e/p> _:y .\n_:y <http://e/p> _:x .");
        assert_eq!(relabel(&once), None);
        assert_eq!(displacement(&Term::symbol(super::RdfOp::Graph, vec![once])), 0);

        let swapped = canonical("_:c14n1 <http://e/p> _:c14n0 .\n_:c14n0 <http://e/p> _:c14n1 .");
        assert_eq!(relabel(&swapped), None);
    }

    #[test]
    fn displacement_is_zero_once_canonical() {
        let input = graph("_:x <http://e/p> <http://e/o> .");
        assert_eq!(displacement(&input), 1);
        let body = relabel(&input.children()[0]).unwrap();
        assert_eq!(relabel(&body), None);
        let labels = canonical_labels(&triples(&body));
        assert_eq!(labels.get("c14n0").map(String::as_str), Some("c14n0"));
    }
}
