use crate::analysis::measure::{Measure, ac_inversions, ac_left_nesting, node_count};
use crate::error::RuleSetError;
use crate::language::{Domain, Term};
use crate::rewriting::{Bindings, Rule, ordered};

use super::RdfOp;
use super::canonical::{displacement, relabel};

/// Misplaced blank labels first; relabelling may reorder triples.
pub const CANONICAL_LABELS: Measure = Measure::new(
    "canonical-labels",
    &[
        ("displacement", displacement),
        ("nodes", node_count),
        ("inversions", ac_inversions),
        ("left-nesting", ac_left_nesting),
    ],
);

pub fn rules() -> Result<Vec<Rule>, RuleSetError> {
    let mut rules = ordered::ac_rules(RdfOp::Merge, CANONICAL_LABELS)?;
    rules.push(
        Rule::parse(Domain::Rdf, "relabel", "(graph $0)", "(graph $1)")?
            .computing("$1 = $0 with canonical blank labels", &[1], |b| {
                relabel(b.get(0)?).map(|body: Term| Bindings::single(1, body))
            })
            .measured_by(CANONICAL_LABELS),
    );
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use crate::language::Domain;
    use crate::rewriting::engine::normalize;

    fn normal(source: &str) -> String {
        let rules = Domain::Rdf.ruleset().unwrap();
        let result = normalize(Domain::Rdf.parse(source).unwrap(), &rules, 10_000);
        assert!(result.terminated);
        Domain::Rdf.serialize(&result.normal_form)
    }

    #[test]
    fn blank_labels_do_not_matter() {
        let a = normal("_:a <http://e/p> <http://e/o> .");
        let b = normal("_:b <http://e/p> <http://e/o> .");
        assert_eq!(a, b);
        assert_eq!(a, "_:c14n0 <http://e/p> <http://e/o> .\n");
    }

    #[test]
    fn duplicate_triples_collapse() {
        assert_eq!(
            normal("<http://e/s> <http://e/p> \"v\" .\n<http://e/s> <http://e/p> \"v\" ."),
            "<http://e/s> <http://e/p> \"v\" .\n"
        );
    }

    #[test]
    fn symmetric_cycles_reach_a_normal_form() {
        assert_eq!(
            normal("_:x <http://e/p> _:y .\n_:y <http://e/p> _:x ."),
            "_:c14n0 <http://e/p> _:c14n1 .\n_:c14n1 <http://e/p> _:c14n0 .\n"
        );
        let three = "_:a <http://e/p> _:b .\n_:b <http://e/p> _:c .\n_:c <http://e/p> _:a .";
        assert_eq!(normal(three).lines().count(), 3);
    }

    #[test]
    fn isomorphic_graphs_coincide() {
        assert_eq!(
            normal("_:x <http://e/knows> _:y .\n_:y <http://e/name> \"Bob\" ."),
            normal("_:p <http://e/name> \"Bob\" .\n_:q <http://e/knows> _:p ."),
        );
    }
}
