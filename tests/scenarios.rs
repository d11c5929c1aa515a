use canonform::analysis::Status;
use canonform::config::{EngineConfig, VerifierConfig};
use canonform::error::ParseError;
use canonform::verification::{Property, verify_domains};
use canonform::{Domain, RewriteEngine};

fn canonical(domain: Domain, input: &str) -> String {
    let result = canonform::normalize(domain, input, EngineConfig::default()).unwrap();
    assert!(result.terminated, "{input} did not terminate");
    domain.serialize(&result.normal_form)
}

#[test]
fn duplicate_licenses_collapse() {
    assert_eq!(canonical(Domain::License, "Apache-2.0 OR Apache-2.0"), "Apache-2.0");
}

#[test]
fn absorbed_licenses_vanish() {
    assert_eq!(canonical(Domain::License, "MIT AND (MIT OR Apache-2.0)"), "MIT");
}

#[test]
fn hyphen_ranges_become_comparators() {
    assert_eq!(canonical(Domain::SemVer, "1.0.0 - 2.0.0"), ">=1.0.0 <=2.0.0");
}

#[test]
fn blank_node_labels_do_not_matter() {
    let a = canonical(Domain::Rdf, "_:a <http://example.org/p> <http://example.org/o> .");
    let b = canonical(Domain::Rdf, "_:b <http://example.org/p> <http://example.org/o> .");
    assert_eq!(a, b);
    assert!(a.starts_with("_:c14n0 "));
}

#[test]
fn weighted_averages_are_idempotent() {
    let rules = Domain::Metric.ruleset().unwrap();
    let engine = RewriteEngine::new(&rules, EngineConfig::default());
    let term = Domain::Metric.parse("avg([w1 * sum(a), w2 * sum(b)])").unwrap();
    let once = engine.normalize(term);
    assert!(once.terminated);
    let twice = engine.normalize(once.normal_form.clone());
    assert_eq!(twice.normal_form, once.normal_form);
    assert_eq!(twice.steps_taken, 0);
}

#[test]
fn empty_input_is_a_parse_error() {
    for domain in Domain::ALL {
        assert!(matches!(domain.parse(""), Err(ParseError::Empty { .. })), "{domain}");
        assert!(canonform::normalize(domain, "  ", EngineConfig::default()).is_err());
    }
}

#[test]
fn step_limit_returns_the_partial_term() {
    let config = EngineConfig {
        max_steps: 1,
        ..EngineConfig::default()
    };
    let input = "MIT OR ISC OR MIT OR Apache-2.0";
    let result = canonform::normalize(Domain::License, input, config).unwrap();
    assert!(!result.terminated);
    assert_eq!(result.steps_taken, 1);
    assert_ne!(result.normal_form, result.original);
}

#[test]
fn shipped_rule_sets_pass_the_gate_properties() {
    let config = VerifierConfig {
        corpus_size: 40,
        max_instances: 256,
        ..VerifierConfig::default()
    };
    let report = verify_domains(&Domain::ALL, &config).unwrap();
    assert_eq!(report.domains.len(), Domain::ALL.len());
    for domain in &report.domains {
        for property in [Property::Idempotence, Property::Determinism, Property::RoundTrip] {
            let result = domain.property(property).unwrap();
            let context = format!("{} {property}: {:?}", domain.domain, result.violations);
            assert_eq!(result.status, Status::Pass, "{context}");
        }
        for property in Property::ALL {
            let result = domain.property(property).unwrap();
            let context = format!("{} {property}: {:?}", domain.domain, result.violations);
            assert_ne!(result.status, Status::Fail, "{context}");
        }
        assert_ne!(domain.status(), Status::Fail, "{}", domain.domain);
    }
    assert!(!report.has_failures());
}

#[test]
fn symmetric_blank_nodes_terminate() {
    let text = canonical(Domain::Rdf, "_:x <http://e/p> _:y .\n_:y <http://e/p> _:x .");
    assert_eq!(text, "_:c14n0 <http://e/p> _:c14n1 .\n_:c14n1 <http://e/p> _:c14n0 .\n");
}

#[test]
fn flat_license_lists_parse_without_overflowing() {
    let ids: Vec<String> = (0..1_000_000).map(|i| format!("L{i}")).collect();
    let error = Domain::License.parse(&ids.join(" OR ")).unwrap_err();
    assert!(matches!(error, ParseError::TooManyOperands { .. }), "{error}");
    assert!(Domain::License.parse(&ids[..2000].join(" OR ")).is_ok());
}
