use std::fmt;

use serde::Serialize;

use crate::analysis::{LocalConfluence, Status, Termination};
use crate::language::Domain;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Property {
    Idempotence,
    Determinism,
    Confluence,
    Termination,
    Soundness,
    RoundTrip,
    /// Random redex choices reach the leftmost-outermost normal form.
    StrategyIndependence,
}

impl Property {
    pub const ALL: [Property; 7] = [
        Property::Idempotence,
        Property::Determinism,
        Property::Confluence,
        Property::Termination,
        Property::Soundness,
        Property::RoundTrip,
        Property::StrategyIndependence,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Property::Idempotence => "idempotence",
            Property::Determinism => "determinism",
            Property::Confluence => "confluence",
            Property::Termination => "termination",
            Property::Soundness => "soundness",
            Property::RoundTrip => "round-trip",
            Property::StrategyIndependence => "strategy-independence",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failing input, its shrunk form, and what went wrong.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub input: String,
    /// Smallest failing term found by shrinking, when smaller than `input`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimal: Option<String>,
    pub detail: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PropertyResult {
    pub property: Property,
    pub status: Status,
    /// Corpus entries, rules or critical pairs examined.
    pub checked: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl PropertyResult {
    pub fn new(property: Property, checked: usize, violations: Vec<Violation>) -> Self {
        let status = if violations.is_empty() { Status::Pass } else { Status::Fail };
        Self {
            property,
            status,
            checked,
            violations,
            note: None,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = self.status.combine(status);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DomainReport {
    pub domain: Domain,
    /// `name@version` of the verified rule set.
    pub ruleset: String,
    pub corpus: usize,
    pub properties: Vec<PropertyResult>,
    pub local_confluence: LocalConfluence,
    pub termination: Termination,
}

impl DomainReport {
    pub fn status(&self) -> Status {
        self.properties
            .iter()
            .map(|result| result.status)
            .fold(Status::Pass, Status::combine)
    }

    pub fn property(&self, property: Property) -> Option<&PropertyResult> {
        self.properties.iter().find(|result| result.property == property)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct VerificationReport {
    pub seed: u64,
    pub domains: Vec<DomainReport>,
}

impl VerificationReport {
    pub fn status(&self) -> Status {
        self.domains
            .iter()
            .map(DomainReport::status)
            .fold(Status::Pass, Status::combine)
    }

    /// Whether a CI gate should reject the rule sets.
    pub fn has_failures(&self) -> bool {
        self.status() == Status::Fail
    }
}
