//! Term model shared by every domain.
//!
//! A [`Term`] is a tree of domain operators ([`Op`]) over [`Literal`] leaves,
//! with [`Term::Variable`] leaves used only inside rule patterns.

pub mod float;
pub mod literal;
pub mod op;
pub mod pattern;
pub mod position;
pub mod term;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use float::CanonicalFloat;
pub use literal::Literal;
pub use op::{Op, Signature, Theory};
pub use position::Position;
pub use term::{Preorder, Symbol, Term, VariableId};

/// Sorts of term positions. Rule variables range over terms of one sort.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Sort {
    License,
    Exception,
    Range,
    Version,
    Document,
    Graph,
    RdfNode,
    Metric,
    MetricList,
    Filter,
    Text,
    Number,
}

/// The five normalization domains.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    License,
    SemVer,
    Rdf,
    Metric,
    Filter,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::License,
        Domain::SemVer,
        Domain::Rdf,
        Domain::Metric,
        Domain::Filter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Domain::License => "license",
            Domain::SemVer => "semver",
            Domain::Rdf => "rdf",
            Domain::Metric => "metric",
            Domain::Filter => "filter",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .into_iter()
            .find(|domain| domain.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown domain `{s}`, expected one of: {}",
                    Domain::ALL.map(Domain::name).join(", ")
                )
            })
    }
}
