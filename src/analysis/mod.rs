//! Static analyses of rule sets: termination measures, termination evidence
//! and critical pairs.

pub mod critical_pairs;
pub mod instances;
pub mod measure;
pub mod termination;

use std::fmt;

use serde::Serialize;

pub use critical_pairs::{CriticalPair, CriticalPairAnalyzer, Joinability, LocalConfluence};
pub use termination::{Termination, TerminationChecker};

/// Outcome of a property check. The order is by severity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Unknown,
    Fail,
}

impl Status {
    /// The more severe of two outcomes.
    pub fn combine(self, other: Status) -> Status {
        self.max(other)
    }

    /// Global confluence by Newman's lemma: local confluence and termination
    /// together; any non-joinable pair refutes it outright.
    pub fn confluence(local: Status, termination: Status) -> Status {
        match (local, termination) {
            (Status::Fail, _) => Status::Fail,
            (Status::Pass, Status::Pass) => Status::Pass,
            _ => Status::Unknown,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Pass => "pass",
            Status::Unknown => "unknown",
            Status::Fail => "fail",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Status;

    #[test]
    fn severity_order() {
        assert_eq!(Status::Pass.combine(Status::Unknown), Status::Unknown);
        assert_eq!(Status::Fail.combine(Status::Pass), Status::Fail);
    }

    #[test]
    fn newman() {
        assert_eq!(Status::confluence(Status::Pass, Status::Pass), Status::Pass);
        assert_eq!(Status::confluence(Status::Pass, Status::Unknown), Status::Unknown);
        assert_eq!(Status::confluence(Status::Fail, Status::Pass), Status::Fail);
        assert_eq!(Status::confluence(Status::Unknown, Status::Fail), Status::Unknown);
    }
}
