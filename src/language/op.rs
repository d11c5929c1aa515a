use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domains::{
    filter::FilterOp, license::LicenseOp, metric::MetricOp, rdf::RdfOp, semver::SemVerOp,
};

use super::{Domain, Sort};

/// Equational theory an operator is normalized modulo.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Theory {
    Free,
    /// Binary, argument order immaterial.
    Commutative,
    /// Binary, right-nested chains whose element order and grouping are immaterial.
    AssociativeCommutative,
    /// `cons`-style list: right spine of pairs whose element order is immaterial.
    Bag,
}

/// Static description of one operator of a domain signature.
pub trait Signature: Copy + Eq + Sized + 'static {
    const ALL: &'static [Self];

    fn name(self) -> &'static str;

    fn arity(self) -> usize;

    /// Sort of terms headed by this operator.
    fn sort(self) -> Sort;

    fn argument_sort(self, index: usize) -> Sort;

    fn theory(self) -> Theory {
        Theory::Free
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.name() == name)
    }
}

/// Operator of any domain.
///
/// The derived order (domain first, then declaration order inside the domain)
/// is part of the canonical term order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Op {
    License(LicenseOp),
    SemVer(SemVerOp),
    Rdf(RdfOp),
    Metric(MetricOp),
    Filter(FilterOp),
}

macro_rules! dispatch {
    ($self:expr, $op:ident => $body:expr) => {
        match $self {
            Op::License($op) => $body,
            Op::SemVer($op) => $body,
            Op::Rdf($op) => $body,
            Op::Metric($op) => $body,
            Op::Filter($op) => $body,
        }
    };
}

impl Op {
    pub fn domain(self) -> Domain {
        match self {
            Op::License(_) => Domain::License,
            Op::SemVer(_) => Domain::SemVer,
            Op::Rdf(_) => Domain::Rdf,
            Op::Metric(_) => Domain::Metric,
            Op::Filter(_) => Domain::Filter,
        }
    }

    pub fn name(self) -> &'static str {
        dispatch!(self, op => op.name())
    }

    pub fn arity(self) -> usize {
        dispatch!(self, op => op.arity())
    }

    pub fn sort(self) -> Sort {
        dispatch!(self, op => op.sort())
    }

    pub fn argument_sort(self, index: usize) -> Sort {
        dispatch!(self, op => op.argument_sort(index))
    }

    pub fn theory(self) -> Theory {
        dispatch!(self, op => op.theory())
    }

    pub fn from_name(domain: Domain, name: &str) -> Option<Op> {
        match domain {
            Domain::License => LicenseOp::from_name(name).map(Op::License),
            Domain::SemVer => SemVerOp::from_name(name).map(Op::SemVer),
            Domain::Rdf => RdfOp::from_name(name).map(Op::Rdf),
            Domain::Metric => MetricOp::from_name(name).map(Op::Metric),
            Domain::Filter => FilterOp::from_name(name).map(Op::Filter),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<LicenseOp> for Op {
    fn from(op: LicenseOp) -> Self {
        Op::License(op)
    }
}

impl From<SemVerOp> for Op {
    fn from(op: SemVerOp) -> Self {
        Op::SemVer(op)
    }
}

impl From<RdfOp> for Op {
    fn from(op: RdfOp) -> Self {
        Op::Rdf(op)
    }
}

impl From<MetricOp> for Op {
    fn from(op: MetricOp) -> Self {
        Op::Metric(op)
    }
}

impl From<FilterOp> for Op {
    fn from(op: FilterOp) -> Self {
        Op::Filter(op)
    }
}
