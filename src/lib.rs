//! Canonical forms for license expressions, version ranges, RDF fragments,
//! metric formulas and path filters, computed by term rewriting, together
//! with the analyses that check each rule set behaves.

#[macro_use]
mod macros;

pub mod analysis;
pub mod cache;
pub mod config;
pub mod domains;
pub mod error;
pub mod language;
pub mod rewriting;
pub mod utils;
pub mod verification;

pub use config::{EngineConfig, VerifierConfig};
pub use domains::Equivalence;
pub use error::{ParseError, RuleSetError};
pub use language::{Domain, Term};
pub use rewriting::{NormalizationResult, RewriteEngine, RuleSet};
pub use verification::{PropertyVerifier, VerificationReport};

/// Parses `input` in `domain` and normalizes it with the domain's shipped rules.
pub fn normalize(
    domain: Domain,
    input: &str,
    config: EngineConfig,
) -> anyhow::Result<NormalizationResult> {
    let rules = domain.ruleset()?;
    let term = domain.parse(input)?;
    Ok(RewriteEngine::new(&rules, config).normalize(term))
}
