//! Engine and verifier limits.
//!
//! Every field has a default, so a configuration file only needs to name the
//! values it changes. Command line flags override the file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Rewrites performed before normalization gives up.
    pub max_steps: usize,
    /// Wall-clock budget per normalization, checked between steps.
    pub deadline_ms: Option<u64>,
    pub record_trace: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: 10_000,
            deadline_ms: None,
            record_trace: false,
        }
    }
}

impl EngineConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    pub engine: EngineConfig,
    /// Generated terms added to the curated corpus.
    pub corpus_size: usize,
    pub seed: u64,
    /// Depth bound of generated terms and of pool terms substituted into rules.
    pub max_depth: usize,
    /// Instances examined per rule or critical pair before the answer becomes unknown.
    pub max_instances: usize,
    /// Re-runs compared against the first normalization of each corpus term.
    pub determinism_runs: usize,
    /// Normalizations with a randomly chosen redex per corpus term.
    pub strategy_runs: usize,
    pub shrink_limit: usize,
    /// Violations kept per property.
    pub max_violations: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            corpus_size: 200,
            seed: 0x5eed,
            max_depth: 3,
            max_instances: 1024,
            determinism_runs: 3,
            strategy_runs: 2,
            shrink_limit: 200,
            max_violations: 5,
        }
    }
}

impl VerifierConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Self = crate::utils::json::load_json(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_steps == 0 {
            return Err(ConfigError::Invalid("engine.max_steps must be positive".into()));
        }
        if self.determinism_runs < 3 {
            return Err(ConfigError::Invalid("determinism_runs must be at least 3".into()));
        }
        if self.max_instances == 0 {
            return Err(ConfigError::Invalid("max_instances must be positive".into()));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineConfig, VerifierConfig};

    #[test]
    fn partial_json_keeps_defaults() {
        let config: VerifierConfig =
            serde_json::from_str(r#"{"seed": 9, "engine": {"max_steps": 50}}"#).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.engine.max_steps, 50);
        assert_eq!(config.corpus_size, VerifierConfig::default().corpus_size);
        assert!(!config.engine.record_trace);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<VerifierConfig>(r#"{"sed": 1}"#).is_err());
    }

    #[test]
    fn validation() {
        assert!(VerifierConfig::default().validate().is_ok());
        for runs in [1, 2] {
            let config = VerifierConfig {
                determinism_runs: runs,
                ..VerifierConfig::default()
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn deadline() {
        let config = EngineConfig {
            deadline_ms: Some(250),
            ..EngineConfig::default()
        };
        assert_eq!(config.deadline().unwrap().as_millis(), 250);
    }
}
