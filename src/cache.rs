//! On-disk normalization cache.
//!
//! Entries are keyed by rule set identity and a SHA-256 digest of the domain
//! and the raw input, so a new rule set version never sees stale results.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{JsonError, ParseError};
use crate::language::Domain;
use crate::rewriting::RewriteEngine;
use crate::utils::json::{load_json, save_json};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedNormalForm {
    pub canonical: String,
    pub steps_taken: usize,
    pub terminated: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NormalizationCache {
    /// Rule set identity to input digest to result.
    entries: BTreeMap<String, BTreeMap<String, CachedNormalForm>>,
    #[serde(skip)]
    dirty: bool,
}

pub fn input_digest(domain: Domain, input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(domain.name().as_bytes());
    hasher.update([0u8]);
    hasher.update(input.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

impl NormalizationCache {
    /// Loads the cache at `path`, starting empty if the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, JsonError> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }
        load_json(path)
    }

    /// Writes the cache back if anything was inserted since loading.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<(), JsonError> {
        if self.dirty {
            save_json(self, path)?;
            self.dirty = false;
        }
        Ok(())
    }

    pub fn get(&self, ruleset: &str, domain: Domain, input: &str) -> Option<&CachedNormalForm> {
        self.entries.get(ruleset)?.get(&input_digest(domain, input))
    }

    pub fn insert(&mut self, ruleset: &str, domain: Domain, input: &str, result: CachedNormalForm) {
        self.entries
            .entry(ruleset.to_owned())
            .or_default()
            .insert(input_digest(domain, input), result);
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parses and normalizes `input`, consulting the cache first. Only
    /// terminated normalizations are stored.
    pub fn normalize(
        &mut self,
        engine: &RewriteEngine<'_>,
        input: &str,
    ) -> Result<CachedNormalForm, ParseError> {
        let rules = engine.rules();
        let identity = rules.identity();
        let domain = rules.domain();
        if let Some(hit) = self.get(&identity, domain, input) {
            tracing::debug!(%domain, input, "cache hit");
            return Ok(hit.clone());
        }

        let result = engine.normalize(domain.parse(input)?);
        let cached = CachedNormalForm {
            canonical: domain.serialize(&result.normal_form),
            steps_taken: result.steps_taken,
            terminated: result.terminated,
        };
        if cached.terminated {
            self.insert(&identity, domain, input, cached.clone());
        }
        Ok(cached)
    }
}

#[cfg(test)]
mod tests {
    use crate::language::Domain;
    use crate::rewriting::RewriteEngine;

    use super::{NormalizationCache, input_digest};

    #[test]
    fn digests_separate_domains() {
        assert_ne!(input_digest(Domain::License, "MIT"), input_digest(Domain::Filter, "MIT"));
        assert_eq!(input_digest(Domain::License, "MIT").len(), 64);
    }

    #[test]
    fn second_lookup_hits() {
        let rules = Domain::License.ruleset().unwrap();
        let engine = RewriteEngine::with_max_steps(&rules, 10_000);
        let mut cache = NormalizationCache::default();
        let first = cache.normalize(&engine, "MIT OR Apache-2.0 OR MIT").unwrap();
        assert_eq!(cache.len(), 1);
        let second = cache.normalize(&engine, "MIT OR Apache-2.0 OR MIT").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.canonical, "Apache-2.0 OR MIT");
        assert!(cache.get("other@1", Domain::License, "MIT OR Apache-2.0 OR MIT").is_none());
    }

    #[test]
    fn persists_through_json() {
        let path =
            std::env::temp_dir().join(format!("canonform-cache-{}.json", std::process::id()));
        let rules = Domain::Filter.ruleset().unwrap();
        let engine = RewriteEngine::with_max_steps(&rules, 10_000);
        let mut cache = NormalizationCache::load(&path).unwrap();
        assert!(cache.is_empty());
        cache.normalize(&engine, "!!a").unwrap();
        cache.save(&path).unwrap();

        let loaded = NormalizationCache::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let hit = loaded.get(&rules.identity(), Domain::Filter, "!!a").unwrap();
        assert_eq!(hit.canonical, "a");
    }

    #[test]
    fn parse_errors_are_not_cached() {
        let rules = Domain::Filter.ruleset().unwrap();
        let engine = RewriteEngine::with_max_steps(&rules, 10_000);
        let mut cache = NormalizationCache::default();
        assert!(cache.normalize(&engine, "a |").is_err());
        assert!(cache.is_empty());
    }
}
