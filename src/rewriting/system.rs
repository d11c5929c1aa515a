use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};

use crate::analysis::measure::{self, Measure};
use crate::error::RuleSetError;
use crate::language::Domain;

use super::Rule;

/// Orders a rule may declare by name in a rule file.
pub const NAMED_MEASURES: &[Measure] = &[measure::NODE_COUNT, measure::ORDERED_AC];

// Helper struct for serializing/deserializing rules
#[derive(Serialize, Deserialize)]
struct SerializableRule {
    name: String,
    from: String,
    to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    guard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    measure: Option<String>,
}

// Helper struct for loading rules from a JSON file
#[derive(Deserialize)]
struct RulesFile {
    domain: Domain,
    name: String,
    #[serde(default = "default_version")]
    version: String,
    rules: Vec<SerializableRule>,
}

fn default_version() -> String {
    "0".to_owned()
}

/// An ordered, versioned list of rules over one domain.
///
/// Declaration order is significant: at a given position the first rule that
/// applies wins.
#[derive(Clone, Debug)]
pub struct RuleSet {
    domain: Domain,
    name: String,
    version: String,
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(
        domain: Domain,
        name: impl Into<String>,
        version: impl Into<String>,
        rules: Vec<Rule>,
    ) -> Result<Self, RuleSetError> {
        let mut names = BTreeSet::new();
        for rule in &rules {
            rule.validate(domain)?;
            if !names.insert(rule.name()) {
                return Err(RuleSetError::DuplicateName(rule.name().to_owned()));
            }
        }

        Ok(Self {
            domain,
            name: name.into(),
            version: version.into(),
            rules,
        })
    }

    /// Loads an unguarded rule set from a JSON file of s-expression rules.
    pub fn from_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let file: RulesFile = crate::utils::json::load_json(path)?;
        let rules = file
            .rules
            .into_iter()
            .map(|rule| {
                if rule.guard.is_some() {
                    anyhow::bail!("rule `{}`: guards cannot be loaded from a file", rule.name);
                }
                let mut parsed = Rule::parse(file.domain, &rule.name, &rule.from, &rule.to)?;
                if let Some(name) = &rule.measure {
                    let Some(measure) = NAMED_MEASURES.iter().find(|m| m.name() == name) else {
                        anyhow::bail!("rule `{}`: unknown measure `{name}`", rule.name);
                    };
                    parsed = parsed.measured_by(*measure);
                }
                Ok(parsed)
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self::new(file.domain, file.name, file.version, rules)?)
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `name@version`, the identity recorded in reports and cache keys.
    pub fn identity(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn has_guards(&self) -> bool {
        self.rules.iter().any(Rule::is_guarded)
    }
}

impl Serialize for RuleSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("RuleSet", 4)?;
        state.serialize_field("domain", &self.domain)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("version", &self.version)?;

        let serializable_rules: Vec<SerializableRule> = self
            .rules
            .iter()
            .map(|rule| SerializableRule {
                name: rule.name().to_owned(),
                from: rule.from().to_string(),
                to: rule.to().to_string(),
                guard: rule.guard().map(|guard| guard.description().to_owned()),
                measure: rule.measure().map(|measure| measure.name().to_owned()),
            })
            .collect();
        state.serialize_field("rules", &serializable_rules)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::error::RuleSetError;
    use crate::language::Domain;
    use crate::rewriting::Rule;

    use super::RuleSet;

    #[test]
    fn rejects_duplicate_names() -> Result<(), RuleSetError> {
        let rules = rules!(Domain::Filter;
            "not-not": "(not (not $0))" => "$0",
            "not-not": "(not (not $0))" => "$0",
        );
        assert!(matches!(
            RuleSet::new(Domain::Filter, "dup", "1", rules),
            Err(RuleSetError::DuplicateName(_))
        ));
        Ok(())
    }

    #[test]
    fn serializes_rules_as_patterns() {
        let rules = vec![
            Rule::parse(Domain::Filter, "not-not", "(not (not $0))", "$0")
                .unwrap()
                .when("never", |_| false),
        ];
        let set = RuleSet::new(Domain::Filter, "toy", "2", rules).unwrap();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json["domain"], "filter");
        assert_eq!(json["rules"][0]["from"], "(not (not $0))");
        assert_eq!(json["rules"][0]["guard"], "never");
        assert_eq!(set.identity(), "toy@2");
    }

    #[test]
    fn loads_rule_file() {
        let path =
            std::env::temp_dir().join(format!("canonform-rules-{}.json", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"domain": "filter", "name": "toy", "rules": [
                {{"name": "not-not", "from": "(not (not $0))", "to": "$0", "measure": "nodes"}}
            ]}}"#
        )
        .unwrap();

        let set = RuleSet::from_json(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.version(), "0");
        assert_eq!(set.rules()[0].measure().unwrap().name(), "nodes");
    }
}
