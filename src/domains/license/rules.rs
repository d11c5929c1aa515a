use crate::analysis::measure::ORDERED_AC;
use crate::error::RuleSetError;
use crate::rewriting::{Rule, ordered};

use super::LicenseOp;

pub fn rules() -> Result<Vec<Rule>, RuleSetError> {
    let mut rules = ordered::ac_rules(LicenseOp::Or, ORDERED_AC)?;
    rules.extend(ordered::ac_rules(LicenseOp::And, ORDERED_AC)?);
    rules.extend(ordered::absorption_rules(LicenseOp::Or, LicenseOp::And, ORDERED_AC)?);
    Ok(rules)
}
