//! Term rewriting: matching, unification, rules and the normalization engine.

pub mod engine;
pub mod equation;
pub mod matching;
pub mod ordered;
pub mod rule;
pub mod system;
pub mod unification;

pub use engine::{NormalizationResult, Outcome, Redex, RewriteEngine, RewriteStep};
pub use matching::{Bindings, Match};
pub use rule::{Guard, Rule};
pub use system::RuleSet;
