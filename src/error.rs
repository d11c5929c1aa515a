use thiserror::Error;

use crate::language::{Domain, VariableId};

/// Deepest bracket nesting any parser accepts.
pub const MAX_NESTING: usize = 256;
/// Deepest term a surface parser may produce.
pub const MAX_TERM_DEPTH: usize = 2048;
/// Most operands one associative chain may hold. Chains are right-nested, so
/// this also bounds their depth.
pub const MAX_OPERANDS: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty {domain} input")]
    Empty { domain: Domain },

    #[error("{domain} syntax error at byte {offset}: {message}")]
    Syntax {
        domain: Domain,
        offset: usize,
        message: String,
    },

    #[error("invalid version `{text}`: {reason}")]
    InvalidVersion { text: String, reason: String },

    #[error("invalid glob `{pattern}`: {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("undeclared prefix `{prefix}:`")]
    UnknownPrefix { prefix: String },

    #[error("input nested deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("more than {limit} operands in one list or chain")]
    TooManyOperands { limit: usize },

    #[error("unknown {domain} operator `{name}`")]
    UnknownOperator { domain: Domain, name: String },

    #[error("operator `{op}` takes {expected} arguments, found {found}")]
    Arity {
        op: String,
        expected: usize,
        found: usize,
    },

    #[error("`{function}` needs at least one argument")]
    EmptyArguments { function: String },

    #[error("invalid number `{0}`")]
    InvalidNumber(String),
}

#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("rule `{rule}`: {source}")]
    Pattern {
        rule: String,
        #[source]
        source: ParseError,
    },

    #[error("rule `{rule}`: left-hand side must be an operator application")]
    VariableLhs { rule: String },

    #[error("rule `{rule}`: right-hand side uses unbound variable ${variable}")]
    UnboundVariable { rule: String, variable: VariableId },

    #[error("rule `{rule}` mixes operators of {expected} and {found}")]
    ForeignOperator {
        rule: String,
        expected: Domain,
        found: Domain,
    },

    #[error("duplicate rule name `{0}`")]
    DuplicateName(String),
}

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot load configuration: {0}")]
    Load(#[from] JsonError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Guards the depth of a freshly parsed surface term.
pub(crate) fn check_depth(term: &crate::language::Term) -> Result<(), ParseError> {
    if term.depth() > MAX_TERM_DEPTH {
        Err(ParseError::TooDeep {
            limit: MAX_TERM_DEPTH,
        })
    } else {
        Ok(())
    }
}

/// Guards the length of a chain before it is built.
pub(crate) fn check_operands<T>(operands: Vec<T>) -> Result<Vec<T>, ParseError> {
    if operands.len() > MAX_OPERANDS {
        Err(ParseError::TooManyOperands { limit: MAX_OPERANDS })
    } else {
        Ok(operands)
    }
}

/// Guards bracket nesting before handing input to a recursive parser.
pub(crate) fn check_nesting(source: &str, open: &[char], close: &[char]) -> Result<(), ParseError> {
    let mut depth = 0usize;
    for c in source.chars() {
        if open.contains(&c) {
            depth += 1;
            if depth > MAX_NESTING {
                return Err(ParseError::TooDeep { limit: MAX_NESTING });
            }
        } else if close.contains(&c) {
            depth = depth.saturating_sub(1);
        }
    }
    Ok(())
}
