use pest::Parser;
use pest_derive::Parser;

use crate::domains::syntax_error;
use crate::error::{ParseError, check_operands};
use crate::language::{Domain, Term};

use super::{SemVerOp, Version, comparator};

#[derive(Parser)]
#[grammar = "domains/semver/semver.pest"]
struct RangeParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

pub fn parse(source: &str) -> Result<Term, ParseError> {
    let expression = RangeParser::parse(Rule::expression, source)
        .map_err(|error| syntax_error(Domain::SemVer, error))?
        .next()
        .ok_or(ParseError::Empty {
            domain: Domain::SemVer,
        })?;

    let alternatives = check_operands(
        expression
            .into_inner()
            .filter(|pair| pair.as_rule() == Rule::range)
            .collect::<Vec<Pair<'_>>>(),
    )?;
    let alternatives = alternatives.into_iter().map(build_range).collect::<Result<Vec<_>, _>>()?;

    Term::chain(SemVerOp::Union, alternatives).ok_or(ParseError::Empty {
        domain: Domain::SemVer,
    })
}

fn build_range(pair: Pair<'_>) -> Result<Term, ParseError> {
    let elements = check_operands(pair.into_inner().collect::<Vec<Pair<'_>>>())?;
    let elements = elements
        .into_iter()
        .map(|inner| match inner.as_rule() {
            Rule::hyphen => {
                let mut versions = inner.into_inner();
                let from = version(versions.next())?;
                let to = version(versions.next())?;
                Ok(Term::symbol(
                    SemVerOp::Hyphen,
                    vec![Term::version(from), Term::version(to)],
                ))
            }
            Rule::simple => build_simple(inner),
            rule => unreachable!("grammar: unexpected {rule:?} in range"),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Term::chain(SemVerOp::Range, elements).ok_or(ParseError::Empty {
        domain: Domain::SemVer,
    })
}

fn build_simple(pair: Pair<'_>) -> Result<Term, ParseError> {
    let Some(inner) = pair.into_inner().next() else {
        unreachable!("grammar: simple has exactly one child");
    };

    if inner.as_rule() == Rule::version {
        let version = version(Some(inner))?;
        return Ok(if version.is_wildcard() {
            Term::constant(SemVerOp::Any)
        } else if version.is_full() {
            comparator(SemVerOp::Eq, version)
        } else {
            comparator(SemVerOp::XRange, version)
        });
    }

    let mut parts = inner.into_inner();
    let operator = parts.next().map(|p| p.as_str()).unwrap_or_default();
    let version = version(parts.next())?;
    let op = match operator {
        ">=" => SemVerOp::Gte,
        "<=" => SemVerOp::Lte,
        ">" => SemVerOp::Gt,
        "<" => SemVerOp::Lt,
        "=" => SemVerOp::Eq,
        "^" => SemVerOp::Caret,
        "~" | "~>" => SemVerOp::Tilde,
        other => unreachable!("grammar: unknown operator {other}"),
    };

    if op == SemVerOp::Lt && version == Version::floor_of(0, 0, 0) {
        return Ok(Term::constant(SemVerOp::None));
    }
    Ok(comparator(op, version))
}

fn version(pair: Option<Pair<'_>>) -> Result<Version, ParseError> {
    match pair {
        Some(pair) => Version::parse(pair.as_str()),
        None => unreachable!("grammar: missing version"),
    }
}
