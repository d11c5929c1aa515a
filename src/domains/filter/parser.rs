use pest::Parser;
use pest_derive::Parser;

use crate::domains::syntax_error;
use crate::error::{ParseError, check_nesting, check_operands};
use crate::language::{Domain, Term};

use super::FilterOp;
use super::glob::{Glob, check_segments, is_glob};

#[derive(Parser)]
#[grammar = "domains/filter/filter.pest"]
struct FilterParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

pub fn parse(source: &str) -> Result<Term, ParseError> {
    check_nesting(source, &['('], &[')'])?;
    let union = FilterParser::parse(Rule::filter, source)
        .map_err(|error| syntax_error(Domain::Filter, error))?
        .next()
        .and_then(|filter| filter.into_inner().next())
        .ok_or(ParseError::Empty {
            domain: Domain::Filter,
        })?;
    build(union)
}

/// Classifies a bare token as a literal path or a validated glob.
pub fn leaf(token: &str) -> Result<Term, ParseError> {
    if is_glob(token) {
        Glob::compile(token)?;
        Ok(Term::text(FilterOp::Glob, token))
    } else {
        check_segments(token)?;
        Ok(Term::text(FilterOp::Lit, token))
    }
}

fn build(pair: Pair<'_>) -> Result<Term, ParseError> {
    match pair.as_rule() {
        Rule::union => chain(FilterOp::Union, pair),
        Rule::intersection => chain(FilterOp::Intersect, pair),
        Rule::unary => match pair.into_inner().next() {
            Some(inner) => build(inner),
            None => unreachable!("grammar: unary has one child"),
        },
        Rule::negation => match pair.into_inner().next() {
            Some(inner) => Ok(Term::symbol(FilterOp::Not, vec![build(inner)?])),
            None => unreachable!("grammar: negation has an operand"),
        },
        Rule::token => leaf(pair.as_str()),
        rule => unreachable!("grammar: unexpected {rule:?} in filter"),
    }
}

fn chain(op: FilterOp, pair: Pair<'_>) -> Result<Term, ParseError> {
    let operands = check_operands(pair.into_inner().collect::<Vec<Pair<'_>>>())?;
    let operands = operands.into_iter().map(build).collect::<Result<Vec<_>, _>>()?;
    match Term::chain(op, operands) {
        Some(term) => Ok(term),
        None => unreachable!("grammar: chains have at least one operand"),
    }
}
