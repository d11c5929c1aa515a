use pest::Parser;
use pest_derive::Parser;

use crate::domains::syntax_error;
use crate::error::{ParseError, check_nesting, check_operands};
use crate::language::{Domain, Term};

use super::{MetricOp, list};

#[derive(Parser)]
#[grammar = "domains/metric/metric.pest"]
struct FormulaParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

pub fn parse(source: &str) -> Result<Term, ParseError> {
    check_nesting(source, &['(', '['], &[')', ']'])?;
    let expression = FormulaParser::parse(Rule::metric, source)
        .map_err(|error| syntax_error(Domain::Metric, error))?
        .next()
        .and_then(|metric| metric.into_inner().next())
        .ok_or(ParseError::Empty {
            domain: Domain::Metric,
        })?;
    build(expression)
}

fn build(pair: Pair<'_>) -> Result<Term, ParseError> {
    match pair.as_rule() {
        Rule::expression => {
            let operands = check_operands(pair.into_inner().collect::<Vec<Pair<'_>>>())?;
            let mut operands = operands.into_iter().map(build).collect::<Result<Vec<_>, _>>()?;
            if operands.len() == 1 {
                return Ok(operands.remove(0));
            }
            Ok(Term::symbol(MetricOp::Sum, vec![list(operands)]))
        }
        Rule::product => {
            let factors = check_operands(pair.into_inner().collect::<Vec<Pair<'_>>>())?;
            let factors = factors.into_iter().map(build).collect::<Result<Vec<_>, _>>()?;
            match Term::chain(MetricOp::Weighted, factors) {
                Some(product) => Ok(product),
                None => unreachable!("grammar: products have a factor"),
            }
        }
        Rule::factor => match pair.into_inner().next() {
            Some(inner) => build(inner),
            None => unreachable!("grammar: factor has one child"),
        },
        Rule::number => {
            let value: f64 = pair
                .as_str()
                .parse()
                .map_err(|_| ParseError::InvalidNumber(pair.as_str().to_owned()))?;
            if !value.is_finite() {
                return Err(ParseError::InvalidNumber(pair.as_str().to_owned()));
            }
            Ok(Term::number(value))
        }
        Rule::identifier => Ok(Term::text(MetricOp::Var, pair.as_str())),
        Rule::call => {
            let mut inner = pair.into_inner();
            let name = inner.next().map(|p| p.as_str().to_ascii_lowercase()).unwrap_or_default();
            let op = match name.as_str() {
                "sum" => MetricOp::Sum,
                "avg" => MetricOp::Avg,
                "min" => MetricOp::Min,
                _ => MetricOp::Max,
            };

            let arguments = match inner.next() {
                Some(list) if list.as_rule() == Rule::list => list.into_inner().next(),
                other => other,
            };
            let Some(arguments) = arguments else {
                return Err(ParseError::EmptyArguments { function: name });
            };
            let elements = check_operands(arguments.into_inner().collect::<Vec<Pair<'_>>>())?;
            let elements = elements.into_iter().map(build).collect::<Result<Vec<_>, _>>()?;
            Ok(Term::symbol(op, vec![list(elements)]))
        }
        rule => unreachable!("grammar: unexpected {rule:?} in formula"),
    }
}
