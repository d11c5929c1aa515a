use pest::Parser;
use pest_derive::Parser;

use crate::domains::syntax_error;
use crate::error::{ParseError, check_nesting, check_operands};
use crate::language::{Domain, Term};

use super::LicenseOp;

#[derive(Parser)]
#[grammar = "domains/license/license.pest"]
struct LicenseParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

pub fn parse(source: &str) -> Result<Term, ParseError> {
    check_nesting(source, &['('], &[')'])?;
    let mut pairs = LicenseParser::parse(Rule::expression, source)
        .map_err(|error| syntax_error(Domain::License, error))?;

    let expression = pairs.next().and_then(|pair| pair.into_inner().next());
    match expression {
        Some(pair) => build(pair),
        None => Err(ParseError::Empty {
            domain: Domain::License,
        }),
    }
}

fn build(pair: Pair<'_>) -> Result<Term, ParseError> {
    match pair.as_rule() {
        Rule::or_expr => chain(LicenseOp::Or, pair),
        Rule::and_expr => chain(LicenseOp::And, pair),
        Rule::primary => match pair.into_inner().next() {
            Some(inner) => build(inner),
            None => unreachable!("grammar: primary has exactly one child"),
        },
        Rule::with_expr => {
            let mut inner = pair.into_inner();
            let license = inner.next().map(|p| p.as_str()).unwrap_or_default();
            let exception = inner.find(|p| p.as_rule() == Rule::exception_id);
            Ok(Term::symbol(
                LicenseOp::With,
                vec![
                    Term::text(LicenseOp::License, license),
                    Term::text(
                        LicenseOp::Exception,
                        exception.map(|p| p.as_str()).unwrap_or_default(),
                    ),
                ],
            ))
        }
        Rule::identifier => Ok(Term::text(LicenseOp::License, pair.as_str())),
        rule => unreachable!("grammar: unexpected {rule:?} in expression"),
    }
}

fn chain(op: LicenseOp, pair: Pair<'_>) -> Result<Term, ParseError> {
    let operands = check_operands(
        pair.into_inner()
            .filter(|p| !matches!(p.as_rule(), Rule::and_kw | Rule::or_kw))
            .collect::<Vec<Pair<'_>>>(),
    )?;
    let operands = operands.into_iter().map(build).collect::<Result<Vec<_>, _>>()?;
    match Term::chain(op, operands) {
        Some(term) => Ok(term),
        None => unreachable!("grammar: chains have at least one operand"),
    }
}
