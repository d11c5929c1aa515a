use std::collections::BTreeMap;

use pest::Parser;
use pest_derive::Parser;

use crate::domains::syntax_error;
use crate::error::{ParseError, check_operands};
use crate::language::{Domain, Term};

use super::{RDF_TYPE, RdfOp, XSD_STRING};

#[derive(Parser)]
#[grammar = "domains/rdf/rdf.pest"]
struct TurtleParser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;

#[derive(Default)]
struct Context {
    prefixes: BTreeMap<String, String>,
    triples: Vec<Term>,
}

pub fn parse(source: &str) -> Result<Term, ParseError> {
    let document = TurtleParser::parse(Rule::document, source)
        .map_err(|error| syntax_error(Domain::Rdf, error))?
        .next()
        .ok_or(ParseError::Empty { domain: Domain::Rdf })?;

    let mut context = Context::default();
    for statement in document.into_inner() {
        match statement.as_rule() {
            Rule::prefix => {
                let mut inner = statement.into_inner();
                let name = inner.next().map(|p| p.as_str()).unwrap_or_default();
                let iri = inner.next().map(|p| unbracket(p.as_str())).unwrap_or_default();
                context
                    .prefixes
                    .insert(name.trim_end_matches(':').to_owned(), iri.to_owned());
            }
            Rule::triples => context.statement(statement)?,
            _ => {}
        }
    }

    let triples = Term::chain(RdfOp::Merge, check_operands(context.triples)?)
        .ok_or(ParseError::Empty { domain: Domain::Rdf })?;
    Ok(Term::symbol(RdfOp::Graph, vec![triples]))
}

fn unbracket(iri: &str) -> &str {
    iri.trim_start_matches('<').trim_end_matches('>')
}

fn unescape(quoted: &str) -> String {
    let body = quoted.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(quoted);
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

impl Context {
    fn statement(&mut self, pair: Pair<'_>) -> Result<(), ParseError> {
        let mut inner = pair.into_inner();
        let subject = match inner.next() {
            Some(subject) => self.node(subject)?,
            None => unreachable!("grammar: triples start with a subject"),
        };
        let Some(properties) = inner.next() else {
            unreachable!("grammar: triples have properties");
        };

        let mut predicate = None;
        for part in properties.into_inner() {
            match part.as_rule() {
                Rule::predicate => predicate = Some(self.node(part)?),
                Rule::objects => {
                    let Some(predicate) = &predicate else {
                        unreachable!("grammar: objects follow a predicate");
                    };
                    for object in part.into_inner() {
                        let object = self.node(object)?;
                        self.triples.push(Term::symbol(
                            RdfOp::Triple,
                            vec![subject.clone(), predicate.clone(), object],
                        ));
                    }
                }
                rule => unreachable!("grammar: unexpected {rule:?} in properties"),
            }
        }
        Ok(())
    }

    fn node(&self, pair: Pair<'_>) -> Result<Term, ParseError> {
        match pair.as_rule() {
            Rule::subject | Rule::predicate | Rule::object | Rule::iri => {
                match pair.into_inner().next() {
                    Some(inner) => self.node(inner),
                    None => unreachable!("grammar: node wrappers have one child"),
                }
            }
            Rule::a_kw => Ok(Term::text(RdfOp::Iri, RDF_TYPE)),
            Rule::iri_ref => Ok(Term::text(RdfOp::Iri, unbracket(pair.as_str()))),
            Rule::pname_ln => Ok(Term::text(RdfOp::Iri, self.expand(pair.as_str())?)),
            Rule::blank => Ok(Term::text(RdfOp::Blank, pair.as_str().trim_start_matches("_:"))),
            Rule::literal => {
                let mut inner = pair.into_inner();
                let lexical = inner.next().map(|p| unescape(p.as_str())).unwrap_or_default();
                let suffix = match inner.next() {
                    Some(tag) if tag.as_rule() == Rule::language => {
                        tag.as_str().to_ascii_lowercase()
                    }
                    Some(datatype) => {
                        let iri = match datatype.into_inner().next() {
                            Some(iri) => self.node(iri)?,
                            None => unreachable!("grammar: datatype has an iri"),
                        };
                        let iri = iri.leaf_text().unwrap_or_default();
                        if iri == XSD_STRING {
                            String::new()
                        } else {
                            format!("^^<{iri}>")
                        }
                    }
                    None => String::new(),
                };
                Ok(Term::symbol(
                    RdfOp::Literal,
                    vec![
                        Term::Literal(lexical.as_str().into()),
                        Term::Literal(suffix.as_str().into()),
                    ],
                ))
            }
            rule => unreachable!("grammar: unexpected {rule:?} as a node"),
        }
    }

    fn expand(&self, name: &str) -> Result<String, ParseError> {
        let (prefix, local) = name.split_once(':').unwrap_or((name, ""));
        match self.prefixes.get(prefix) {
            Some(namespace) => Ok(format!("{namespace}{local}")),
            None => Err(ParseError::UnknownPrefix {
                prefix: prefix.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ParseError;
    use crate::language::{Domain, Term};

    use super::parse;

    fn pattern(text: &str) -> Term {
        Domain::Rdf.parse_pattern(text).unwrap()
    }

    #[test]
    fn n_triples() {
        let source = "<http://e/s> <http://e/p> \"v\"@EN .\n_:b0 <http://e/p> <http://e/o> .";
        let term = parse(source).unwrap();
        assert_eq!(
            term,
            pattern(
                r#"(graph (merge
                    (triple (iri "http://e/s") (iri "http://e/p") (literal "v" "@en"))
                    (triple (blank "b0") (iri "http://e/p") (iri "http://e/o"))))"#
            )
        );
    }

    #[test]
    fn turtle_shorthands() {
        let source = "@prefix ex: <http://e/> .\nex:s a ex:C ; ex:p ex:o1 , ex:o2 .";
        let term = parse(source).unwrap();
        assert_eq!(term.children()[0].chain_elements(super::RdfOp::Merge).len(), 3);
        assert!(term.to_string().contains("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"));
        assert!(term.to_string().contains(r#"(iri "http://e/o2")"#));
    }

    #[test]
    fn xsd_string_is_a_plain_literal() {
        let typed = parse(
            "<http://e/s> <http://e/p> \"v\"^^<http://www.w3.org/2001/XMLSchema#string> .",
        )
        .unwrap();
        let plain = parse("<http://e/s> <http://e/p> \"v\" .").unwrap();
        assert_eq!(typed, plain);
    }

    #[test]
    fn errors() {
        assert_eq!(
            parse("ex:s <http://e/p> <http://e/o> ."),
            Err(ParseError::UnknownPrefix { prefix: "ex".into() })
        );
        assert_eq!(
            parse("@prefix ex: <http://e/> .\n# nothing else"),
            Err(ParseError::Empty { domain: Domain::Rdf })
        );
        assert!(matches!(parse("<http://e/s> <http://e/p> ."), Err(ParseError::Syntax { .. })));
        let literal_subject = parse("\"lit\" <http://e/p> <http://e/o> .");
        assert!(matches!(literal_subject, Err(ParseError::Syntax { .. })));
    }
}
