//! S-expression syntax for terms and rule patterns.
//!
//! `(or (license "MIT") $0)`: operators by name, quoted text literals, bare
//! numbers or versions where the domain accepts them, `$n` for variables.

use crate::domains;
use crate::error::{MAX_NESTING, ParseError};

use super::{Domain, Literal, Op, Term};

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Open,
    Close,
    Text(String),
    Atom(String),
}

fn tokenize(domain: Domain, source: &str) -> Result<Vec<(usize, Token)>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push((offset, Token::Open)),
            ')' => tokens.push((offset, Token::Close)),
            '"' => {
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, 'n')) => text.push('\n'),
                            Some((_, escaped)) => text.push(escaped),
                            None => return Err(syntax(domain, offset, "unterminated string")),
                        },
                        Some((_, c)) => text.push(c),
                        None => return Err(syntax(domain, offset, "unterminated string")),
                    }
                }
                tokens.push((offset, Token::Text(text)));
            }
            c => {
                let mut atom = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_whitespace() || next == '(' || next == ')' || next == '"' {
                        break;
                    }
                    atom.push(next);
                    chars.next();
                }
                tokens.push((offset, Token::Atom(atom)));
            }
        }
    }

    Ok(tokens)
}

fn syntax(domain: Domain, offset: usize, message: &str) -> ParseError {
    ParseError::Syntax {
        domain,
        offset,
        message: message.to_owned(),
    }
}

struct PatternParser {
    domain: Domain,
    tokens: Vec<(usize, Token)>,
    next: usize,
    end: usize,
}

impl PatternParser {
    fn parse_term(&mut self, depth: usize) -> Result<Term, ParseError> {
        if depth > MAX_NESTING {
            return Err(ParseError::TooDeep { limit: MAX_NESTING });
        }

        let Some((offset, token)) = self.tokens.get(self.next).cloned() else {
            return Err(syntax(self.domain, self.end, "unexpected end of input"));
        };
        self.next += 1;

        match token {
            Token::Close => Err(syntax(self.domain, offset, "unexpected `)`")),
            Token::Text(text) => Ok(Term::Literal(Literal::Text(text))),
            Token::Atom(atom) => self.parse_atom(offset, &atom),
            Token::Open => {
                let name = match self.tokens.get(self.next) {
                    Some((_, Token::Atom(name))) => name.clone(),
                    _ => return Err(syntax(self.domain, offset, "expected operator name")),
                };
                self.next += 1;
                let op = Op::from_name(self.domain, &name).ok_or_else(|| {
                    ParseError::UnknownOperator {
                        domain: self.domain,
                        name: name.clone(),
                    }
                })?;

                let mut children = Vec::new();
                loop {
                    match self.tokens.get(self.next) {
                        Some((_, Token::Close)) => {
                            self.next += 1;
                            break;
                        }
                        Some(_) => children.push(self.parse_term(depth + 1)?),
                        None => return Err(syntax(self.domain, offset, "unclosed `(`")),
                    }
                }

                if children.len() != op.arity() {
                    return Err(ParseError::Arity {
                        op: name,
                        expected: op.arity(),
                        found: children.len(),
                    });
                }
                Ok(Term::symbol(op, children))
            }
        }
    }

    fn parse_atom(&self, offset: usize, atom: &str) -> Result<Term, ParseError> {
        if let Some(id) = atom.strip_prefix('$') {
            return id
                .parse()
                .map(Term::Variable)
                .map_err(|_| syntax(self.domain, offset, "malformed variable"));
        }
        domains::parse_atom(self.domain, atom)
            .map(Term::Literal)
            .ok_or_else(|| syntax(self.domain, offset, "unexpected bare token"))
    }
}

impl Domain {
    /// Parses a term in s-expression syntax, variables allowed.
    pub fn parse_pattern(self, source: &str) -> Result<Term, ParseError> {
        let tokens = tokenize(self, source)?;
        if tokens.is_empty() {
            return Err(ParseError::Empty { domain: self });
        }

        let mut parser = PatternParser {
            domain: self,
            tokens,
            next: 0,
            end: source.len(),
        };
        let term = parser.parse_term(0)?;

        match parser.tokens.get(parser.next) {
            None => Ok(term),
            Some((offset, _)) => Err(syntax(self, *offset, "trailing input")),
        }
    }
}
