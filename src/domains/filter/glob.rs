//! Path globs: `*` and `?` inside a segment, `[...]` classes, and `**` as a
//! whole segment matching any number of segments.

use std::iter::Peekable;
use std::str::Chars;

use itertools::Itertools;

use crate::error::ParseError;

/// The glob matching every path.
pub const EVERYTHING: &str = "**";

const SAMPLE_LIMIT: usize = 64;
const STAR_FILLERS: [&str; 3] = ["", "a", "zz"];

#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    Char(char),
    Star,
    Any,
    Class { negated: bool, ranges: Vec<(char, char)> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    AnyDepth,
    Parts(Vec<Part>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Glob {
    segments: Vec<Segment>,
}

pub fn is_glob(token: &str) -> bool {
    token.contains(['*', '?', '['])
}

fn invalid(pattern: &str, reason: &str) -> ParseError {
    ParseError::InvalidGlob {
        pattern: pattern.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Rejects paths with empty segments, which neither literals nor globs may have.
pub fn check_segments(pattern: &str) -> Result<(), ParseError> {
    if pattern.split('/').any(str::is_empty) {
        return Err(invalid(pattern, "empty path segment"));
    }
    Ok(())
}

fn parse_class(pattern: &str, chars: &mut Peekable<Chars<'_>>) -> Result<Part, ParseError> {
    let negated = chars.next_if(|c| matches!(c, '!' | '^')).is_some();
    let mut ranges = Vec::new();
    loop {
        match chars.next() {
            None => return Err(invalid(pattern, "unclosed character class")),
            Some(']') if ranges.is_empty() => return Err(invalid(pattern, "empty character class")),
            Some(']') => return Ok(Part::Class { negated, ranges }),
            Some(start) => {
                let mut lookahead = chars.clone();
                match (lookahead.next(), lookahead.next()) {
                    (Some('-'), Some(end)) if end != ']' => {
                        chars.next();
                        chars.next();
                        if end < start {
                            return Err(invalid(pattern, "reversed character range"));
                        }
                        ranges.push((start, end));
                    }
                    _ => ranges.push((start, start)),
                }
            }
        }
    }
}

fn parse_segment(pattern: &str, segment: &str) -> Result<Segment, ParseError> {
    if segment == EVERYTHING {
        return Ok(Segment::AnyDepth);
    }
    if segment.contains("***") {
        return Err(invalid(pattern, "`***` is not a wildcard"));
    }
    if segment.contains("**") {
        return Err(invalid(pattern, "`**` must be a whole path segment"));
    }

    let mut parts = Vec::new();
    let mut chars = segment.chars().peekable();
    while let Some(c) = chars.next() {
        parts.push(match c {
            '*' => Part::Star,
            '?' => Part::Any,
            '[' => parse_class(pattern, &mut chars)?,
            c => Part::Char(c),
        });
    }
    Ok(Segment::Parts(parts))
}

fn class_contains(negated: bool, ranges: &[(char, char)], c: char) -> bool {
    ranges.iter().any(|(start, end)| (*start..=*end).contains(&c)) != negated
}

fn match_parts(parts: &[Part], text: &[char]) -> bool {
    match parts.split_first() {
        None => text.is_empty(),
        Some((Part::Star, rest)) => (0..=text.len()).any(|skip| match_parts(rest, &text[skip..])),
        Some((part, rest)) => {
            let Some((&c, tail)) = text.split_first() else {
                return false;
            };
            let accepted = match part {
                Part::Char(expected) => c == *expected,
                Part::Any => true,
                Part::Class { negated, ranges } => class_contains(*negated, ranges, c),
                Part::Star => unreachable!("handled above"),
            };
            accepted && match_parts(rest, tail)
        }
    }
}

fn match_segments(segments: &[Segment], path: &[&str]) -> bool {
    match segments.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            (0..=path.len()).any(|skip| match_segments(rest, &path[skip..]))
        }
        Some((Segment::Parts(parts), rest)) => match path.split_first() {
            Some((head, tail)) => {
                let chars: Vec<char> = head.chars().collect();
                match_parts(parts, &chars) && match_segments(rest, tail)
            }
            None => false,
        },
    }
}

/// A character the class accepts.
fn representative(negated: bool, ranges: &[(char, char)]) -> char {
    if !negated {
        return ranges.first().map_or('a', |(start, _)| *start);
    }
    ['a', 'b', 'x', '0', '_']
        .into_iter()
        .find(|c| class_contains(negated, ranges, *c))
        .unwrap_or('a')
}

impl Glob {
    pub fn compile(pattern: &str) -> Result<Self, ParseError> {
        check_segments(pattern)?;
        let segments = pattern
            .split('/')
            .map(|segment| parse_segment(pattern, segment))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    pub fn matches(&self, path: &str) -> bool {
        let path: Vec<&str> = path.split('/').collect();
        match_segments(&self.segments, &path)
    }

    /// Paths the glob matches, one per choice of wildcard filler.
    pub fn samples(&self) -> Vec<String> {
        let options: Vec<Vec<Vec<String>>> = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::AnyDepth => vec![
                    vec![],
                    vec!["x".to_owned()],
                    vec!["x".to_owned(), "y".to_owned()],
                ],
                Segment::Parts(parts) => STAR_FILLERS
                    .iter()
                    .map(|filler| {
                        let text: String = parts
                            .iter()
                            .map(|part| match part {
                                Part::Char(c) => c.to_string(),
                                Part::Star => (*filler).to_owned(),
                                Part::Any => "a".to_owned(),
                                Part::Class { negated, ranges } => {
                                    representative(*negated, ranges).to_string()
                                }
                            })
                            .collect();
                        vec![text]
                    })
                    .filter(|segment| segment.iter().all(|text| !text.is_empty()))
                    .unique()
                    .collect(),
            })
            .collect();

        options
            .into_iter()
            .multi_cartesian_product()
            .map(|choice| choice.concat().join("/"))
            .filter(|path| !path.is_empty())
            .unique()
            .take(SAMPLE_LIMIT)
            .collect()
    }
}

/// Collapses adjacent `**` segments, `None` if there are none.
pub fn collapse(pattern: &str) -> Option<String> {
    let segments: Vec<&str> = pattern.split('/').collect();
    let collapsed: Vec<&str> = segments
        .iter()
        .copied()
        .dedup_by(|left, right| *left == EVERYTHING && *right == EVERYTHING)
        .collect();
    (collapsed.len() < segments.len()).then(|| collapsed.join("/"))
}

#[cfg(test)]
mod tests {
    use crate::error::ParseError;

    use super::{Glob, collapse};

    fn glob(pattern: &str) -> Glob {
        Glob::compile(pattern).unwrap()
    }

    #[test]
    fn wildcards_stay_inside_segments() {
        assert!(glob("*.rs").matches("main.rs"));
        assert!(!glob("*.rs").matches("src/main.rs"));
        assert!(glob("src/?.rs").matches("src/a.rs"));
        assert!(!glob("src/?.rs").matches("src/ab.rs"));
    }

    #[test]
    fn double_star_spans_segments() {
        let any_rust = glob("**/*.rs");
        assert!(any_rust.matches("main.rs"));
        assert!(any_rust.matches("src/bin/main.rs"));
        assert!(!any_rust.matches("src/main.c"));
        assert!(glob("**").matches("a/b/c"));
        assert!(glob("src/**").matches("src"));
    }

    #[test]
    fn character_classes() {
        assert!(glob("[a-c]x").matches("bx"));
        assert!(!glob("[a-c]x").matches("dx"));
        assert!(glob("[!a-c]x").matches("dx"));
        assert!(glob("[^ab]").matches("z"));
    }

    #[test]
    fn invalid_globs() {
        for pattern in ["a//b", "/a", "a/", "***", "a**", "**b/c", "[ab", "[]", "[z-a]"] {
            assert!(
                matches!(Glob::compile(pattern), Err(ParseError::InvalidGlob { .. })),
                "`{pattern}` should be rejected"
            );
        }
    }

    #[test]
    fn samples_are_matched() {
        for pattern in ["**/*.rs", "src/[!x]?", "a/**/b*"] {
            let compiled = glob(pattern);
            let samples = compiled.samples();
            assert!(!samples.is_empty(), "{pattern}");
            assert!(samples.iter().all(|path| compiled.matches(path)), "{pattern}: {samples:?}");
        }
    }

    #[test]
    fn collapses_repeated_double_stars() {
        assert_eq!(collapse("**/**/*.rs").as_deref(), Some("**/*.rs"));
        assert_eq!(collapse("a/**/**/**"), Some("a/**".to_owned()));
        assert_eq!(collapse("**/a/**"), None);
    }
}
