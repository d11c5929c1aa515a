use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// One dot-separated prerelease identifier.
///
/// Numeric identifiers sort before alphanumeric ones and compare by value.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Identifier {
    Numeric(u64),
    AlphaNumeric(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(value) => write!(f, "{value}"),
            Identifier::AlphaNumeric(value) => f.write_str(value),
        }
    }
}

/// A possibly partial version.
///
/// Missing components stand for wildcards: `1.2` has no patch, `*` has
/// nothing at all. Prerelease identifiers are only allowed on full versions
/// and build metadata is discarded on parse.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Version {
    pub major: Option<u64>,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    pub pre: Vec<Identifier>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major: Some(major),
            minor: Some(minor),
            patch: Some(patch),
            pre: Vec::new(),
        }
    }

    pub fn wildcard() -> Self {
        Self {
            major: None,
            minor: None,
            patch: None,
            pre: Vec::new(),
        }
    }

    /// `major.minor.patch-0`, the smallest version with that core.
    pub fn floor_of(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            pre: vec![Identifier::Numeric(0)],
            ..Self::new(major, minor, patch)
        }
    }

    pub fn with_pre(mut self, pre: Vec<Identifier>) -> Self {
        self.pre = pre;
        self
    }

    pub fn is_full(&self) -> bool {
        self.major.is_some() && self.minor.is_some() && self.patch.is_some()
    }

    pub fn is_wildcard(&self) -> bool {
        self.major.is_none()
    }

    /// Core triple with wildcards read as zero.
    pub fn core(&self) -> (u64, u64, u64) {
        (
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
        )
    }

    /// Lowest full version matched by this (possibly partial) version.
    pub fn lower(&self) -> Version {
        let (major, minor, patch) = self.core();
        Version::new(major, minor, patch).with_pre(self.pre.clone())
    }

    /// Exclusive upper bound of the versions matched by a partial version.
    ///
    /// Returns `None` for `*` (unbounded) and for full versions, which have
    /// no range of their own.
    pub fn upper(&self) -> Option<Version> {
        match (self.major, self.minor, self.patch) {
            (Some(major), None, _) => Some(Version::floor_of(major.checked_add(1)?, 0, 0)),
            (Some(major), Some(minor), None) => {
                Some(Version::floor_of(major, minor.checked_add(1)?, 0))
            }
            _ => None,
        }
    }

    /// Strips the prerelease tag.
    pub fn release(&self) -> Version {
        Version {
            pre: Vec::new(),
            ..self.clone()
        }
    }

    pub fn parse(text: &str) -> Result<Version, ParseError> {
        let invalid = |reason: &str| ParseError::InvalidVersion {
            text: text.to_owned(),
            reason: reason.to_owned(),
        };

        let trimmed = text.strip_prefix(['v', 'V']).unwrap_or(text);
        let (without_build, build) = match trimmed.split_once('+') {
            Some((rest, build)) => (rest, Some(build)),
            None => (trimmed, None),
        };
        if let Some(build) = build {
            if build.split('.').any(|part| !valid_identifier(part)) {
                return Err(invalid("malformed build metadata"));
            }
        }

        let (core, pre) = match without_build.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (without_build, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid("expected one to three numeric components"));
        }

        let mut numbers = [None; 3];
        let mut seen_wildcard = false;
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if matches!(*part, "x" | "X" | "*") {
                seen_wildcard = true;
                continue;
            }
            if seen_wildcard {
                return Err(invalid("numeric component after a wildcard"));
            }
            *slot = Some(parse_numeric(part).ok_or_else(|| invalid("malformed component"))?);
        }

        let mut version = Version {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            pre: Vec::new(),
        };

        if let Some(pre) = pre {
            if !version.is_full() {
                return Err(invalid("prerelease on a partial version"));
            }
            version.pre = pre
                .split('.')
                .map(|part| {
                    if !valid_identifier(part) {
                        return Err(invalid("malformed prerelease identifier"));
                    }
                    if part.bytes().all(|b| b.is_ascii_digit()) {
                        parse_numeric(part)
                            .map(Identifier::Numeric)
                            .ok_or_else(|| invalid("numeric identifier with leading zero"))
                    } else {
                        Ok(Identifier::AlphaNumeric(part.to_owned()))
                    }
                })
                .collect::<Result<_, _>>()?;
        }

        Ok(version)
    }
}

fn valid_identifier(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

fn parse_numeric(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if part.len() > 1 && part.starts_with('0') {
        return None;
    }
    part.parse().ok()
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Semantic version precedence.
///
/// A version without prerelease outranks the same core with one; partial
/// versions sort before full ones of the same prefix.
impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(major) = self.major else {
            return f.write_str("*");
        };
        write!(f, "{major}")?;
        if let Some(minor) = self.minor {
            write!(f, ".{minor}")?;
            if let Some(patch) = self.patch {
                write!(f, ".{patch}")?;
            }
        }
        if !self.pre.is_empty() {
            f.write_str("-")?;
            for (index, identifier) in self.pre.iter().enumerate() {
                if index > 0 {
                    f.write_str(".")?;
                }
                write!(f, "{identifier}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Identifier, Version};

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    #[test]
    fn parses_full_and_partial() {
        assert_eq!(v("1.2.3"), Version::new(1, 2, 3));
        assert_eq!(v("1.2").patch, None);
        assert_eq!(v("1.x").minor, None);
        assert!(v("*").is_wildcard());
        assert_eq!(v("1.0.0-alpha.1").pre, vec![
            Identifier::AlphaNumeric("alpha".into()),
            Identifier::Numeric(1)
        ]);
    }

    #[test]
    fn build_metadata_is_dropped() {
        assert_eq!(v("1.0.0+build.5"), v("1.0.0"));
    }

    #[test]
    fn rejects_malformed() {
        for text in ["", "1.2.3.4", "01.2.3", "1..2", "1.2-beta", "a.b.c", "1.x.3", "1.0.0-"] {
            assert!(Version::parse(text).is_err(), "{text} should be rejected");
        }
    }

    #[test]
    fn prerelease_precedence() {
        let ordered = [
            "1.0.0-0",
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
            "1.0.1",
        ];
        for pair in ordered.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn partial_bounds() {
        assert_eq!(v("1.2").lower(), v("1.2.0"));
        assert_eq!(v("1.2").upper(), Some(v("1.3.0-0")));
        assert_eq!(v("1").upper(), Some(v("2.0.0-0")));
        assert_eq!(v("*").upper(), None);
        assert_eq!(v("1.2.3").upper(), None);
    }

    #[test]
    fn display_round_trips() {
        for text in ["1.2.3", "1.2", "1", "*", "1.0.0-rc.1"] {
            assert_eq!(v(text).to_string(), text);
        }
    }
}
