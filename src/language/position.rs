use std::fmt;

use serde::{Deserialize, Serialize};

/// Path from the root of a term to one of its subterms.
///
/// Each entry is a child index; the empty path is the root.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(Vec<usize>);

impl Position {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Returns the path one level below this one
    pub fn child(&self, index: usize) -> Self {
        let mut indices = Vec::with_capacity(self.0.len() + 1);
        indices.extend_from_slice(&self.0);
        indices.push(index);
        Self(indices)
    }

    /// Returns `true` if `self` lies on the path to `other` (or equals it).
    pub fn is_prefix_of(&self, other: &Position) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Adds a new position at the end of the path
    pub fn push(&mut self, index: usize) {
        self.0.push(index)
    }

    /// Removes the last position from the path
    pub fn pop(&mut self) -> Option<usize> {
        self.0.pop()
    }
}

impl From<Vec<usize>> for Position {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("ε");
        }
        for (index, step) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}
