//! Totally ordered floating point literals.
//!
//! `f64` has neither `Eq` nor `Ord`, yet numeric literals must take part in
//! the canonical term order. [`CanonicalFloat`] normalizes the value on
//! construction so the derived comparisons are well defined:
//!
//! - every NaN collapses to a single quiet NaN which sorts after all numbers,
//! - `-0.0` becomes `+0.0`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Copy)]
pub struct CanonicalFloat(f64);

impl CanonicalFloat {
    pub const ZERO: Self = Self(0.0);
    pub const ONE: Self = Self(1.0);

    fn canonicalize(value: f64) -> f64 {
        if value.is_nan() {
            f64::NAN
        } else if value == 0.0 {
            0.0
        } else {
            value
        }
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl From<f64> for CanonicalFloat {
    fn from(value: f64) -> Self {
        Self(Self::canonicalize(value))
    }
}

impl PartialEq for CanonicalFloat {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CanonicalFloat {}

impl Hash for CanonicalFloat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            state.write_u64(f64::NAN.to_bits());
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

impl PartialOrd for CanonicalFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CanonicalFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.is_nan(), other.0.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal),
        }
    }
}

impl fmt::Debug for CanonicalFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for CanonicalFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for CanonicalFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for CanonicalFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::CanonicalFloat;

    #[test]
    fn negative_zero_is_zero() {
        assert_eq!(CanonicalFloat::from(-0.0), CanonicalFloat::from(0.0));
        assert!(!CanonicalFloat::from(-0.0).get().is_sign_negative());
    }

    #[test]
    fn nan_equals_itself_and_sorts_last() {
        let nan = CanonicalFloat::from(f64::NAN);
        assert_eq!(nan, CanonicalFloat::from(-f64::NAN));
        assert!(CanonicalFloat::from(f64::INFINITY) < nan);
    }

    #[test]
    fn numeric_order() {
        let mut values: Vec<_> = [3.0, -1.5, 0.25].into_iter().map(CanonicalFloat::from).collect();
        values.sort();
        assert_eq!(values.iter().map(|v| v.get()).collect::<Vec<_>>(), vec![-1.5, 0.25, 3.0]);
    }

    #[test]
    fn display_is_shortest_round_trip() {
        assert_eq!(CanonicalFloat::from(3.0).to_string(), "3");
        assert_eq!(CanonicalFloat::from(0.1 + 0.2).to_string().parse::<f64>().unwrap(), 0.1 + 0.2);
    }
}
