use std::cmp::Ordering;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{BbType, BbValue, BlackboardError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Comparison {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl Comparison {
    /// Whether the comparison needs an ordering (only defined for numeric values).
    pub fn is_ordering(self) -> bool {
        !matches!(self, Comparison::Equal | Comparison::NotEqual)
    }

    /// Interpret an ordering. `None` means "unordered" (NaN involved).
    pub fn holds(self, ordering: Option<Ordering>) -> bool {
        match self {
            Comparison::Equal => ordering == Some(Ordering::Equal),
            Comparison::NotEqual => ordering != Some(Ordering::Equal),
            Comparison::GreaterThan => ordering == Some(Ordering::Greater),
            Comparison::GreaterThanOrEqual => {
                matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
            }
            Comparison::LessThan => ordering == Some(Ordering::Less),
            Comparison::LessThanOrEqual => {
                matches!(ordering, Some(Ordering::Less | Ordering::Equal))
            }
        }
    }
}

/// Compare `lhs` against `rhs`.
///
/// Floats use exact IEEE-754 ordering; no epsilon is applied. Returns `None` when the two values
/// cannot be compared with `comparison`.
pub fn compare(comparison: Comparison, lhs: &BbValue, rhs: &BbValue) -> Option<bool> {
    match (lhs, rhs) {
        (BbValue::Int(a), BbValue::Int(b)) => Some(comparison.holds(Some(a.cmp(b)))),
        (a, b) if a.ty().is_numeric() && b.ty().is_numeric() => {
            let (a, b) = (a.as_f64()?, b.as_f64()?);
            Some(comparison.holds(a.partial_cmp(&b)))
        }
        _ if comparison.is_ordering() => None,
        (a, b) if a.ty() == b.ty() => {
            let equal = a == b;
            Some(if comparison == Comparison::Equal {
                equal
            } else {
                !equal
            })
        }
        _ => None,
    }
}

/// A single blackboard comparison: `<property key> <comparison> <literal>`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Condition {
    pub key: String,
    pub comparison: Comparison,
    pub value: BbValue,
}

impl Condition {
    pub fn new(key: impl Into<String>, comparison: Comparison, value: BbValue) -> Self {
        Self {
            key: key.into(),
            comparison,
            value,
        }
    }

    pub fn equal(key: impl Into<String>, value: BbValue) -> Self {
        Self::new(key, Comparison::Equal, value)
    }

    /// Check at bind time that a property of type `found` can be compared with this literal.
    pub fn check_types(&self, found: BbType) -> Result<(), BlackboardError> {
        let literal = self.value.ty();
        let numeric = found.is_numeric() && literal.is_numeric();
        let supported = if numeric {
            true
        } else {
            found == literal && !self.comparison.is_ordering()
        };
        if supported {
            Ok(())
        } else {
            Err(BlackboardError::UnsupportedComparison {
                key: self.key.clone(),
                comparison: self.comparison,
                found,
                literal,
            })
        }
    }

    /// Evaluate against the property's current value. Incomparable values never hold.
    pub fn evaluate(&self, current: &BbValue) -> bool {
        compare(self.comparison, current, &self.value).unwrap_or(false)
    }
}
