//! Attribute values.
//!
//! The tile format stores attribute values in a closed set of variants. We
//! only produce three of them: strings, numbers and booleans. Equality and
//! ordering are structural: the variant is compared first
//! (string < number < boolean), then the payload. Numbers compare with
//! [`f64::total_cmp`], so the order is total and `Eq`/`Hash` are sound.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::vector_tile::tile::Value;
use crate::Error;

/// A feature attribute value.
#[derive(Debug, Clone)]
pub enum AttributeValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl AttributeValue {
    /// Position of the variant in the value ordering.
    fn rank(&self) -> u8 {
        match self {
            AttributeValue::String(_) => 0,
            AttributeValue::Number(_) => 1,
            AttributeValue::Bool(_) => 2,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert to the tile wire value. Numbers are written as doubles.
    pub fn to_mvt_value(&self) -> Value {
        match self {
            AttributeValue::String(s) => Value {
                string_value: Some(s.clone()),
                ..Default::default()
            },
            AttributeValue::Number(n) => Value {
                double_value: Some(*n),
                ..Default::default()
            },
            AttributeValue::Bool(b) => Value {
                bool_value: Some(*b),
                ..Default::default()
            },
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AttributeValue {}

impl PartialOrd for AttributeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AttributeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (AttributeValue::String(a), AttributeValue::String(b)) => a.cmp(b),
            (AttributeValue::Number(a), AttributeValue::Number(b)) => a.total_cmp(b),
            (AttributeValue::Bool(a), AttributeValue::Bool(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for AttributeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.rank());
        match self {
            AttributeValue::String(s) => s.hash(state),
            // total_cmp equality is bitwise equality
            AttributeValue::Number(n) => n.to_bits().hash(state),
            AttributeValue::Bool(b) => b.hash(state),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        AttributeValue::Number(n)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl TryFrom<&Value> for AttributeValue {
    type Error = Error;

    /// Read a wire value back. Integer variants are never written by this
    /// crate and are rejected.
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        if let Some(s) = &value.string_value {
            Ok(AttributeValue::String(s.clone()))
        } else if let Some(d) = value.double_value {
            Ok(AttributeValue::Number(d))
        } else if let Some(f) = value.float_value {
            Ok(AttributeValue::Number(f as f64))
        } else if let Some(b) = value.bool_value {
            Ok(AttributeValue::Bool(b))
        } else {
            Err(Error::UnsupportedValue(format!("{:?}", value)))
        }
    }
}
