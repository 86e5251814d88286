//! dynamically-typed property values carried by project change records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// a single table property value as found in a project change. numeric
/// variants participate in `change` (additive) edits; all variants can be
/// `set` or compared against an asserted `existing` value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    IntList(Vec<i64>),
}

impl PropertyValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            PropertyValue::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(v) => Some(*v as f64),
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, PropertyValue::Int(_) | PropertyValue::Float(_))
    }

    /// add a numeric delta to a numeric value. the result keeps the variant of
    /// self where possible.
    pub fn checked_add(&self, delta: &PropertyValue) -> Option<PropertyValue> {
        match (self, delta) {
            (PropertyValue::Int(a), PropertyValue::Int(b)) => Some(PropertyValue::Int(a + b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                Some(PropertyValue::Float(a.as_f64()? + b.as_f64()?))
            }
            _ => None,
        }
    }

    /// loose equality used when asserting `existing` values: numeric variants
    /// compare by value regardless of representation.
    pub fn matches(&self, other: &PropertyValue) -> bool {
        if self.is_numeric() && other.is_numeric() {
            return self.as_f64() == other.as_f64();
        }
        self == other
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Str(v) => write!(f, "{v}"),
            PropertyValue::IntList(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.to_string())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_untagged_deserialization() {
        assert_eq!(
            serde_json::from_str::<PropertyValue>("3").unwrap(),
            PropertyValue::Int(3)
        );
        assert_eq!(
            serde_json::from_str::<PropertyValue>("2.5").unwrap(),
            PropertyValue::Float(2.5)
        );
        assert_eq!(
            serde_json::from_str::<PropertyValue>("true").unwrap(),
            PropertyValue::Bool(true)
        );
        assert_eq!(
            serde_json::from_str::<PropertyValue>("\"all\"").unwrap(),
            PropertyValue::Str("all".to_string())
        );
        assert_eq!(
            serde_json::from_str::<PropertyValue>("[1, 2]").unwrap(),
            PropertyValue::IntList(vec![1, 2])
        );
    }

    #[test]
    fn test_numeric_add_and_match() {
        let lanes = PropertyValue::Int(3);
        assert_eq!(
            lanes.checked_add(&PropertyValue::Int(-1)),
            Some(PropertyValue::Int(2))
        );
        assert_eq!(
            PropertyValue::Float(1.5).checked_add(&PropertyValue::Int(1)),
            Some(PropertyValue::Float(2.5))
        );
        assert!(lanes.checked_add(&PropertyValue::Str("x".into())).is_none());
        assert!(PropertyValue::Int(2).matches(&PropertyValue::Float(2.0)));
        assert!(!PropertyValue::Str("a".into()).matches(&PropertyValue::Str("b".into())));
    }
}
