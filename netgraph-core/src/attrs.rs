//! Opaque attribute values attached to nodes, links, risk groups, and the network
//! itself (§3 Data Model). Values may be strings, numbers, booleans, arrays, or
//! nested maps; attribute paths use dot notation (e.g. `hardware.vendor`) to reach
//! into nested maps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An insertion-ordered attribute dictionary.
pub type AttrMap = IndexMap<String, AttrValue>;

/// A JSON-safe, dot-path addressable attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    String(String),
    Number(f64),
    Bool(bool),
    Array(Vec<AttrValue>),
    Map(AttrMap),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&AttrMap> {
        match self {
            AttrValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Resolve a dot-path (e.g. `"hardware.vendor"`) against a nested map value.
    pub fn get_path<'a>(&'a self, path: &str) -> Option<&'a AttrValue> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    /// Numeric ordering; `None` if either side is not numeric.
    pub fn partial_cmp_numeric(&self, other: &AttrValue) -> Option<std::cmp::Ordering> {
        self.as_f64()?.partial_cmp(&other.as_f64()?)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::String(s) => write!(f, "{s}"),
            AttrValue::Number(n) => write!(f, "{n}"),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Array(_) | AttrValue::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

/// Resolve a dot-path against a top-level attribute map.
pub fn get_path<'a>(attrs: &'a AttrMap, path: &str) -> Option<&'a AttrValue> {
    let mut parts = path.split('.');
    let head = parts.next()?;
    let mut current = attrs.get(head)?;
    for segment in parts {
        current = current.as_map()?.get(segment)?;
    }
    Some(current)
}
