//! A free-form JSON-like value tree used as Array, Dataset, and Tensor
//! metadata throughout the crate.

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A recursive, free-form metadata value.
///
/// `Object` uses a `BTreeMap` rather than an insertion-ordered map: nothing
/// in this crate depends on key order, and a handful of TensorDM helpers
/// (`index_datapaths`, scope-cache keys) benefit from deterministic
/// iteration order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Metadata {
    /// Absence of a value.
    #[default]
    Null,
    /// A boolean value.
    Bool(bool),
    /// A signed integer value.
    Int(i64),
    /// A floating-point value.
    Float(f64),
    /// A UTF-8 string value.
    String(String),
    /// An ordered sequence of values.
    Array(Vec<Metadata>),
    /// A name-to-value map.
    Object(BTreeMap<String, Metadata>),
}

impl Metadata {
    /// An empty object, the usual starting point for building metadata.
    pub fn object() -> Self {
        Metadata::Object(BTreeMap::new())
    }

    /// Returns this value as a string slice, if it is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Metadata::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns this value as an i64, if it is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Metadata::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns this value as an f64, if it is a `Float` or `Int`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Metadata::Float(f) => Some(*f),
            Metadata::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns this value as an object map, if it is an `Object`.
    pub fn as_object(&self) -> Option<&BTreeMap<String, Metadata>> {
        match self {
            Metadata::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Returns this value as an array slice, if it is an `Array`.
    pub fn as_array(&self) -> Option<&[Metadata]> {
        match self {
            Metadata::Array(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Looks up `key` in this value, if it is an `Object`.
    pub fn get(&self, key: &str) -> Option<&Metadata> {
        self.as_object().and_then(|m| m.get(key))
    }

    /// Inserts `key` -> `value` into this value, turning it into an
    /// `Object` first if it is currently `Null`.
    ///
    /// Panics if this value is neither `Null` nor already an `Object`;
    /// callers that need that distinction should match on the variant
    /// directly.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Metadata>) -> &mut Self {
        if matches!(self, Metadata::Null) {
            *self = Metadata::object();
        }
        match self {
            Metadata::Object(m) => {
                m.insert(key.into(), value.into());
            }
            _ => panic!("Metadata::insert called on a non-object, non-null value"),
        }
        self
    }

    /// True if this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Metadata::Null)
    }
}

impl From<&str> for Metadata {
    fn from(s: &str) -> Self {
        Metadata::String(s.to_owned())
    }
}

impl From<String> for Metadata {
    fn from(s: String) -> Self {
        Metadata::String(s)
    }
}

impl From<i64> for Metadata {
    fn from(i: i64) -> Self {
        Metadata::Int(i)
    }
}

impl From<usize> for Metadata {
    fn from(i: usize) -> Self {
        Metadata::Int(i as i64)
    }
}

impl From<f64> for Metadata {
    fn from(f: f64) -> Self {
        Metadata::Float(f)
    }
}

impl From<bool> for Metadata {
    fn from(b: bool) -> Self {
        Metadata::Bool(b)
    }
}

impl<T: Into<Metadata>> From<Vec<T>> for Metadata {
    fn from(v: Vec<T>) -> Self {
        Metadata::Array(v.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metadata::Null => write!(f, "null"),
            Metadata::Bool(b) => write!(f, "{b}"),
            Metadata::Int(i) => write!(f, "{i}"),
            Metadata::Float(x) => write!(f, "{x}"),
            Metadata::String(s) => write!(f, "{s:?}"),
            Metadata::Array(v) => {
                write!(f, "[")?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Metadata::Object(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{k:?}:{v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_promotes_null_to_object() {
        let mut md = Metadata::Null;
        md.insert("ident", "foo").insert("count", 3i64);
        assert_eq!(md.get("ident").and_then(Metadata::as_str), Some("foo"));
        assert_eq!(md.get("count").and_then(Metadata::as_int), Some(3));
    }

    #[test]
    fn equality_is_structural() {
        let mut a = Metadata::object();
        a.insert("x", 1i64);
        let mut b = Metadata::object();
        b.insert("x", 1i64);
        assert_eq!(a, b);
    }
}
