//! Protocol parameter set: the flat key/value namespace every hit is
//! assembled into before it is form-encoded.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of the `v` parameter.
pub const PROTOCOL_VERSION: i64 = 1;

/// Keys fixed at session reset. A merge never overwrites them.
pub const PROTECTED_KEYS: [&str; 3] = ["v", "tid", "cid"];

/// A single protocol value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Str(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

/// Insertion-ordered map of protocol keys to nullable values.
///
/// A `None` value keeps the key present (`contains_key` is true) but it is
/// never encoded and never survives a [`merged_over`](Self::merged_over).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: Vec<(String, Option<ParamValue>)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The base set every hit starts from: `v`, `tid` and `cid`.
    pub fn base(tracking_id: &str, client_id: &str) -> Self {
        let mut params = Self::new();
        params.insert("v", PROTOCOL_VERSION);
        params.insert("tid", tracking_id);
        params.insert("cid", client_id);
        params
    }

    /// Set a key, replacing any previous value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.insert_opt(key, Some(value.into()));
    }

    /// Set a key to a nullable value.
    pub fn insert_opt(&mut self, key: impl Into<String>, value: Option<ParamValue>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        self.entries.remove(idx).1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ParamValue>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Non-null entries rendered to wire strings, in insertion order.
    pub fn wire_pairs(&self) -> impl Iterator<Item = (&str, String)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v.to_string())))
    }

    /// Overlay the non-null entries of `other` onto this set; `other` wins
    /// on every key it carries a value for.
    pub fn overlay(&mut self, other: ParameterSet) {
        for (key, value) in other.entries {
            if value.is_some() {
                self.insert_opt(key, value);
            }
        }
    }

    /// Merge this set over `base`.
    ///
    /// Null entries of `self` are dropped first. Remaining entries win over
    /// `base`, except on [`PROTECTED_KEYS`] already present in `base`.
    pub fn merged_over(self, base: &ParameterSet) -> ParameterSet {
        let mut merged = base.clone();
        for (key, value) in self.entries {
            let Some(value) = value else { continue };
            if is_protected(&key) && base.contains_key(&key) {
                continue;
            }
            merged.insert_opt(key, Some(value));
        }
        merged
    }
}

/// Whether a key belongs to the reset-time base set.
pub fn is_protected(key: &str) -> bool {
    PROTECTED_KEYS.contains(&key)
}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}
