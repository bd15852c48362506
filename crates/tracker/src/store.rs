//! Persisted client-id storage: the cookie jar abstraction.
//!
//! The tracker never touches cookies directly; the host application hands in
//! an [`IdentityStore`] that reads and writes the `_ga`-style token.

use dashmap::DashMap;

/// Key/value capability backing the persisted client identifier.
///
/// Resolution is read-then-write. Two first hits racing on a store without an
/// atomic [`set_if_absent`](IdentityStore::set_if_absent) can each generate
/// and write their own identifier; the last writer wins.
pub trait IdentityStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String);

    /// Write `value` only if `key` holds nothing; return whatever the key
    /// holds afterwards.
    fn set_if_absent(&self, key: &str, value: String) -> String {
        match self.get(key) {
            Some(existing) => existing,
            None => {
                self.set(key, value.clone());
                value
            }
        }
    }
}

/// Thread-safe in-process store. `set_if_absent` is atomic per key.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    values: DashMap<String, String>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a previously persisted value.
    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.remove(key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }

    fn set_if_absent(&self, key: &str, value: String) -> String {
        self.values
            .entry(key.to_string())
            .or_insert(value)
            .value()
            .clone()
    }
}

/// Store that never remembers anything. Every resolution generates afresh.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIdentityStore;

impl IdentityStore for NullIdentityStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: String) {}

    fn set_if_absent(&self, _key: &str, value: String) -> String {
        value
    }
}
