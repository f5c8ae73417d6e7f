//! In-memory key/record map owned by a store

use std::collections::HashMap;

/// Records keyed by their derived primary key. Iteration order is unspecified.
#[derive(Debug, Clone)]
pub struct Collection<R> {
    items: HashMap<String, R>,
}

impl<R> Default for Collection<R> {
    fn default() -> Self {
        Self { items: HashMap::new() }
    }
}

impl<R> Collection<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, overwriting any record stored under the same key
    pub fn save(&mut self, key: impl Into<String>, item: R) {
        self.items.insert(key.into(), item);
    }

    pub fn find(&self, key: &str) -> Option<&R> {
        self.items.get(key)
    }

    pub fn find_mut(&mut self, key: &str) -> Option<&mut R> {
        self.items.get_mut(key)
    }

    /// Store `item` under `key`, returning the record it replaced
    pub fn replace(&mut self, key: impl Into<String>, item: R) -> Option<R> {
        self.items.insert(key.into(), item)
    }

    pub fn remove(&mut self, key: &str) -> Option<R> {
        self.items.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &R> {
        self.items.values()
    }
}
