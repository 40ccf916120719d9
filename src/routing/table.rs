//! Route table module
//!
//! Maps normalized patterns to handlers. Iteration follows first registration
//! order; re-registering a key replaces the handler in place.

use std::collections::HashMap;

use super::pattern::RoutePattern;

/// A registered pattern and its handler
#[derive(Debug, Clone)]
pub struct RouteEntry<H> {
    pub pattern: RoutePattern,
    pub handler: H,
}

/// Insertion-ordered route table with unique keys
#[derive(Debug, Clone)]
pub struct RouteTable<H> {
    entries: Vec<RouteEntry<H>>,
    index: HashMap<String, usize>,
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under the normalized form of `raw_path`.
    ///
    /// Returns `true` if an existing handler was replaced.
    pub fn insert(&mut self, raw_path: &str, handler: H) -> bool {
        let pattern = RoutePattern::parse(raw_path);

        if let Some(&slot) = self.index.get(pattern.key()) {
            self.entries[slot].handler = handler;
            return true;
        }

        self.index.insert(pattern.key().to_string(), self.entries.len());
        self.entries.push(RouteEntry { pattern, handler });
        false
    }

    pub fn get(&self, key: &str) -> Option<&H> {
        self.index.get(key).map(|&slot| &self.entries[slot].handler)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry<H>> {
        self.entries.iter()
    }

    /// Normalized keys in scan order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.pattern.key())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
