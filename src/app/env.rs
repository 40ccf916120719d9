//! Shared environment module
//!
//! A single key/value store shared by the router and every registered module.
//! Writes are last-write-wins; there is no per-request copy.

use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock};

/// Cloneable handle to the process environment
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: Arc<RwLock<Map<String, Value>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, visible to every holder of this environment
    pub fn expose(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Copy of every exposed value
    pub fn snapshot(&self) -> Map<String, Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
