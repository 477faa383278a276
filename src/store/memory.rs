//! In-process variable store.

use std::collections::HashMap;

use super::{VarValue, VariableStore};

/// Variable store kept in memory, for hosts that hand variables over directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    vars: HashMap<String, VarValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Remove a variable.
    pub fn remove(&mut self, key: &str) -> Option<VarValue> {
        self.vars.remove(key)
    }

    /// List all keys.
    pub fn keys(&self) -> Vec<&str> {
        self.vars.keys().map(|s| s.as_str()).collect()
    }
}

impl VariableStore for MemoryStore {
    fn get(&self, key: &str) -> Option<VarValue> {
        self.vars.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: VarValue) {
        self.vars.insert(key.to_string(), value);
    }
}

impl FromIterator<(String, VarValue)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (String, VarValue)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}
