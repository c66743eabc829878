//! Learner inventory - resource stacks with per-resource caps

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    items: BTreeMap<String, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current amount of a resource
    pub fn get(&self, resource: &str) -> u32 {
        self.items.get(resource).copied().unwrap_or(0)
    }

    /// Add up to `cap` total, returns amount actually added
    pub fn add(&mut self, resource: &str, amount: u32, cap: u32) -> u32 {
        let current = self.get(resource);
        let added = amount.min(cap.saturating_sub(current));
        if added > 0 {
            self.items.insert(resource.to_string(), current + added);
        }
        added
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
