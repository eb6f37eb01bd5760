//! Principals barred from normal access
//!
//! Entries are added by isolation and removed by administrative revocation.
//! Mutation is crate-private so that the session controller stays the only
//! writer; there is no automatic expiry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionRegistry {
    principals: BTreeSet<String>,
}

impl RestrictionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent insert. Returns `true` if the principal was not yet restricted.
    pub(crate) fn add(&mut self, principal: &str) -> bool {
        self.principals.insert(principal.to_string())
    }

    /// Idempotent remove. Returns `true` if the principal was restricted.
    pub(crate) fn remove(&mut self, principal: &str) -> bool {
        self.principals.remove(principal)
    }

    pub fn contains(&self, principal: &str) -> bool {
        self.principals.contains(principal)
    }

    /// Restricted principals, sorted
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.principals.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut registry = RestrictionRegistry::new();
        assert!(registry.add("demo@ztrust.io"));
        assert!(!registry.add("demo@ztrust.io"));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("demo@ztrust.io"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = RestrictionRegistry::new();
        registry.add("demo@ztrust.io");
        assert!(registry.remove("demo@ztrust.io"));
        assert!(!registry.remove("demo@ztrust.io"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_iter_sorted() {
        let mut registry = RestrictionRegistry::new();
        registry.add("zed@ztrust.io");
        registry.add("amy@ztrust.io");
        let all: Vec<&str> = registry.iter().collect();
        assert_eq!(all, vec!["amy@ztrust.io", "zed@ztrust.io"]);
    }
}
