//! Rule registry: namespace → registered rules.
//!
//! The [`RuleRegistry`] is the explicit stand-in for scanning a namespace for
//! rule definitions. An initialization step registers each rule under a
//! namespace with a declared order; engines later query it through
//! [`RuleSource`]. Backed by a `DashMap` so registration and discovery may
//! happen from any thread.

use std::fmt;

use dashmap::DashMap;

use crate::error::{RegistryError, RegistryResult};
use crate::rule::Rule;
use crate::source::{RuleDescriptor, RuleSource};

/// Thread-safe registry of rules keyed by exact namespace.
pub struct RuleRegistry<T, R = T> {
    namespaces: DashMap<String, Vec<RuleDescriptor<T, R>>>,
}

impl<T, R> RuleRegistry<T, R> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            namespaces: DashMap::new(),
        }
    }

    /// Register a rule under `namespace`. Errors if the name is empty or
    /// already taken within that namespace.
    pub fn register(
        &self,
        namespace: &str,
        name: &str,
        order: i32,
        rule: impl Rule<T, R> + 'static,
    ) -> RegistryResult<()> {
        self.register_descriptor(namespace, RuleDescriptor::new(name, order, rule))
    }

    pub fn register_descriptor(
        &self,
        namespace: &str,
        descriptor: RuleDescriptor<T, R>,
    ) -> RegistryResult<()> {
        let namespace = namespace.trim();
        if descriptor.name().is_empty() {
            return Err(RegistryError::EmptyName {
                namespace: namespace.to_string(),
            });
        }

        let mut rules = self.namespaces.entry(namespace.to_string()).or_default();
        if rules.iter().any(|r| r.name() == descriptor.name()) {
            return Err(RegistryError::DuplicateRule {
                namespace: namespace.to_string(),
                name: descriptor.name().to_string(),
            });
        }

        tracing::debug!(
            namespace,
            rule = descriptor.name(),
            order = descriptor.order(),
            "registered rule"
        );
        rules.push(descriptor);
        Ok(())
    }

    /// All namespaces holding at least one rule, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .namespaces
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Number of rules registered under `namespace`.
    pub fn rule_count(&self, namespace: &str) -> usize {
        self.namespaces
            .get(namespace.trim())
            .map_or(0, |rules| rules.len())
    }

    /// Whether any rule is registered at all.
    pub fn is_empty(&self) -> bool {
        self.namespaces.iter().all(|entry| entry.value().is_empty())
    }
}

impl<T, R> Default for RuleRegistry<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, R> RuleSource<T, R> for RuleRegistry<T, R> {
    /// Registered rules of exactly `namespace`, in registration order. Child
    /// namespaces (`a.b` under `a`) are not included.
    fn discover(&self, namespace: &str) -> Vec<RuleDescriptor<T, R>> {
        self.namespaces
            .get(namespace.trim())
            .map(|rules| rules.value().clone())
            .unwrap_or_default()
    }
}

impl<T, R> fmt::Debug for RuleRegistry<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::FactMap;
    use crate::rule::FnRule;

    fn noop() -> FnRule<String, String> {
        FnRule::new(|_: &mut FactMap<String>| Ok(None))
    }

    #[test]
    fn register_and_discover() {
        let registry = RuleRegistry::new();
        registry.register("billing", "late-fee", 2, noop()).unwrap();
        registry.register("billing", "discount", 1, noop()).unwrap();

        let found = registry.discover("billing");
        assert_eq!(found.len(), 2);
        assert_eq!(registry.rule_count("billing"), 2);
        assert_eq!(registry.namespaces(), ["billing"]);
    }

    #[test]
    fn unknown_namespace_is_empty() {
        let registry: RuleRegistry<String> = RuleRegistry::new();
        assert!(registry.discover("nowhere").is_empty());
        assert!(registry.discover("").is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn parent_namespace_does_not_include_children() {
        let registry = RuleRegistry::new();
        registry.register("app.rules", "r1", 1, noop()).unwrap();
        assert!(registry.discover("app").is_empty());
        assert_eq!(registry.discover("app.rules").len(), 1);
    }

    #[test]
    fn duplicate_name_rejected() {
        let registry = RuleRegistry::new();
        registry.register("ns", "same", 1, noop()).unwrap();
        let err = registry.register("ns", "same", 2, noop()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRule { ref name, .. } if name == "same"));

        // Same name in another namespace is fine.
        registry.register("other", "same", 1, noop()).unwrap();
    }

    #[test]
    fn names_differing_only_in_whitespace_collide() {
        let registry = RuleRegistry::new();
        registry.register("ns", "a", 1, noop()).unwrap();
        let err = registry.register("ns", " a", 2, noop()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRule { ref name, .. } if name == "a"));

        registry.register(" ns ", "b ", 2, noop()).unwrap();
        let names: Vec<String> = registry.discover("ns").iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn empty_name_rejected() {
        let registry = RuleRegistry::new();
        let err = registry.register("ns", "  ", 1, noop()).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyName { .. }));
        assert_eq!(registry.rule_count("ns"), 0);
    }

    #[test]
    fn discovery_is_idempotent() {
        let registry = RuleRegistry::new();
        registry.register("ns", "b", 1, noop()).unwrap();
        registry.register("ns", "a", 1, noop()).unwrap();

        let first: Vec<String> = registry.discover("ns").iter().map(|d| d.name().to_string()).collect();
        let second: Vec<String> = registry.discover("ns").iter().map(|d| d.name().to_string()).collect();
        assert_eq!(first, second);
    }
}
