//! Rule discovery contract and the deterministic ordering of its output.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::rule::Rule;

/// A discovered rule together with its identity and declared order.
pub struct RuleDescriptor<T, R> {
    name: String,
    order: i32,
    rule: Arc<dyn Rule<T, R>>,
}

impl<T, R> RuleDescriptor<T, R> {
    /// Surrounding whitespace is stripped from `name`.
    pub fn new(name: impl Into<String>, order: i32, rule: impl Rule<T, R> + 'static) -> Self {
        Self::from_shared(name, order, Arc::new(rule))
    }

    pub fn from_shared(name: impl Into<String>, order: i32, rule: Arc<dyn Rule<T, R>>) -> Self {
        let name = name.into();
        Self {
            name: name.trim().to_string(),
            order,
            rule,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn rule(&self) -> &dyn Rule<T, R> {
        self.rule.as_ref()
    }

    /// Execution order: declared order first, name as tie-break.
    pub fn cmp_execution(&self, other: &Self) -> Ordering {
        self.order
            .cmp(&other.order)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl<T, R> Clone for RuleDescriptor<T, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            order: self.order,
            rule: Arc::clone(&self.rule),
        }
    }
}

impl<T, R> fmt::Debug for RuleDescriptor<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDescriptor")
            .field("name", &self.name)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// Enumerates the rules registered for a namespace.
///
/// Implementations must be side-effect free and idempotent. A namespace that
/// is unknown or holds no rules yields an empty list rather than an error.
pub trait RuleSource<T, R>: Send + Sync {
    fn discover(&self, namespace: &str) -> Vec<RuleDescriptor<T, R>>;
}

/// Sort descriptors into execution order. Stable for equal keys, which can
/// only occur for duplicate names.
pub fn sort_for_execution<T, R>(rules: &mut [RuleDescriptor<T, R>]) {
    rules.sort_by(RuleDescriptor::cmp_execution);
}
