//! The rule capability and a closure-backed implementation.

use std::fmt;

use crate::error::BoxError;
use crate::fact::FactMap;

/// Outcome of a rule action: an optional candidate result, or a failure that
/// aborts the rest of the run.
pub type ActionResult<R> = std::result::Result<Option<R>, BoxError>;

/// A unit of business logic applied to a [`FactMap`].
///
/// `T` is the fact value type, `R` the result type. Rules are shared between
/// every thread running the engine, so any interior state must be `Sync`.
pub trait Rule<T, R>: Send + Sync {
    /// Whether the action should fire for these facts. Defaults to always.
    fn condition(&self, facts: &FactMap<T>) -> bool {
        let _ = facts;
        true
    }

    /// Apply the rule. Returning `Ok(Some(r))` offers `r` as the run's result;
    /// a later rule producing a result replaces it.
    fn execute(&self, facts: &mut FactMap<T>) -> ActionResult<R>;
}

type Condition<T> = Box<dyn Fn(&FactMap<T>) -> bool + Send + Sync>;
type Action<T, R> = Box<dyn Fn(&mut FactMap<T>) -> ActionResult<R> + Send + Sync>;

/// A rule assembled from closures.
///
/// ```
/// use rulebook::fact::FactMap;
/// use rulebook::rule::{FnRule, Rule};
///
/// let double = FnRule::new(|facts: &mut FactMap<i64>| {
///     let n = facts.value("n").unwrap_or_default();
///     facts.set_value("n", n * 2);
///     Ok(Some(n * 2))
/// })
/// .when(|facts| facts.contains("n"));
///
/// let mut facts: FactMap<i64> = [("n", 21)].into_iter().collect();
/// assert!(double.condition(&facts));
/// assert_eq!(double.execute(&mut facts).unwrap(), Some(42));
/// ```
pub struct FnRule<T, R> {
    condition: Option<Condition<T>>,
    action: Action<T, R>,
}

impl<T, R> FnRule<T, R> {
    pub fn new<F>(action: F) -> Self
    where
        F: Fn(&mut FactMap<T>) -> ActionResult<R> + Send + Sync + 'static,
    {
        Self {
            condition: None,
            action: Box::new(action),
        }
    }

    /// Guard the action with a condition.
    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&FactMap<T>) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Box::new(condition));
        self
    }
}

impl<T, R> Rule<T, R> for FnRule<T, R> {
    fn condition(&self, facts: &FactMap<T>) -> bool {
        self.condition.as_ref().is_none_or(|cond| cond(facts))
    }

    fn execute(&self, facts: &mut FactMap<T>) -> ActionResult<R> {
        (self.action)(facts)
    }
}

impl<T, R> fmt::Debug for FnRule<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule")
            .field("conditional", &self.condition.is_some())
            .finish_non_exhaustive()
    }
}
