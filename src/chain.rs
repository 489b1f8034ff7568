//! Manually assembled rule books.
//!
//! A [`RuleChain`] is the counterpart of the namespace-bound
//! [`Engine`](crate::engine::Engine): rules are added directly with
//! [`add_rule`](RuleChain::add_rule) and kept in execution order. Runs
//! execute against a snapshot of the chain taken when the run starts, so a
//! rule added concurrently only affects later runs.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::engine::{RuleBook, execute};
use crate::error::EngineResult;
use crate::fact::FactMap;
use crate::slot::ResultSlot;
use crate::source::RuleDescriptor;

pub struct RuleChain<T, R = T> {
    name: String,
    rules: RwLock<Arc<Vec<RuleDescriptor<T, R>>>>,
    result: ResultSlot<R>,
}

impl<T, R> RuleChain<T, R>
where
    R: Clone + 'static,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: RwLock::new(Arc::new(Vec::new())),
            result: ResultSlot::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a rule at its place in execution order.
    pub fn add_rule(&self, rule: RuleDescriptor<T, R>) -> EngineResult<()> {
        self.insert_sorted(rule);
        Ok(())
    }

    /// Builder-style [`add_rule`](Self::add_rule).
    pub fn with_rule(self, rule: RuleDescriptor<T, R>) -> Self {
        self.insert_sorted(rule);
        self
    }

    fn insert_sorted(&self, rule: RuleDescriptor<T, R>) {
        let mut guard = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        let at = guard.partition_point(|existing| existing.cmp_execution(&rule).is_le());
        tracing::debug!(chain = %self.name, rule = rule.name(), position = at, "added rule");
        let mut next = Vec::clone(&guard);
        next.insert(at, rule);
        *guard = Arc::new(next);
    }

    pub fn run(&self, facts: &mut FactMap<T>) -> EngineResult<Option<R>> {
        let rules = Arc::clone(&self.rules.read().unwrap_or_else(PoisonError::into_inner));
        match execute(&self.name, &rules, facts) {
            Ok(result) => {
                self.result.store(result.clone());
                Ok(result)
            }
            Err(err) => {
                self.result.clear();
                Err(err)
            }
        }
    }

    pub fn result(&self) -> Option<R> {
        self.result.load()
    }

    pub fn has_rules(&self) -> bool {
        !self
            .rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    pub fn rule_names(&self) -> Vec<String> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }
}

impl<T, R> RuleBook<T, R> for RuleChain<T, R>
where
    R: Clone + 'static,
{
    fn add_rule(&self, rule: RuleDescriptor<T, R>) -> EngineResult<()> {
        RuleChain::add_rule(self, rule)
    }

    fn run(&self, facts: &mut FactMap<T>) -> EngineResult<Option<R>> {
        RuleChain::run(self, facts)
    }

    fn result(&self) -> Option<R> {
        RuleChain::result(self)
    }

    fn has_rules(&self) -> bool {
        RuleChain::has_rules(self)
    }
}

impl<T, R> fmt::Debug for RuleChain<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("RuleChain")
            .field("name", &self.name)
            .field("rules", &**rules)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::FnRule;

    fn push(n: i64) -> FnRule<i64, i64> {
        FnRule::new(move |facts: &mut FactMap<i64>| {
            let total = facts.value("total").unwrap_or_default() * 10 + n;
            facts.set_value("total", total);
            Ok(Some(total))
        })
    }

    #[test]
    fn empty_chain_is_a_no_op() {
        let chain: RuleChain<i64> = RuleChain::new("empty");
        assert!(!chain.has_rules());
        let mut facts: FactMap<i64> = [("total", 5)].into_iter().collect();
        assert_eq!(chain.run(&mut facts).unwrap(), None);
        assert_eq!(facts.value("total"), Some(5));
    }

    #[test]
    fn rules_run_in_order_regardless_of_insertion() {
        let chain = RuleChain::new("digits")
            .with_rule(RuleDescriptor::new("three", 3, push(3)))
            .with_rule(RuleDescriptor::new("one", 1, push(1)))
            .with_rule(RuleDescriptor::new("two", 2, push(2)));

        assert_eq!(chain.rule_names(), ["one", "two", "three"]);

        let mut facts = FactMap::new();
        assert_eq!(chain.run(&mut facts).unwrap(), Some(123));
        assert_eq!(chain.result(), Some(123));
    }

    #[test]
    fn equal_order_breaks_ties_by_name() {
        let chain: RuleChain<i64> = RuleChain::new("ties");
        chain.add_rule(RuleDescriptor::new("b", 1, push(2))).unwrap();
        chain.add_rule(RuleDescriptor::new("a", 1, push(1))).unwrap();
        assert_eq!(chain.rule_names(), ["a", "b"]);
    }

    #[test]
    fn builder_and_add_rule_share_placement() {
        let built = RuleChain::new("built")
            .with_rule(RuleDescriptor::new("late", 5, push(5)))
            .with_rule(RuleDescriptor::new("early", -1, push(1)));
        let added: RuleChain<i64> = RuleChain::new("added");
        added.add_rule(RuleDescriptor::new("late", 5, push(5))).unwrap();
        added.add_rule(RuleDescriptor::new("early", -1, push(1))).unwrap();

        assert_eq!(built.rule_names(), added.rule_names());
        assert_eq!(
            built.run(&mut FactMap::new()).unwrap(),
            added.run(&mut FactMap::new()).unwrap()
        );
    }

    #[test]
    fn usable_through_the_trait() {
        let chain: RuleChain<i64> = RuleChain::new("dyn");
        let book: &dyn RuleBook<i64, i64> = &chain;
        book.add_rule(RuleDescriptor::new("seven", 0, push(7))).unwrap();
        assert!(book.has_rules());
        assert_eq!(book.run(&mut FactMap::new()).unwrap(), Some(7));
        assert_eq!(book.result(), Some(7));
    }
}
