//! Facts and fact maps: the mutable state a rule run operates on.
//!
//! A [`Fact`] is a named cell. Cloning a fact yields another handle to the
//! *same* cell, so a caller that keeps a handle observes every mutation rules
//! make during a run. A [`FactMap`] is the per-invocation keyed collection.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A named, mutable value cell.
pub struct Fact<T> {
    name: Arc<str>,
    value: Arc<RwLock<T>>,
}

impl<T> Fact<T> {
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: Arc::from(name.into()),
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// The fact's name, unique within a [`FactMap`].
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the value in place. Every handle to this fact sees the change.
    pub fn set_value(&self, value: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Inspect the current value without cloning it.
    ///
    /// The read lock is held while `f` runs, so `f` must not call
    /// [`set_value`](Self::set_value) on this fact or any handle sharing its
    /// cell. Use [`value`](Self::value) when the closure may write.
    pub fn with_value<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        f(&self.value.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Whether two handles refer to the same cell.
    pub fn same_cell(&self, other: &Fact<T>) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl<T: Clone> Fact<T> {
    /// A copy of the current value.
    pub fn value(&self) -> T {
        self.with_value(T::clone)
    }
}

impl<T> Clone for Fact<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Fact<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_value(|value| {
            f.debug_struct("Fact")
                .field("name", &self.name)
                .field("value", value)
                .finish()
        })
    }
}

impl<T: fmt::Display> fmt::Display for Fact<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_value(|value| write!(f, "{}={}", self.name, value))
    }
}

/// A keyed collection of facts supplied fresh for each run.
pub struct FactMap<T> {
    facts: HashMap<String, Fact<T>>,
}

impl<T> FactMap<T> {
    pub fn new() -> Self {
        Self {
            facts: HashMap::new(),
        }
    }

    /// Insert a fact under its own name, returning the fact it displaced.
    pub fn put(&mut self, fact: Fact<T>) -> Option<Fact<T>> {
        self.facts.insert(fact.name().to_string(), fact)
    }

    pub fn get(&self, name: &str) -> Option<&Fact<T>> {
        self.facts.get(name)
    }

    /// Set the value of `name`, creating the fact on first use.
    ///
    /// An existing fact is mutated in place, so handles obtained earlier
    /// through [`get`](Self::get) or [`put`](Self::put) stay attached.
    pub fn set_value(&mut self, name: &str, value: T) {
        match self.facts.get(name) {
            Some(fact) => fact.set_value(value),
            None => {
                self.facts.insert(name.to_string(), Fact::new(name, value));
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Fact<T>> {
        self.facts.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.facts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Iterate over facts in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Fact<T>> {
        self.facts.values()
    }
}

impl<T: Clone> FactMap<T> {
    /// A copy of the value stored under `name`.
    pub fn value(&self, name: &str) -> Option<T> {
        self.facts.get(name).map(Fact::value)
    }

    /// Whether the fact `name` exists and its value satisfies `pred`.
    ///
    /// `pred` sees a copy, so it may write to the fact it inspects.
    pub fn value_matches(&self, name: &str, pred: impl FnOnce(&T) -> bool) -> bool {
        self.value(name).is_some_and(|value| pred(&value))
    }

    /// Name-sorted copy of every value, detached from the live cells.
    pub fn snapshot(&self) -> BTreeMap<String, T> {
        self.facts
            .iter()
            .map(|(name, fact)| (name.clone(), fact.value()))
            .collect()
    }
}

impl<T> Default for FactMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for FactMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.facts.keys().collect();
        names.sort();
        let mut map = f.debug_map();
        for name in names {
            self.facts[name].with_value(|value| {
                map.entry(name, value);
            });
        }
        map.finish()
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for FactMap<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.put(Fact::new(name, value));
        }
        map
    }
}

impl<T> FromIterator<Fact<T>> for FactMap<T> {
    fn from_iter<I: IntoIterator<Item = Fact<T>>>(iter: I) -> Self {
        let mut map = Self::new();
        for fact in iter {
            map.put(fact);
        }
        map
    }
}
