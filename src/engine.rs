//! Engine facade: namespace-bound rule execution.
//!
//! An [`Engine`] is bound to one namespace. Its rule list is discovered from a
//! [`RuleSource`] on the first run, ordered once, and never changes after that.
//! Each run executes the rules sequentially on the calling thread and records
//! its result in a slot private to that thread.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::fact::FactMap;
use crate::slot::ResultSlot;
use crate::source::{RuleDescriptor, RuleSource, sort_for_execution};

/// The common surface of rule books.
///
/// `T` is the fact value type and `R` the result type.
pub trait RuleBook<T, R> {
    /// Add a rule to the book. Not every variant accepts manual registration.
    fn add_rule(&self, rule: RuleDescriptor<T, R>) -> EngineResult<()>;

    /// Run every rule against `facts` and return the run's result.
    fn run(&self, facts: &mut FactMap<T>) -> EngineResult<Option<R>>;

    /// The result of the most recent [`run`](Self::run) on the calling thread.
    fn result(&self) -> Option<R>;

    /// Whether the book currently holds any rule.
    fn has_rules(&self) -> bool;
}

/// Rule engine whose rules come exclusively from namespace discovery.
pub struct Engine<T, R = T> {
    namespace: String,
    disabled_rules: Vec<String>,
    source: Arc<dyn RuleSource<T, R>>,
    rules: OnceLock<Vec<RuleDescriptor<T, R>>>,
    result: ResultSlot<R>,
}

impl<T, R> Engine<T, R>
where
    R: Clone + 'static,
{
    /// Bind an engine to `namespace`. Discovery is deferred to the first run.
    pub fn new(namespace: impl Into<String>, source: Arc<dyn RuleSource<T, R>>) -> Self {
        Self::with_config(
            EngineConfig {
                namespace: namespace.into(),
                ..Default::default()
            },
            source,
        )
    }

    pub fn with_config(config: EngineConfig, source: Arc<dyn RuleSource<T, R>>) -> Self {
        Self {
            namespace: config.namespace,
            disabled_rules: config.disabled_rules,
            source,
            rules: OnceLock::new(),
            result: ResultSlot::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Discover and order the rules if that has not happened yet.
    ///
    /// Exactly one caller performs discovery; concurrent callers block until
    /// the list is complete and then share it.
    pub fn populate(&self) -> &[RuleDescriptor<T, R>] {
        self.rules.get_or_init(|| {
            let mut rules = self.source.discover(&self.namespace);
            let discovered = rules.len();
            rules.retain(|rule| !self.disabled_rules.iter().any(|d| d == rule.name()));
            sort_for_execution(&mut rules);
            tracing::info!(
                namespace = %self.namespace,
                discovered,
                active = rules.len(),
                "populated rule list"
            );
            rules
        })
    }

    /// Whether discovery has already run.
    pub fn is_populated(&self) -> bool {
        self.rules.get().is_some()
    }

    /// Names of the ordered rules, or `None` before population.
    pub fn rule_names(&self) -> Option<Vec<String>> {
        self.rules
            .get()
            .map(|rules| rules.iter().map(|r| r.name().to_string()).collect())
    }

    /// Run the namespace's rules against `facts`.
    ///
    /// Returns the last result produced by a rule, which is also stored for
    /// [`result`](Self::result) on this thread. A failing rule aborts the run;
    /// the thread's stored result is cleared and the failure is returned.
    pub fn run(&self, facts: &mut FactMap<T>) -> EngineResult<Option<R>> {
        let rules = self.populate();
        match execute(&self.namespace, rules, facts) {
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

    /// The result of this thread's most recent run. Never triggers discovery.
    pub fn result(&self) -> Option<R> {
        self.result.load()
    }

    /// False until populated; afterwards whether any rule is active. Never
    /// triggers discovery.
    pub fn has_rules(&self) -> bool {
        self.rules.get().is_some_and(|rules| !rules.is_empty())
    }

    /// Always fails: this engine only takes rules from discovery.
    pub fn add_rule(&self, rule: RuleDescriptor<T, R>) -> EngineResult<()> {
        tracing::debug!(
            namespace = %self.namespace,
            rule = rule.name(),
            "rejected manual rule registration"
        );
        Err(EngineError::RegistrationForbidden {
            namespace: self.namespace.clone(),
        })
    }
}

impl<T, R> RuleBook<T, R> for Engine<T, R>
where
    R: Clone + 'static,
{
    fn add_rule(&self, rule: RuleDescriptor<T, R>) -> EngineResult<()> {
        Engine::add_rule(self, rule)
    }

    fn run(&self, facts: &mut FactMap<T>) -> EngineResult<Option<R>> {
        Engine::run(self, facts)
    }

    fn result(&self) -> Option<R> {
        Engine::result(self)
    }

    fn has_rules(&self) -> bool {
        Engine::has_rules(self)
    }
}

impl<T, R> fmt::Debug for Engine<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("namespace", &self.namespace)
            .field("disabled_rules", &self.disabled_rules)
            .field("rules", &self.rules.get())
            .finish_non_exhaustive()
    }
}

/// Apply `rules` to `facts` in order, returning the last candidate result.
pub(crate) fn execute<T, R>(
    book: &str,
    rules: &[RuleDescriptor<T, R>],
    facts: &mut FactMap<T>,
) -> EngineResult<Option<R>> {
    let mut result = None;
    for descriptor in rules {
        let rule = descriptor.rule();
        if !rule.condition(facts) {
            tracing::trace!(book, rule = descriptor.name(), "condition not met");
            continue;
        }
        match rule.execute(facts) {
            Ok(Some(candidate)) => {
                tracing::debug!(book, rule = descriptor.name(), "rule fired with result");
                result = Some(candidate);
            }
            Ok(None) => {
                tracing::debug!(book, rule = descriptor.name(), "rule fired");
            }
            Err(source) => {
                tracing::warn!(
                    book,
                    rule = descriptor.name(),
                    error = %source,
                    "rule failed, aborting run"
                );
                return Err(EngineError::RuleFailed {
                    rule: descriptor.name().to_string(),
                    order: descriptor.order(),
                    source,
                });
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RuleRegistry;
    use crate::rule::FnRule;

    fn append(tag: &'static str) -> FnRule<String, String> {
        FnRule::new(move |facts: &mut FactMap<String>| {
            let trail = facts.value("trail").unwrap_or_default();
            facts.set_value("trail", format!("{trail}{tag}"));
            Ok(Some(tag.to_string()))
        })
    }

    fn engine_for(registry: RuleRegistry<String>, namespace: &str) -> Engine<String> {
        Engine::new(namespace, Arc::new(registry))
    }

    #[test]
    fn runs_rules_in_declared_order() {
        let registry = RuleRegistry::new();
        registry.register("ns", "third", 3, append("c")).unwrap();
        registry.register("ns", "first", 1, append("a")).unwrap();
        registry.register("ns", "second", 2, append("b")).unwrap();
        let engine = engine_for(registry, "ns");

        let mut facts = FactMap::new();
        let result = engine.run(&mut facts).unwrap();

        assert_eq!(facts.value("trail").as_deref(), Some("abc"));
        assert_eq!(result.as_deref(), Some("c"));
        assert_eq!(engine.result().as_deref(), Some("c"));
        assert_eq!(
            engine.rule_names().unwrap(),
            ["first", "second", "third"]
        );
    }

    #[test]
    fn queries_do_not_trigger_discovery() {
        let registry = RuleRegistry::new();
        registry.register("ns", "only", 1, append("x")).unwrap();
        let engine = engine_for(registry, "ns");

        assert!(!engine.has_rules());
        assert_eq!(engine.result(), None);
        assert!(!engine.is_populated());
        assert!(engine.rule_names().is_none());

        engine.populate();
        assert!(engine.has_rules());
        assert_eq!(engine.result(), None);
    }

    #[test]
    fn skipped_condition_produces_no_result() {
        let registry = RuleRegistry::new();
        registry
            .register("ns", "guarded", 1, append("x").when(|f| f.contains("go")))
            .unwrap();
        let engine = engine_for(registry, "ns");

        let mut facts = FactMap::new();
        assert_eq!(engine.run(&mut facts).unwrap(), None);
        assert!(facts.is_empty());

        facts.set_value("go", String::new());
        assert_eq!(engine.run(&mut facts).unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn failure_aborts_and_keeps_prior_mutations() {
        let registry = RuleRegistry::new();
        registry.register("ns", "before", 1, append("a")).unwrap();
        registry
            .register(
                "ns",
                "explode",
                2,
                FnRule::new(|_: &mut FactMap<String>| Err("exploded".into())),
            )
            .unwrap();
        registry.register("ns", "after", 3, append("z")).unwrap();
        let engine = engine_for(registry, "ns");

        let mut facts = FactMap::new();
        let err = engine.run(&mut facts).unwrap_err();

        match err {
            EngineError::RuleFailed { rule, order, source } => {
                assert_eq!(rule, "explode");
                assert_eq!(order, 2);
                assert_eq!(source.to_string(), "exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(facts.value("trail").as_deref(), Some("a"));
        assert_eq!(engine.result(), None);
    }

    #[test]
    fn failed_run_clears_previous_result() {
        let registry = RuleRegistry::new();
        registry.register("ns", "tag", 1, append("t")).unwrap();
        registry
            .register(
                "ns",
                "maybe-fail",
                2,
                FnRule::new(|_: &mut FactMap<String>| Err("refused".into()))
                    .when(|f| f.contains("fail")),
            )
            .unwrap();
        let engine = engine_for(registry, "ns");

        engine.run(&mut FactMap::new()).unwrap();
        assert_eq!(engine.result().as_deref(), Some("t"));

        let mut failing = FactMap::new();
        failing.set_value("fail", String::new());
        assert!(engine.run(&mut failing).is_err());
        assert_eq!(engine.result(), None);
    }

    #[test]
    fn add_rule_is_always_rejected() {
        let registry = RuleRegistry::new();
        registry.register("ns", "only", 1, append("x")).unwrap();
        let engine = engine_for(registry, "ns");

        let before = engine.add_rule(RuleDescriptor::new("extra", 0, append("e")));
        assert!(matches!(before, Err(EngineError::RegistrationForbidden { .. })));

        engine.run(&mut FactMap::new()).unwrap();
        let after = engine.add_rule(RuleDescriptor::new("extra", 0, append("e")));
        assert!(matches!(after, Err(EngineError::RegistrationForbidden { ref namespace }) if namespace == "ns"));
        assert_eq!(engine.rule_names().unwrap(), ["only"]);
    }

    #[test]
    fn disabled_rules_are_dropped_at_population() {
        let registry = RuleRegistry::new();
        registry.register("ns", "keep", 1, append("k")).unwrap();
        registry.register("ns", "skip", 2, append("s")).unwrap();
        let engine = Engine::with_config(
            EngineConfig {
                namespace: "ns".into(),
                disabled_rules: vec!["skip".into()],
            },
            Arc::new(registry),
        );

        let mut facts = FactMap::new();
        engine.run(&mut facts).unwrap();
        assert_eq!(facts.value("trail").as_deref(), Some("k"));
        assert_eq!(engine.rule_names().unwrap(), ["keep"]);
    }

    #[test]
    fn engines_keep_separate_results_on_one_thread() {
        let registry = Arc::new(RuleRegistry::new());
        registry.register("a", "ra", 1, append("from-a")).unwrap();
        registry.register("b", "rb", 1, append("from-b")).unwrap();
        let a: Engine<String> = Engine::new("a", registry.clone());
        let b: Engine<String> = Engine::new("b", registry);

        a.run(&mut FactMap::new()).unwrap();
        b.run(&mut FactMap::new()).unwrap();
        assert_eq!(a.result().as_deref(), Some("from-a"));
        assert_eq!(b.result().as_deref(), Some("from-b"));
    }
}
