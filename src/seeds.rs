//! Built-in rule packs.
//!
//! The equivalence pack is two rules over `String` facts `fact1` and `fact2`:
//!
//! 1. `fact-equivalence` (order 1): when both facts are equal, set `fact2` to
//!    [`FACTUAL`].
//! 2. `factual-result` (order 2): when `fact2` is [`FACTUAL`], set `fact1` to
//!    [`FACTUAL_TOO`] and produce [`EQUIVALENCE`] as the result.
//!
//! The second rule only fires because the first ran before it, which makes the
//! pack a convenient check of ordering and in-run visibility.

use crate::error::RegistryResult;
use crate::fact::FactMap;
use crate::registry::RuleRegistry;
use crate::rule::FnRule;

/// Namespace of the equivalence pack.
pub const EQUIVALENCE_NAMESPACE: &str = "rulebook.samples.equivalence";

pub const FACTUAL: &str = "So Factual!";
pub const FACTUAL_TOO: &str = "So Factual Too!";
pub const EQUIVALENCE: &str = "Equivalence, Bitches!";

/// Register the equivalence pack into `registry`.
pub fn register_equivalence(registry: &RuleRegistry<String>) -> RegistryResult<()> {
    registry.register(
        EQUIVALENCE_NAMESPACE,
        "fact-equivalence",
        1,
        FnRule::new(|facts: &mut FactMap<String>| {
            facts.set_value("fact2", FACTUAL.to_string());
            Ok(None)
        })
        .when(|facts| match (facts.value("fact1"), facts.value("fact2")) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }),
    )?;

    registry.register(
        EQUIVALENCE_NAMESPACE,
        "factual-result",
        2,
        FnRule::new(|facts: &mut FactMap<String>| {
            facts.set_value("fact1", FACTUAL_TOO.to_string());
            Ok(Some(EQUIVALENCE.to_string()))
        })
        .when(|facts| facts.value_matches("fact2", |v| v == FACTUAL)),
    )?;

    Ok(())
}

/// A registry pre-loaded with every built-in pack.
pub fn builtin_registry() -> RegistryResult<RuleRegistry<String>> {
    let registry = RuleRegistry::new();
    register_equivalence(&registry)?;
    Ok(registry)
}
