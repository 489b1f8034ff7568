// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # rulebook
//!
//! A rule engine that discovers the rules registered under a namespace, fixes
//! them into a deterministic order, and applies them in sequence to a mutable
//! [`FactMap`](fact::FactMap). One engine can be shared by many threads; each
//! run is confined to its calling thread, including its result.
//!
//! ## Architecture
//!
//! - **Facts** (`fact`): named value cells and the per-run fact map
//! - **Rules** (`rule`): the rule capability and closure-backed rules
//! - **Discovery** (`source`, `registry`): namespace → ordered rule descriptors
//! - **Engines** (`engine`, `chain`): namespace-bound and manually assembled rule books
//! - **Configuration** (`config`): TOML-backed engine settings
//!
//! ## Library usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use rulebook::engine::Engine;
//! use rulebook::fact::FactMap;
//! use rulebook::seeds::{self, EQUIVALENCE_NAMESPACE};
//!
//! let registry = Arc::new(seeds::builtin_registry().unwrap());
//! let engine: Engine<String> = Engine::new(EQUIVALENCE_NAMESPACE, registry);
//!
//! let mut facts = FactMap::new();
//! facts.set_value("fact1", "Fact".to_string());
//! facts.set_value("fact2", "Fact".to_string());
//! engine.run(&mut facts).unwrap();
//!
//! assert_eq!(facts.value("fact1").as_deref(), Some(seeds::FACTUAL_TOO));
//! assert_eq!(engine.result().as_deref(), Some(seeds::EQUIVALENCE));
//! ```

pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod fact;
pub mod registry;
pub mod rule;
pub mod seeds;
mod slot;
pub mod source;

pub use chain::RuleChain;
pub use config::EngineConfig;
pub use engine::{Engine, RuleBook};
pub use error::{EngineError, RegistryError, RuleBookError};
pub use fact::{Fact, FactMap};
pub use registry::RuleRegistry;
pub use rule::{FnRule, Rule};
pub use source::{RuleDescriptor, RuleSource};
