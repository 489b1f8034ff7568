//! Diagnostic error types for the rulebook engine.
//!
//! Each subsystem defines its own error enum with miette `#[diagnostic]` derives
//! so callers get an error code and help text alongside the message. The
//! top-level [`RuleBookError`] wraps them transparently.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;

/// Boxed error returned by rule actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for the rulebook crate.
#[derive(Debug, Error, Diagnostic)]
pub enum RuleBookError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("rules cannot be added to the engine for namespace \"{namespace}\"")]
    #[diagnostic(
        code(rulebook::engine::registration_forbidden),
        help(
            "This engine takes its rules exclusively from namespace discovery. \
             Register the rule in the RuleRegistry under \"{namespace}\" before the \
             first run, or use a RuleChain for manually assembled rule lists."
        )
    )]
    RegistrationForbidden { namespace: String },

    #[error("rule \"{rule}\" (order {order}) failed: {source}")]
    #[diagnostic(
        code(rulebook::engine::rule_failed),
        help(
            "The run was aborted at this rule. Facts already modified by earlier rules \
             keep their new values; no later rule was executed."
        )
    )]
    RuleFailed {
        rule: String,
        order: i32,
        #[source]
        source: BoxError,
    },
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("rule \"{name}\" is already registered in namespace \"{namespace}\"")]
    #[diagnostic(
        code(rulebook::registry::duplicate_rule),
        help("Rule names must be unique within a namespace. Rename one of the rules.")
    )]
    DuplicateRule { namespace: String, name: String },

    #[error("rule registered in namespace \"{namespace}\" has an empty name")]
    #[diagnostic(
        code(rulebook::registry::empty_name),
        help("Give the rule a non-empty name; it is used as the ordering tie-break.")
    )]
    EmptyName { namespace: String },
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Result type for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Result type for operations spanning several subsystems.
pub type RuleBookResult<T> = std::result::Result<T, RuleBookError>;
