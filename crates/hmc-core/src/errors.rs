//! Structured error types shared across HMC crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`HmcError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, type names, trajectory indices, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the HMC engine.
///
/// None of these conditions is retried inside the engine. Callers resume from
/// the last valid checkpoint in a fresh process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum HmcError {
    /// Non-finite or out-of-domain action, force or acceptance weight.
    #[error("numerical instability: {0}")]
    NumericalInstability(ErrorInfo),
    /// A persisted evolver type tag has no registered loader.
    #[error("unknown evolver type: {0}")]
    UnknownEvolverType(ErrorInfo),
    /// A persisted transform type tag has no registered loader.
    #[error("unknown transform type: {0}")]
    UnknownTransformType(ErrorInfo),
    /// A soft link inside the store does not resolve.
    #[error("broken reference: {0}")]
    BrokenReference(ErrorInfo),
    /// A sanity check on a trajectory failed.
    #[error("sanity check failed: {0}")]
    SanityCheck(ErrorInfo),
    /// Attempt to create a store entry that already exists.
    #[error("store collision: {0}")]
    StoreCollision(ErrorInfo),
    /// Store access, I/O and parse errors.
    #[error("store error: {0}")]
    Store(ErrorInfo),
    /// Invalid parameters or registry misuse.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Randomness and seeding errors.
    #[error("rng error: {0}")]
    Rng(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl HmcError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            HmcError::NumericalInstability(info)
            | HmcError::UnknownEvolverType(info)
            | HmcError::UnknownTransformType(info)
            | HmcError::BrokenReference(info)
            | HmcError::SanityCheck(info)
            | HmcError::StoreCollision(info)
            | HmcError::Store(info)
            | HmcError::Config(info)
            | HmcError::Rng(info) => info,
        }
    }
}
