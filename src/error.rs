//! Error taxonomy of the translation pipeline.
//!
//! Normalization and construction failures are fatal and carried by
//! [`TranslationError`]. Minimization problems never fail a translation; they are
//! reported as [`Advisory`] values on the successful result.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// The resource whose limit was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    States,
    DiagramNodes,
    Time,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::States => write!(f, "automaton states"),
            Resource::DiagramNodes => write!(f, "decision-diagram nodes"),
            Resource::Time => write!(f, "time"),
        }
    }
}

/// Limit value reported with [`TranslationError::ResourceExhausted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(usize),
    Duration(Duration),
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Count(n) => write!(f, "{}", n),
            Limit::Duration(d) => write!(f, "{:?}", d),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// Malformed input, rejected before any state is built.
    #[error("invalid formula: {0}")]
    InvalidFormula(String),

    /// A construction budget was exceeded. No automaton is produced.
    #[error("resource exhausted: {resource} (limit {limit})")]
    ResourceExhausted { resource: Resource, limit: Limit },

    /// The caller cancelled the translation.
    #[error("translation cancelled")]
    Cancelled,

    /// Construction reached a state inconsistent with its own invariants.
    #[error("internal invariant violation: {0}")]
    InternalInvariantViolation(String),
}

pub type Result<T, E = TranslationError> = std::result::Result<T, E>;

/// Non-fatal annotation on a successful translation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Advisory {
    #[error("oracle timed out on {pairs} merge candidate(s)")]
    OracleTimeout { pairs: usize },

    #[error("oracle unavailable: {reason}")]
    OracleUnavailable { reason: String },

    #[error("oracle query budget of {queries} exhausted")]
    OracleBudgetExhausted { queries: usize },

    #[error("oracle returned a witness that does not satisfy the query")]
    OracleInvalidWitness,
}
