//! Stable surface for embedding.
//!
//! Everything crossing this boundary is an owned value: the formula and options
//! go in by value, a HOA string or a [`BoundaryError`] with a numeric code comes
//! out. No arena, diagram or automaton handle escapes.

use std::fmt;

use crate::automaton::Automaton;
use crate::error::TranslationError;
use crate::hoa::HoaError;
use crate::ltl::Ltl;
use crate::translate::{translate, TranslationOptions};

/// Numeric error codes. The values are part of the boundary and do not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    InvalidFormula = 1,
    ResourceExhausted = 2,
    Cancelled = 3,
    InternalInvariantViolation = 4,
    MalformedAutomaton = 5,
}

impl ErrorCode {
    pub fn code(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryError {
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for BoundaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for BoundaryError {}

impl From<TranslationError> for BoundaryError {
    fn from(e: TranslationError) -> Self {
        let code = match e {
            TranslationError::InvalidFormula(_) => ErrorCode::InvalidFormula,
            TranslationError::ResourceExhausted { .. } => ErrorCode::ResourceExhausted,
            TranslationError::Cancelled => ErrorCode::Cancelled,
            TranslationError::InternalInvariantViolation(_) => ErrorCode::InternalInvariantViolation,
        };
        Self {
            code,
            message: e.to_string(),
        }
    }
}

impl From<HoaError> for BoundaryError {
    fn from(e: HoaError) -> Self {
        Self {
            code: ErrorCode::MalformedAutomaton,
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryOutput {
    pub hoa: String,
    /// Rendered advisories of the translation.
    pub advisories: Vec<String>,
}

pub fn translate_to_hoa(formula: Ltl, options: TranslationOptions) -> Result<BoundaryOutput, BoundaryError> {
    let translation = translate(&formula, &options)?;
    Ok(BoundaryOutput {
        hoa: translation.automaton.to_hoa(),
        advisories: translation.advisories.iter().map(|a| a.to_string()).collect(),
    })
}

pub fn parse_hoa(text: &str) -> Result<Automaton, BoundaryError> {
    Ok(Automaton::from_hoa(text)?)
}
