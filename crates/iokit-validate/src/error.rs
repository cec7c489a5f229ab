use crate::validator::{SemanticType, Strictness};
use thiserror::Error;

/// The raw value could not be converted to the target semantic type.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot convert {value} ({actual}) to {target} under {strictness} conversion: {reason}")]
pub struct CoercionError {
    pub target: SemanticType,
    pub strictness: Strictness,
    /// Quoted rendering of the offending value.
    pub value: String,
    /// Variant name of the offending value.
    pub actual: &'static str,
    pub reason: String,
}

/// The value converted, but failed nullability, choices, bounds or a condition.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("value {value} {reason}")]
pub struct ValidationError {
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ValidateError {
    pub fn is_coercion(&self) -> bool {
        matches!(self, ValidateError::Coercion(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ValidateError::Validation(_))
    }
}
