//! Domain error types.

use thiserror::Error;

/// Shared domain error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// A value or configuration failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A request was made from a state that does not permit it.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
}
