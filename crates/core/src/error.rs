//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Storage and
/// provider failures belong to the crates that own those concerns.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. unknown enum literal).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A lifecycle transition that only moves forward was asked to go back.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_positive(raw: &str) -> DomainResult<u32> {
        match raw.parse::<u32>() {
            Ok(0) | Err(_) => Err(DomainError::validation(format!("'{raw}' is not positive"))),
            Ok(n) => Ok(n),
        }
    }

    #[test]
    fn messages_carry_their_context() {
        assert_eq!(
            parse_positive("0").unwrap_err().to_string(),
            "validation failed: '0' is not positive"
        );
        assert_eq!(parse_positive("7"), Ok(7));
        assert_eq!(
            DomainError::invalid_transition("completed", "pending").to_string(),
            "invalid transition: completed -> pending"
        );
    }
}
