//! Shared primitives for all Rust crates in AuthSim.

#![forbid(unsafe_code)]

/// Session scoping primitives shared across services.
pub mod scope;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use scope::SessionScope;

/// Result type used across AuthSim crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation conflicts with the current session state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Network or backend failure on a single operation.
    #[error("transport error: {0}")]
    Transport(String),

    /// Live run status is unavailable after repeated polling failures.
    #[error("polling degraded after {consecutive_failures} consecutive failures")]
    PollingDegraded {
        /// Number of failed polls that disabled polling.
        consecutive_failures: u32,
    },

    /// Local draft persistence failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns true when the error came from the network or the backend.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn polling_degraded_reports_failure_count() {
        let error = AppError::PollingDegraded {
            consecutive_failures: 3,
        };
        assert_eq!(
            error.to_string(),
            "polling degraded after 3 consecutive failures"
        );
        assert!(!error.is_transport());
    }
}
