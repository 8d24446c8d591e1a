//! Error taxonomy for the query engine.
//!
//! Callers map these onto their own surface: validation failures are client
//! errors, policy failures are access-denied, persistence failures are
//! retryable server errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A filter, sort or input value outside its allowed domain.
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// The acting role could not be resolved to a known policy.
    #[error("access denied: {0}")]
    Policy(String),

    /// The store failed mid-query. Nothing was applied.
    #[error("storage failure: {0}")]
    Persistence(#[from] rusqlite::Error),
}

impl CoreError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Persistence(_))
    }
}
