//! Error taxonomy for the RBAC repository core.

use thiserror::Error;

/// The five-way error taxonomy the core surfaces to callers.
#[derive(Debug, Error)]
pub enum RbacError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("already exists: {message}")]
    AlreadyExists { message: String },

    #[error("transient storage error: {message}")]
    Transient {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl RbacError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Whether a retry with backoff might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RbacError::Transient { .. })
    }
}
