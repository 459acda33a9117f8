//! Error types for notification operations
//!
//! Mutation-facing errors (auth, ownership, not-found, store) surface
//! precisely at the HTTP edge. Side-effect errors (audience resolution,
//! push delivery) are caught and logged at the fan-out boundary and never
//! fail the triggering request.

use thiserror::Error;

/// Notification error types.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// No valid session for the request
    #[error("Not authenticated")]
    Unauthenticated,

    /// Caller does not own the target record
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Target record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Notification store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Audience resolution failure
    #[error("Audience resolution failed: {0}")]
    Audience(String),

    /// Push delivery failure
    #[error("Push delivery failed: {0}")]
    Push(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for notification operations.
pub type NotifyResult<T> = Result<T, NotifyError>;

impl NotifyError {
    /// Check if this error should be logged at error level.
    ///
    /// Ownership and not-found failures are expected in normal operation
    /// and should not be logged as errors.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            NotifyError::Store(_)
                | NotifyError::Audience(_)
                | NotifyError::Push(_)
                | NotifyError::Serialization(_)
        )
    }

    /// Get HTTP status code for this error.
    ///
    /// Only mutation-facing errors reach the edge; side-effect errors are
    /// swallowed before a response is built.
    pub fn status_code(&self) -> u16 {
        match self {
            NotifyError::Unauthenticated => 401,
            NotifyError::Forbidden(_) => 403,
            NotifyError::NotFound(_) => 404,

            NotifyError::Store(_)
            | NotifyError::Audience(_)
            | NotifyError::Push(_)
            | NotifyError::Serialization(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            NotifyError::Unauthenticated => "UNAUTHENTICATED",
            NotifyError::Forbidden(_) => "FORBIDDEN",
            NotifyError::NotFound(_) => "NOT_FOUND",
            NotifyError::Store(_) => "STORE_ERROR",
            NotifyError::Audience(_) => "AUDIENCE_ERROR",
            NotifyError::Push(_) => "PUSH_ERROR",
            NotifyError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}
