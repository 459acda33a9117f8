//! Error types for rate limiting

use thiserror::Error;

/// Rate limiting error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitError {
    /// The caller exhausted its quota for the current window
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    Exceeded {
        /// Seconds until the window resets
        retry_after_secs: u64,
    },
}

impl RateLimitError {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            RateLimitError::Exceeded { .. } => 429,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            RateLimitError::Exceeded { .. } => "RATE_LIMIT_EXCEEDED",
        }
    }
}
