//! Error types for the lotbill-core library.

use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryError;

/// Main error type for the lotbill library.
#[derive(Error, Debug)]
pub enum LotbillError {
    /// Precondition failure raised before any network call.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// An outbound call failed terminally or ran out of attempts.
    #[error("upstream error: {0}")]
    Upstream(#[from] RetryError<UpstreamError>),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised locally by the ledger mapper. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No destination account was supplied for the bill lines.
    #[error("account code is required")]
    MissingAccountCode,

    /// A field failed validation.
    #[error("validation failed for {field}: {reason}")]
    Field { field: String, reason: String },
}

/// Error code for a successful call whose response body was unusable.
pub const UNREADABLE_RESPONSE: &str = "UNREADABLE_RESPONSE";

/// Failure of a single outbound call (extraction service or ledger).
///
/// Carries the raw signals the retry classifier looks at: HTTP status,
/// provider error code and message text, plus any `Retry-After` hint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UpstreamError {
    /// HTTP status code, when the call got a response.
    pub status: Option<u16>,
    /// Provider or transport error code (e.g. `ECONNRESET`, `rate_limit_exceeded`).
    pub code: Option<String>,
    /// Human readable message.
    pub message: String,
    /// Server-supplied `Retry-After` delay.
    pub retry_after: Option<Duration>,
}

impl UpstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
            retry_after: None,
        }
    }

    /// The call went through but its response could not be read.
    ///
    /// The upstream side effect may already have happened, so this is never retried.
    pub fn unreadable_response(message: impl Into<String>) -> Self {
        Self::new(message).with_code(UNREADABLE_RESPONSE)
    }

    /// Error for a response with a non-success HTTP status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(message).with_status(status)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }
}

/// Result type for the lotbill library.
pub type Result<T> = std::result::Result<T, LotbillError>;
