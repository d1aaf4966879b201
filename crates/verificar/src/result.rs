//! Result and error types for Verificar.

use thiserror::Error;

/// Result type for Verificar operations
pub type VerificarResult<T> = Result<T, VerificarError>;

/// Errors that can occur in Verificar
#[derive(Debug, Error)]
pub enum VerificarError {
    /// Address pattern could not be parsed
    #[error("Malformed address pattern '{template}': {message}")]
    TemplateParse {
        /// The offending pattern
        template: String,
        /// Error message
        message: String,
    },

    /// Template resolution could not produce a concrete address
    #[error("Cannot resolve template '{template}': {message}")]
    Resolution {
        /// The template being resolved
        template: String,
        /// Error message
        message: String,
    },

    /// Transport-level failure while submitting an operation
    #[error("Dispatch failed: {message}")]
    Dispatch {
        /// Error message
        message: String,
    },

    /// Management endpoint rejected the operation
    #[error("Operation failed: {description}")]
    OperationFailed {
        /// Failure description reported by the endpoint
        description: String,
    },

    /// Element absent within the implicit wait
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// Selector that matched nothing
        selector: String,
    },

    /// Expected UI transition never happened
    #[error("Timed out after {ms}ms waiting for {waiting_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// What was being waited for
        waiting_for: String,
    },

    /// Backend state never matched the expectation within the budget
    #[error("Verification of {subject} failed after {ms}ms: expected {expected}, last observed {observed}")]
    Verification {
        /// What was being verified (address, optionally attribute)
        subject: String,
        /// Expected value
        expected: String,
        /// Last observed value
        observed: String,
        /// Polling budget in milliseconds
        ms: u64,
    },

    /// Session acquisition or release fault
    #[error("Session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// Operation called in the wrong state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VerificarError {
    /// Check whether this is an element-absence signal.
    ///
    /// Access-control tests treat a missing affordance as the expected
    /// outcome for restricted roles.
    #[must_use]
    pub const fn is_element_not_found(&self) -> bool {
        matches!(self, Self::ElementNotFound { .. })
    }

    /// Check whether this is a transition timeout signal.
    ///
    /// Access-control tests treat a never-completing navigation as the
    /// expected outcome for restricted roles.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Saturating millisecond count for error reporting
pub(crate) fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
