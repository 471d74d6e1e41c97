//! Test error types.

use std::fmt;

/// Errors raised by the canned test middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestError {
    /// A deliberately injected failure
    Injected {
        /// Label of the middleware that failed
        label: &'static str,
        /// Failure message
        message: String,
    },
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Injected { label, message } => write!(f, "Injected failure in {label}: {message}"),
        }
    }
}

impl std::error::Error for TestError {}
