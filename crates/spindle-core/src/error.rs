//! Error types for Spindle.
//!
//! [`PipelineError`] is the single error type surfaced by pipeline runs. It
//! separates contract violations (programmer errors such as calling `next`
//! twice), configuration errors (a chain with no terminal handler) and errors
//! raised by user middleware, which pass through untouched.

use thiserror::Error;

/// Result type alias using [`PipelineError`].
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors raised by ambient hooks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    /// A hook was called with no active scope.
    #[error("{hook}() was used out of scope: ambient hooks are only available while a pipeline middleware is running")]
    OutOfScope {
        /// Name of the hook that was called.
        hook: &'static str,
    },
}

impl HookError {
    /// Creates an out-of-scope error for the named hook.
    #[must_use]
    pub const fn out_of_scope(hook: &'static str) -> Self {
        Self::OutOfScope { hook }
    }
}

/// Errors that can occur while building or running a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A middleware invoked its continuation more than once.
    #[error("Called next() multiple times (dispatch index {index})")]
    NextCalledMultipleTimes {
        /// The index that was dispatched a second time.
        index: usize,
    },

    /// Every middleware called `next` and no terminal handler was configured.
    #[error("Expect returning a value, but all middlewares just calling next() (ran off the end at index {index})")]
    IncompleteChain {
        /// The index one past the last middleware.
        index: usize,
    },

    /// Middleware was added to a sealed pipeline that has already run.
    #[error("Can't add middleware after running")]
    AddAfterRun,

    /// An ambient hook failed.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// An error raised by user middleware.
    #[error(transparent)]
    Middleware(#[from] anyhow::Error),
}

impl PipelineError {
    /// Wraps any error raised by user code.
    pub fn middleware<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Middleware(anyhow::Error::new(error))
    }

    /// Creates a user middleware error from a message.
    pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Middleware(anyhow::Error::msg(message))
    }

    /// Returns `true` for programmer errors in how the engine was used.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::NextCalledMultipleTimes { .. } | Self::AddAfterRun | Self::Hook(_)
        )
    }

    /// Returns the short label used in logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NextCalledMultipleTimes { .. } => "next_called_multiple_times",
            Self::IncompleteChain { .. } => "incomplete_chain",
            Self::AddAfterRun => "add_after_run",
            Self::Hook(_) => "hook_out_of_scope",
            Self::Middleware(_) => "middleware",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("teapot")]
    struct Teapot;

    #[test]
    fn test_next_called_twice_message() {
        let err = PipelineError::NextCalledMultipleTimes { index: 2 };
        assert!(err.to_string().starts_with("Called next() multiple times"));
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_incomplete_chain_message() {
        let err = PipelineError::IncompleteChain { index: 0 };
        assert!(err
            .to_string()
            .starts_with("Expect returning a value, but all middlewares just calling next()"));
        assert!(!err.is_contract_violation());
        assert_eq!(err.kind(), "incomplete_chain");
    }

    #[test]
    fn test_hook_error_converts() {
        let err: PipelineError = HookError::out_of_scope("use_context").into();
        assert!(err.to_string().contains("use_context() was used out of scope"));
        assert_eq!(err.kind(), "hook_out_of_scope");
    }

    #[test]
    fn test_middleware_error_is_transparent() {
        let err = PipelineError::middleware(Teapot);
        assert_eq!(err.to_string(), "teapot");

        match err {
            PipelineError::Middleware(inner) => assert!(inner.downcast_ref::<Teapot>().is_some()),
            other => panic!("Expected middleware error, got {other:?}"),
        }
    }

    #[test]
    fn test_add_after_run_message() {
        assert_eq!(
            PipelineError::AddAfterRun.to_string(),
            "Can't add middleware after running"
        );
    }
}
