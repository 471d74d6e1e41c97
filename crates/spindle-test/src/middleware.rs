//! Canned middleware for pipeline tests.
//!
//! Every middleware here is generic over the pipeline's input and output
//! types, so the same helpers work for any `Pipeline<I, O>`.

use crate::error::TestError;
use crate::events::EventLog;
use spindle_core::{PipelineError, PipelineResult};
use spindle_middleware::{BoxFuture, Middleware, Next};

/// Logs `enter{label}`, calls `next`, then logs `exit{label}`.
#[derive(Debug, Clone)]
pub struct Recording {
    label: &'static str,
    log: EventLog,
}

/// Creates a [`Recording`] middleware writing to `log`.
#[must_use]
pub fn recording(label: &'static str, log: &EventLog) -> Recording {
    Recording {
        label,
        log: log.clone(),
    }
}

impl<I, O> Middleware<I, O> for Recording
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &'static str {
        self.label
    }

    fn process(&self, input: I, next: Next<I, O>) -> BoxFuture<'_, PipelineResult<O>> {
        Box::pin(async move {
            self.log.push(format!("enter{}", self.label));
            let output = next.run(input).await;
            self.log.push(format!("exit{}", self.label));
            output
        })
    }
}

/// Logs `label` and returns a fixed output without calling `next`.
#[derive(Debug, Clone)]
pub struct Terminal<O> {
    label: &'static str,
    log: EventLog,
    output: O,
}

/// Creates a [`Terminal`] middleware writing to `log`.
#[must_use]
pub fn terminal<O: Clone>(label: &'static str, log: &EventLog, output: O) -> Terminal<O> {
    Terminal {
        label,
        log: log.clone(),
        output,
    }
}

impl<I, O> Middleware<I, O> for Terminal<O>
where
    I: Send + 'static,
    O: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.label
    }

    fn process(&self, _input: I, _next: Next<I, O>) -> BoxFuture<'_, PipelineResult<O>> {
        self.log.push(self.label);
        let output = self.output.clone();
        Box::pin(async move { Ok(output) })
    }
}

/// Fails with [`TestError::Injected`] without calling `next`.
#[derive(Debug, Clone)]
pub struct Failing {
    label: &'static str,
    message: String,
}

/// Creates a [`Failing`] middleware.
#[must_use]
pub fn failing(label: &'static str, message: impl Into<String>) -> Failing {
    Failing {
        label,
        message: message.into(),
    }
}

impl<I, O> Middleware<I, O> for Failing
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &'static str {
        self.label
    }

    fn process(&self, _input: I, _next: Next<I, O>) -> BoxFuture<'_, PipelineResult<O>> {
        let error = TestError::Injected {
            label: self.label,
            message: self.message.clone(),
        };
        Box::pin(async move { Err(PipelineError::middleware(error)) })
    }
}

/// Calls `next` twice, returning the second result.
///
/// Used to exercise the single-continuation check.
#[derive(Debug, Clone, Copy)]
pub struct CallsNextTwice;

impl<I, O> Middleware<I, O> for CallsNextTwice
where
    I: Clone + Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &'static str {
        "calls_next_twice"
    }

    fn process(&self, input: I, next: Next<I, O>) -> BoxFuture<'_, PipelineResult<O>> {
        Box::pin(async move {
            next.run(input.clone()).await?;
            next.run(input).await
        })
    }
}
