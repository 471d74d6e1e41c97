//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait every pipeline stage
//! implements, and [`Next`], the continuation a middleware calls to run the
//! remainder of the chain.
//!
//! # Example
//!
//! ```ignore
//! use spindle_middleware::{BoxFuture, Middleware, Next};
//! use spindle_core::PipelineResult;
//!
//! struct Logging;
//!
//! impl Middleware<String, usize> for Logging {
//!     fn name(&self) -> &'static str {
//!         "logging"
//!     }
//!
//!     fn process(&self, input: String, next: Next<String, usize>) -> BoxFuture<'_, PipelineResult<usize>> {
//!         Box::pin(async move {
//!             tracing::info!(%input, "entering");
//!             let output = next.run(input).await;
//!             tracing::info!(?output, "leaving");
//!             output
//!         })
//!     }
//! }
//! ```

use crate::counter::Counter;
use spindle_core::{Context, PipelineResult};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core middleware trait.
///
/// A middleware receives the input and a [`Next`] continuation. It may
/// transform the input before calling `next.run(..)`, transform the result on
/// the way back out, or return without calling `next` at all to short-circuit
/// the chain.
///
/// # Invariants
///
/// - `next.run()` may be called at most once; a second call fails with
///   [`PipelineError::NextCalledMultipleTimes`](spindle_core::PipelineError)
/// - Errors returned by `next.run()` should be propagated, not swallowed,
///   unless the middleware exists to handle them
pub trait Middleware<I, O>: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs and introspection.
    fn name(&self) -> &'static str;

    /// Processes the input.
    fn process(&self, input: I, next: Next<I, O>) -> BoxFuture<'_, PipelineResult<O>>;
}

/// Continuation that runs the rest of the chain.
///
/// Besides running the chain, `Next` gives explicit access to the run's
/// [`Context`]. Middleware that prefers explicit parameters over ambient hooks
/// can read and write cells through [`Next::context`].
pub struct Next<I, O> {
    counter: Arc<Counter<I, O>>,
    index: usize,
}

impl<I, O> Next<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub(crate) fn new(counter: Arc<Counter<I, O>>, index: usize) -> Self {
        Self { counter, index }
    }

    /// Runs the remainder of the chain with `input`.
    pub fn run(&self, input: I) -> BoxFuture<'static, PipelineResult<O>> {
        self.counter.dispatch(self.index + 1, input)
    }

    /// Returns the context of the current run.
    pub fn context(&self) -> &Context {
        self.counter.context()
    }

    /// Returns the position of the middleware holding this continuation.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<I, O> fmt::Debug for Next<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("index", &self.index).finish_non_exhaustive()
    }
}

/// A middleware built from an async closure.
///
/// # Example
///
/// ```ignore
/// let timing = from_fn("timing", |input: Request, next: Next<Request, Response>| async move {
///     let start = Instant::now();
///     let response = next.run(input).await;
///     tracing::debug!(elapsed = ?start.elapsed(), "request finished");
///     response
/// });
/// ```
pub struct FnMiddleware<F, I, O> {
    name: &'static str,
    func: F,
    _marker: PhantomData<fn(I) -> O>,
}

/// Creates a middleware from an async closure taking the input and [`Next`].
pub fn from_fn<F, Fut, I, O>(name: &'static str, func: F) -> FnMiddleware<F, I, O>
where
    F: Fn(I, Next<I, O>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PipelineResult<O>> + Send + 'static,
{
    FnMiddleware {
        name,
        func,
        _marker: PhantomData,
    }
}

impl<F, Fut, I, O> Middleware<I, O> for FnMiddleware<F, I, O>
where
    F: Fn(I, Next<I, O>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PipelineResult<O>> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process(&self, input: I, next: Next<I, O>) -> BoxFuture<'_, PipelineResult<O>> {
        Box::pin((self.func)(input, next))
    }
}

impl<F, I, O> fmt::Debug for FnMiddleware<F, I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").field("name", &self.name).finish()
    }
}

/// A terminal middleware that produces the output without calling `next`.
pub struct Handler<F, I, O> {
    name: &'static str,
    func: F,
    _marker: PhantomData<fn(I) -> O>,
}

/// Creates a terminal middleware from an async closure taking only the input.
pub fn handler<F, Fut, I, O>(name: &'static str, func: F) -> Handler<F, I, O>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PipelineResult<O>> + Send + 'static,
{
    Handler {
        name,
        func,
        _marker: PhantomData,
    }
}

impl<F, Fut, I, O> Middleware<I, O> for Handler<F, I, O>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PipelineResult<O>> + Send + 'static,
    I: Send + 'static,
    O: Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process(&self, input: I, _next: Next<I, O>) -> BoxFuture<'_, PipelineResult<O>> {
        Box::pin((self.func)(input))
    }
}

impl<F, I, O> fmt::Debug for Handler<F, I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("name", &self.name).finish()
    }
}
