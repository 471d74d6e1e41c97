//! Onion dispatch chain.
//!
//! A [`Counter`] drives one run. It owns a dispatch callback that knows how
//! to invoke the middleware at a given index, and hands every invocation a
//! [`Next`] bound to that index. Calling [`Next::run`] dispatches the
//! following index, so each middleware decides whether, when, and with what
//! input the rest of the chain runs.
//!
//! The counter remembers the highest index dispatched so far. Dispatching an
//! index at or below that mark means some middleware called `next` twice, and
//! fails with [`PipelineError::NextCalledMultipleTimes`].

use crate::middleware::{BoxFuture, Next};
use spindle_core::{Context, PipelineError, PipelineResult};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Callback invoked for every dispatched index.
pub type DispatchFn<I, O> =
    dyn Fn(usize, I, Next<I, O>) -> BoxFuture<'static, PipelineResult<O>> + Send + Sync;

/// Dispatch state for a single run.
pub struct Counter<I, O> {
    callback: Box<DispatchFn<I, O>>,
    context: Context,
    /// Highest dispatched index plus one; zero until `start`.
    high_water: AtomicUsize,
}

impl<I, O> Counter<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates a counter for a run against `context`.
    pub fn new<F>(context: Context, callback: F) -> Arc<Self>
    where
        F: Fn(usize, I, Next<I, O>) -> BoxFuture<'static, PipelineResult<O>>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self {
            callback: Box::new(callback),
            context,
            high_water: AtomicUsize::new(0),
        })
    }

    /// Dispatches index 0.
    pub fn start(self: &Arc<Self>, input: I) -> BoxFuture<'static, PipelineResult<O>> {
        self.dispatch(0, input)
    }

    /// Invokes the callback for `index` with a continuation bound to it.
    pub fn dispatch(self: &Arc<Self>, index: usize, input: I) -> BoxFuture<'static, PipelineResult<O>> {
        let mark = index + 1;
        let previous = self.high_water.fetch_max(mark, Ordering::AcqRel);
        if previous >= mark {
            tracing::debug!(index, "next() called more than once");
            return Box::pin(async move { Err(PipelineError::NextCalledMultipleTimes { index }) });
        }

        let next = Next::new(Arc::clone(self), index);
        (self.callback)(index, input, next)
    }

    /// Returns the context this run writes to.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Returns the highest index dispatched so far.
    pub fn dispatched(&self) -> Option<usize> {
        self.high_water.load(Ordering::Acquire).checked_sub(1)
    }
}

impl<I, O> fmt::Debug for Counter<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("high_water", &self.high_water.load(Ordering::Relaxed))
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
