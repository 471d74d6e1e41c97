//! Ordered middleware pipeline.
//!
//! A [`Pipeline`] holds an ordered list of middleware, a default [`Context`],
//! and an optional terminal handler (`on_last`). Running it dispatches the
//! first middleware; each middleware decides whether to continue by calling
//! [`Next::run`]. When the chain runs off the end, `on_last` produces the
//! output, and without one the run fails with
//! [`PipelineError::IncompleteChain`].
//!
//! Every run snapshots the middleware list. Adding middleware later only
//! affects later runs (or is rejected outright with
//! [`PipelineOptions::seal_after_run`]).
//!
//! # Example
//!
//! ```ignore
//! let mut pipeline = Pipeline::<u32, u32>::builder()
//!     .name("doubler")
//!     .default_output(0)
//!     .build();
//!
//! pipeline.add(from_fn("double", |n: u32, next: Next<u32, u32>| async move {
//!     next.run(n * 2).await
//! }))?;
//!
//! let output = pipeline.run(21).await?;
//! ```

use crate::counter::Counter;
use crate::hooks::{context_hooks, ContextHooks, RunHooks};
use crate::middleware::{BoxFuture, Middleware};
use metrics::SharedString;
use serde::{Deserialize, Serialize};
use spindle_core::names;
use spindle_core::{Context, PipelineError, PipelineResult};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware<I, O> = Arc<dyn Middleware<I, O>>;

/// Terminal handler invoked when every middleware called `next`.
pub type OnLast<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, PipelineResult<O>> + Send + Sync>;

const DEFAULT_NAME: &str = "pipeline";

fn boxed_on_last<F, Fut, I, O>(func: F) -> OnLast<I, O>
where
    I: 'static,
    O: 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PipelineResult<O>> + Send + 'static,
{
    Arc::new(move |input: I| -> BoxFuture<'static, PipelineResult<O>> { Box::pin(func(input)) })
}

fn constant_output<I, O>(value: O) -> OnLast<I, O>
where
    I: 'static,
    O: Clone + Send + Sync + 'static,
{
    boxed_on_last(move |_input: I| {
        let value = value.clone();
        async move { Ok(value) }
    })
}

/// Behavior switches for a [`Pipeline`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOptions {
    /// Reject [`Pipeline::add`] once the pipeline has run.
    pub seal_after_run: bool,

    /// Give each run without an explicit context a fresh fork of the
    /// pipeline's default context instead of the shared one.
    pub fresh_context_per_run: bool,
}

impl PipelineOptions {
    /// Sets `seal_after_run`.
    #[must_use]
    pub const fn sealed(mut self, seal: bool) -> Self {
        self.seal_after_run = seal;
        self
    }

    /// Sets `fresh_context_per_run`.
    #[must_use]
    pub const fn fresh_context(mut self, fresh: bool) -> Self {
        self.fresh_context_per_run = fresh;
        self
    }
}

/// Per-run overrides for [`Pipeline::run_with`].
pub struct RunOptions<I, O> {
    context: Option<Context>,
    on_last: Option<OnLast<I, O>>,
}

impl<I, O> RunOptions<I, O> {
    /// Creates empty options; the pipeline's defaults apply.
    pub fn new() -> Self {
        Self {
            context: None,
            on_last: None,
        }
    }

    /// Runs against `context` instead of the pipeline's default context.
    #[must_use]
    pub fn context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    /// Uses `func` as the terminal handler for this run only.
    #[must_use]
    pub fn on_last<F, Fut>(mut self, func: F) -> Self
    where
        I: 'static,
        O: 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PipelineResult<O>> + Send + 'static,
    {
        self.on_last = Some(boxed_on_last(func));
        self
    }

    /// Returns `value` from this run if the chain runs off the end.
    #[must_use]
    pub fn default_output(mut self, value: O) -> Self
    where
        I: 'static,
        O: Clone + Send + Sync + 'static,
    {
        self.on_last = Some(constant_output(value));
        self
    }
}

impl<I, O> Default for RunOptions<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> fmt::Debug for RunOptions<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("context", &self.context)
            .field("on_last", &self.on_last.is_some())
            .finish()
    }
}

/// An ordered chain of middleware.
pub struct Pipeline<I, O> {
    name: Arc<str>,
    middlewares: Arc<Vec<BoxedMiddleware<I, O>>>,
    context: Context,
    on_last: Option<OnLast<I, O>>,
    options: PipelineOptions,
    has_run: AtomicBool,
}

impl<I, O> Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates an empty pipeline with a fresh default context.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates an empty pipeline with the given options.
    pub fn with_options(options: PipelineOptions) -> Self {
        Self::builder().options(options).build()
    }

    /// Creates a builder.
    pub fn builder() -> PipelineBuilder<I, O> {
        PipelineBuilder::new()
    }

    /// Appends a middleware to the end of the chain.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AddAfterRun`] if the pipeline is sealed and
    /// has already run.
    pub fn add<M>(&mut self, middleware: M) -> PipelineResult<&mut Self>
    where
        M: Middleware<I, O>,
    {
        self.add_boxed(Arc::new(middleware))
    }

    /// Appends an already boxed middleware.
    ///
    /// # Errors
    ///
    /// Same as [`Pipeline::add`].
    pub fn add_boxed(&mut self, middleware: BoxedMiddleware<I, O>) -> PipelineResult<&mut Self> {
        if self.options.seal_after_run && self.has_run() {
            tracing::warn!(
                pipeline = %self.name,
                middleware = middleware.name(),
                "rejected middleware added after the pipeline ran"
            );
            return Err(PipelineError::AddAfterRun);
        }

        tracing::trace!(pipeline = %self.name, middleware = middleware.name(), "middleware added");
        Arc::make_mut(&mut self.middlewares).push(middleware);
        Ok(self)
    }

    /// Runs the pipeline against its default context.
    pub fn run(&self, input: I) -> impl Future<Output = PipelineResult<O>> + Send + 'static {
        self.run_with(input, RunOptions::new())
    }

    /// Runs the pipeline with per-run overrides.
    pub fn run_with(
        &self,
        input: I,
        options: RunOptions<I, O>,
    ) -> impl Future<Output = PipelineResult<O>> + Send + 'static {
        let context = options.context.unwrap_or_else(|| self.run_context());
        let mut runner = self.runner(context);
        if let Some(on_last) = options.on_last {
            runner.on_last = Some(on_last);
        }
        runner.into_run(input)
    }

    /// Returns a runner bound to `context`.
    ///
    /// The runner holds a snapshot of the current middleware list.
    pub fn runner(&self, context: Context) -> Runner<I, O> {
        self.has_run.store(true, Ordering::Release);
        Runner {
            name: Arc::clone(&self.name),
            middlewares: Arc::clone(&self.middlewares),
            on_last: self.on_last.clone(),
            context,
        }
    }

    fn run_context(&self) -> Context {
        if self.options.fresh_context_per_run {
            self.context.fork()
        } else {
            self.context.clone()
        }
    }
}

impl<I, O> Pipeline<I, O>
where
    I: 'static,
    O: 'static,
{
    /// Returns the pipeline name used in logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of middleware in the chain.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns true if no middleware has been added.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Returns the middleware names in dispatch order.
    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Returns true once a runner has been created.
    pub fn has_run(&self) -> bool {
        self.has_run.load(Ordering::Acquire)
    }

    /// Returns the default context.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Returns the pipeline options.
    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Returns true if a terminal handler is configured.
    pub fn has_on_last(&self) -> bool {
        self.on_last.is_some()
    }
}

impl<I, O> Default for Pipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> fmt::Debug for Pipeline<I, O>
where
    I: 'static,
    O: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("middlewares", &self.middleware_names())
            .field("options", &self.options)
            .field("has_run", &self.has_run())
            .finish_non_exhaustive()
    }
}

/// A pipeline snapshot bound to one context.
///
/// Produced by [`Pipeline::runner`] and
/// [`use_pipeline`](crate::hooks::use_pipeline).
pub struct Runner<I, O> {
    name: Arc<str>,
    middlewares: Arc<Vec<BoxedMiddleware<I, O>>>,
    on_last: Option<OnLast<I, O>>,
    context: Context,
}

impl<I, O> Runner<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Runs the snapshot with `input`.
    pub fn run(&self, input: I) -> impl Future<Output = PipelineResult<O>> + Send + 'static {
        self.clone().into_run(input)
    }

    /// Returns the context this runner writes to.
    pub fn context(&self) -> &Context {
        &self.context
    }

    fn into_run(self, input: I) -> impl Future<Output = PipelineResult<O>> + Send + 'static {
        let Self {
            name,
            middlewares,
            on_last,
            context,
        } = self;
        let depth = middlewares.len();
        let hooks: Arc<dyn ContextHooks> = Arc::new(RunHooks::new(context.clone()));
        let dispatch_name = Arc::clone(&name);
        let label = SharedString::from(Arc::clone(&name));
        let dispatch_label = label.clone();

        let counter = Counter::new(
            context,
            move |index, input, next| -> BoxFuture<'static, PipelineResult<O>> {
                let hooks = Arc::clone(&hooks);

                if let Some(middleware) = middlewares.get(index) {
                    let middleware = Arc::clone(middleware);
                    tracing::trace!(
                        pipeline = %dispatch_name,
                        index,
                        middleware = middleware.name(),
                        "dispatching middleware"
                    );
                    metrics::counter!(
                        names::MIDDLEWARE_DISPATCH_TOTAL,
                        "pipeline" => dispatch_label.clone()
                    )
                    .increment(1);
                    return Box::pin(context_hooks().scope(hooks, async move {
                        middleware.process(input, next).await
                    }));
                }

                if let Some(on_last) = &on_last {
                    tracing::trace!(pipeline = %dispatch_name, index, "running terminal handler");
                    return Box::pin(context_hooks().scope(hooks, on_last(input)));
                }

                tracing::debug!(pipeline = %dispatch_name, index, "chain ran off the end");
                Box::pin(async move { Err(PipelineError::IncompleteChain { index }) })
            },
        );

        async move {
            let started = Instant::now();
            tracing::debug!(pipeline = %name, middlewares = depth, "pipeline run started");

            let result = counter.start(input).await;

            let outcome = match &result {
                Ok(_) => "ok",
                Err(err) => err.kind(),
            };
            let elapsed = started.elapsed();
            metrics::counter!(
                names::PIPELINE_RUNS_TOTAL,
                "pipeline" => label.clone(),
                "outcome" => outcome
            )
            .increment(1);
            metrics::histogram!(
                names::PIPELINE_RUN_DURATION_SECONDS,
                "pipeline" => label
            )
            .record(elapsed.as_secs_f64());
            tracing::debug!(pipeline = %name, outcome, ?elapsed, "pipeline run finished");

            result
        }
    }
}

impl<I, O> Clone for Runner<I, O> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            middlewares: Arc::clone(&self.middlewares),
            on_last: self.on_last.clone(),
            context: self.context.clone(),
        }
    }
}

impl<I, O> fmt::Debug for Runner<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("name", &self.name)
            .field("middlewares", &self.middlewares.len())
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder<I, O> {
    name: Option<String>,
    middlewares: Vec<BoxedMiddleware<I, O>>,
    context: Option<Context>,
    on_last: Option<OnLast<I, O>>,
    options: PipelineOptions,
}

impl<I, O> PipelineBuilder<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Creates a builder with no middleware and default options.
    pub fn new() -> Self {
        Self {
            name: None,
            middlewares: Vec::new(),
            context: None,
            on_last: None,
            options: PipelineOptions::default(),
        }
    }

    /// Sets the name used in logs and metrics.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the pipeline options.
    #[must_use]
    pub fn options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the default context.
    #[must_use]
    pub fn context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    /// Appends a middleware.
    #[must_use]
    pub fn add<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<I, O>,
    {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Sets the terminal handler.
    #[must_use]
    pub fn on_last<F, Fut>(mut self, func: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PipelineResult<O>> + Send + 'static,
    {
        self.on_last = Some(boxed_on_last(func));
        self
    }

    /// Sets a terminal handler that always returns `value`.
    #[must_use]
    pub fn default_output(mut self, value: O) -> Self
    where
        O: Clone + Sync,
    {
        self.on_last = Some(constant_output(value));
        self
    }

    /// Builds the pipeline.
    pub fn build(self) -> Pipeline<I, O> {
        let name: Arc<str> = self.name.as_deref().unwrap_or(DEFAULT_NAME).into();
        Pipeline {
            name,
            middlewares: Arc::new(self.middlewares),
            context: self.context.unwrap_or_default(),
            on_last: self.on_last,
            options: self.options,
            has_run: AtomicBool::new(false),
        }
    }
}

impl<I, O> Default for PipelineBuilder<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I, O> fmt::Debug for PipelineBuilder<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("middlewares", &self.middlewares.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
