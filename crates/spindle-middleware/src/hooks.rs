//! Ambient access to the running pipeline's context.
//!
//! While a middleware (or a terminal handler) is being polled, the pipeline
//! installs the run's [`Context`] in a process-wide [`HookRegistry`]. Code
//! called from that middleware, however deep, can then reach the context
//! without it being passed as a parameter:
//!
//! ```ignore
//! async fn current_user() -> PipelineResult<String> {
//!     Ok(use_cell_value(&USER)?)
//! }
//! ```
//!
//! Outside a run every hook fails with [`HookError::OutOfScope`].
//!
//! The registry binds the table to the polled future, not to the thread, so
//! concurrent runs on a multi-threaded runtime each see their own context.
//! Middleware that wants no ambient state at all can use
//! [`Next::context`](crate::Next::context) instead.

use crate::pipeline::{Pipeline, Runner};
use spindle_core::{Cell, Context, HookError, HookRegistry, Scoped};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};

/// The hook family installed by pipeline runs.
///
/// The default method is the out-of-scope behavior.
pub trait ContextHooks: Send + Sync {
    /// Returns the context of the current run.
    fn use_context(&self) -> Result<Context, HookError> {
        Err(HookError::out_of_scope("use_context"))
    }
}

/// Table used when no run is active.
struct Unscoped;

impl ContextHooks for Unscoped {}

/// Table installed for the duration of one run.
pub(crate) struct RunHooks {
    context: Context,
}

impl RunHooks {
    pub(crate) fn new(context: Context) -> Self {
        Self { context }
    }
}

impl ContextHooks for RunHooks {
    fn use_context(&self) -> Result<Context, HookError> {
        Ok(self.context.clone())
    }
}

static CONTEXT_HOOKS: OnceLock<HookRegistry<dyn ContextHooks>> = OnceLock::new();

/// Returns the registry that pipelines install their context into.
pub fn context_hooks() -> &'static HookRegistry<dyn ContextHooks> {
    CONTEXT_HOOKS.get_or_init(|| HookRegistry::new(Arc::new(Unscoped)))
}

fn current_context(hook: &'static str) -> Result<Context, HookError> {
    context_hooks()
        .current()
        .use_context()
        .map_err(|_| HookError::out_of_scope(hook))
}

/// Returns the context of the running pipeline.
pub fn use_context() -> Result<Context, HookError> {
    current_context("use_context")
}

/// Returns the value of `cell` in the running pipeline's context.
pub fn use_cell_value<T>(cell: &Cell<T>) -> Result<T, HookError>
where
    T: Clone + Send + Sync + 'static,
{
    Ok(current_context("use_cell_value")?.read(cell))
}

/// Returns a read/write handle to `cell` in the running pipeline's context.
pub fn use_cell<T>(cell: &Cell<T>) -> Result<CellRef<T>, HookError>
where
    T: Clone + Send + Sync + 'static,
{
    Ok(CellRef {
        context: current_context("use_cell")?,
        cell: cell.clone(),
    })
}

/// Returns a runner for `pipeline` bound to the running pipeline's context.
///
/// Writes made by the inner pipeline are visible to the caller once the
/// inner run completes.
pub fn use_pipeline<I, O>(pipeline: &Pipeline<I, O>) -> Result<Runner<I, O>, HookError>
where
    I: Send + 'static,
    O: Send + 'static,
{
    Ok(pipeline.runner(current_context("use_pipeline")?))
}

/// Calls `f` with `context` installed as the ambient context.
///
/// Useful for exercising ambient code outside a pipeline.
pub fn with_context<R>(context: &Context, f: impl FnOnce() -> R) -> R {
    context_hooks().run(Arc::new(RunHooks::new(context.clone())), f)
}

/// Wraps `future` so that `context` is the ambient context while it is polled.
pub fn scope_context<F>(context: &Context, future: F) -> Scoped<dyn ContextHooks, F>
where
    F: Future,
{
    context_hooks().scope(Arc::new(RunHooks::new(context.clone())), future)
}

/// Getter/setter pair for one cell in one context.
pub struct CellRef<T> {
    context: Context,
    cell: Cell<T>,
}

impl<T> CellRef<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Reads the current value.
    pub fn get(&self) -> T {
        self.context.read(&self.cell)
    }

    /// Replaces the current value.
    pub fn set(&self, value: T) {
        self.context.write(&self.cell, value);
    }

    /// Applies `f` to the current value and stores the result.
    pub fn update(&self, f: impl FnMut(&T) -> T) -> T {
        self.context.update(&self.cell, f)
    }

    /// Returns the context this handle writes to.
    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl<T> Clone for CellRef<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            cell: self.cell.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CellRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellRef")
            .field("cell", &self.cell)
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hooks_fail_outside_scope() {
        let cell = Cell::new(0_u8);

        assert_eq!(
            use_context().unwrap_err(),
            HookError::OutOfScope { hook: "use_context" }
        );
        assert_eq!(
            use_cell_value(&cell).unwrap_err(),
            HookError::OutOfScope { hook: "use_cell_value" }
        );
        assert_eq!(
            use_cell(&cell).unwrap_err(),
            HookError::OutOfScope { hook: "use_cell" }
        );
    }

    #[test]
    fn test_use_pipeline_fails_outside_scope() {
        let pipeline: Pipeline<u8, u8> = Pipeline::new();
        assert_eq!(
            use_pipeline(&pipeline).unwrap_err(),
            HookError::OutOfScope { hook: "use_pipeline" }
        );
        assert!(!pipeline.has_run());
    }

    #[test]
    fn test_with_context_resolves_hooks() {
        let cell = Cell::new("guest".to_string());
        let context = Context::new();
        context.write(&cell, "admin".to_string());

        let value = with_context(&context, || use_cell_value(&cell)).unwrap();
        assert_eq!(value, "admin");
        assert!(use_context().is_err());
    }

    #[test]
    fn test_cell_ref_reads_and_writes() {
        let cell = Cell::new(1_u32);
        let context = Context::new();

        with_context(&context, || {
            let counter = use_cell(&cell).unwrap();
            assert_eq!(counter.get(), 1);
            counter.set(5);
            assert_eq!(counter.update(|n| n * 2), 10);
        });

        assert_eq!(context.read(&cell), 10);
    }

    #[test]
    fn test_cell_ref_update_reads_ambient_context() {
        let total = Cell::new(1_u32);
        let step = Cell::new(3_u32);
        let context = Context::new();

        let result = with_context(&context, || {
            let total = use_cell(&total).unwrap();
            total.update(|n| n + use_cell_value(&step).unwrap());
            total.update(|n| {
                assert!(format!("{:?}", use_context().unwrap()).contains("Context"));
                n * 10
            })
        });

        assert_eq!(result, 40);
        assert_eq!(context.read(&total), 40);
    }

    #[tokio::test]
    async fn test_cell_ref_update_inside_pipeline_reads_other_cells() {
        let total = Cell::named("total", 0_u32);
        let step = Cell::named("step", 2_u32);

        let (t, s) = (total.clone(), step.clone());
        let pipeline: Pipeline<(), u32> = Pipeline::builder()
            .add(crate::middleware::handler("accumulate", move |()| {
                let (total, step) = (t.clone(), s.clone());
                async move {
                    let total = use_cell(&total)?;
                    Ok::<_, spindle_core::PipelineError>(
                        total.update(|n| n + use_cell_value(&step).unwrap_or_default()),
                    )
                }
            }))
            .build();

        assert_eq!(pipeline.run(()).await.unwrap(), 2);
        assert_eq!(pipeline.run(()).await.unwrap(), 4);
        assert_eq!(pipeline.context().read(&total), 4);
    }

    #[test]
    fn test_nested_with_context_restores_outer() {
        let cell = Cell::new(0_i32);
        let outer = Context::new();
        let inner = Context::new();
        outer.write(&cell, 1);
        inner.write(&cell, 2);

        with_context(&outer, || {
            assert_eq!(with_context(&inner, || use_cell_value(&cell)).unwrap(), 2);
            assert_eq!(use_cell_value(&cell).unwrap(), 1);
        });
    }

    #[tokio::test]
    async fn test_scope_context_spans_awaits() {
        let cell = Cell::new(0_u64);
        let context = Context::new();
        context.write(&cell, 77);

        let cell_in_scope = cell.clone();
        let value = scope_context(&context, async move {
            tokio::task::yield_now().await;
            use_cell_value(&cell_in_scope)
        })
        .await
        .unwrap();

        assert_eq!(value, 77);
        assert!(use_cell_value(&cell).is_err());
    }
}
