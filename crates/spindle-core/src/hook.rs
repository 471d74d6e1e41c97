//! Scoped hook registry.
//!
//! A hook family is a trait whose default methods describe the out-of-scope
//! behavior (normally returning [`HookError::OutOfScope`](crate::HookError)).
//! A [`HookRegistry`] holds the default table and lets callers install an
//! implementation for the extent of a call ([`HookRegistry::run`]) or of a
//! future ([`HookRegistry::scope`]). Code anywhere below that call resolves
//! hooks through [`HookRegistry::current`] without receiving them as
//! parameters.
//!
//! Activations are kept on a thread-local stack. Async scopes install their
//! table around every `poll` and remove it before returning, so the table
//! follows the logical task when it migrates between worker threads and is
//! never observed by another task polled on the same thread.
//!
//! # Example
//!
//! ```
//! use spindle_core::hook::HookRegistry;
//! use std::sync::Arc;
//!
//! trait Locale: Send + Sync {
//!     fn language(&self) -> Option<&'static str> {
//!         None
//!     }
//! }
//!
//! struct Unscoped;
//! impl Locale for Unscoped {}
//!
//! struct French;
//! impl Locale for French {
//!     fn language(&self) -> Option<&'static str> {
//!         Some("fr")
//!     }
//! }
//!
//! let registry: HookRegistry<dyn Locale> = HookRegistry::new(Arc::new(Unscoped));
//!
//! assert_eq!(registry.current().language(), None);
//! let inside = registry.run(Arc::new(French), || registry.current().language());
//! assert_eq!(inside, Some("fr"));
//! assert_eq!(registry.current().language(), None);
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a registry; activations are matched against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RegistryId(u64);

/// Type-erased `Arc<H>` for some registry's `H`.
type ErasedHooks = Arc<dyn Any + Send + Sync>;

/// One installed table. `hooks` always holds an `Arc<H>` for the registry's `H`.
struct Activation {
    registry: RegistryId,
    hooks: ErasedHooks,
}

thread_local! {
    static ACTIVE: RefCell<Vec<Activation>> = const { RefCell::new(Vec::new()) };
}

/// Restores the activation stack to its previous depth on drop.
///
/// Dropping also happens during unwinding, so a panicking callback never
/// leaves its table installed.
struct ActivationGuard {
    depth: usize,
}

impl Drop for ActivationGuard {
    fn drop(&mut self) {
        // The thread-local may already be gone during thread teardown.
        let _ = ACTIVE.try_with(|stack| stack.borrow_mut().truncate(self.depth));
    }
}

fn activate(registry: RegistryId, hooks: ErasedHooks) -> ActivationGuard {
    ACTIVE.with(|stack| {
        let mut stack = stack.borrow_mut();
        let depth = stack.len();
        stack.push(Activation { registry, hooks });
        ActivationGuard { depth }
    })
}

/// A family of hooks with a default table and scoped overrides.
///
/// `H` is usually a trait object such as `dyn MyHooks`.
pub struct HookRegistry<H: ?Sized> {
    id: RegistryId,
    defaults: Arc<H>,
}

impl<H> HookRegistry<H>
where
    H: ?Sized + Send + Sync + 'static,
{
    /// Creates a registry whose out-of-scope behavior is `defaults`.
    #[must_use]
    pub fn new(defaults: Arc<H>) -> Self {
        Self {
            id: RegistryId(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed)),
            defaults,
        }
    }

    /// Returns the default (out-of-scope) table.
    #[must_use]
    pub fn defaults(&self) -> Arc<H> {
        Arc::clone(&self.defaults)
    }

    /// Returns the innermost active table for this registry, or the defaults.
    #[must_use]
    pub fn current(&self) -> Arc<H> {
        let active = ACTIVE.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find(|activation| activation.registry == self.id)
                .and_then(|activation| activation.hooks.downcast_ref::<Arc<H>>().cloned())
        });

        active.unwrap_or_else(|| self.defaults())
    }

    /// Returns `true` if a table from this registry is installed on this thread.
    #[must_use]
    pub fn is_active(&self) -> bool {
        ACTIVE.with(|stack| {
            stack
                .borrow()
                .iter()
                .any(|activation| activation.registry == self.id)
        })
    }

    /// Calls `f` with the current table.
    pub fn with<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        let hooks = self.current();
        f(&hooks)
    }

    /// Installs `hooks`, calls `f`, and restores the previous table.
    ///
    /// The previous table is restored whether `f` returns or panics; its
    /// return value (including any `Err`) is passed through unchanged.
    pub fn run<R>(&self, hooks: Arc<H>, f: impl FnOnce() -> R) -> R {
        let _guard = activate(self.id, Arc::new(hooks));
        f()
    }

    /// Wraps `future` so that `hooks` is installed while it is being polled.
    pub fn scope<F>(&self, hooks: Arc<H>, future: F) -> Scoped<H, F>
    where
        F: Future,
    {
        Scoped {
            registry: self.id,
            hooks: Arc::new(hooks),
            inner: Box::pin(future),
            _table: PhantomData,
        }
    }
}

impl<H: ?Sized> fmt::Debug for HookRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("id", &self.id.0)
            .finish_non_exhaustive()
    }
}

/// Future returned by [`HookRegistry::scope`].
#[must_use = "futures do nothing unless polled"]
pub struct Scoped<H: ?Sized, F> {
    registry: RegistryId,
    /// Erased once here and re-installed by reference count on every poll.
    hooks: ErasedHooks,
    inner: Pin<Box<F>>,
    _table: PhantomData<Arc<H>>,
}

impl<H, F> Future for Scoped<H, F>
where
    H: ?Sized + Send + Sync + 'static,
    F: Future,
{
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let _guard = activate(this.registry, Arc::clone(&this.hooks));
        this.inner.as_mut().poll(cx)
    }
}

impl<H: ?Sized, F> fmt::Debug for Scoped<H, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scoped")
            .field("registry", &self.registry.0)
            .finish_non_exhaustive()
    }
}
