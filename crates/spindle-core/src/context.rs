//! The per-run cell store.
//!
//! A [`Context`] maps [`CellId`]s to bound values. Reading a cell that has no
//! binding yields the cell's own default, so a context never needs to be
//! pre-populated.
//!
//! `Context` is a handle: clones share the same store. This is what lets an
//! inner pipeline write into the context of the run that invoked it.
//!
//! # Example
//!
//! ```
//! use spindle_core::{Cell, Context};
//!
//! let theme = Cell::new("light".to_string());
//! let ctx = Context::new();
//!
//! assert_eq!(ctx.read(&theme), "light");
//! ctx.write(&theme, "dark".to_string());
//! assert_eq!(ctx.read(&theme), "dark");
//! ```

use crate::cell::{BoundCell, Cell, CellId};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A stored binding.
#[derive(Clone)]
struct Binding {
    label: Option<&'static str>,
    value: Arc<dyn Any + Send + Sync>,
}

impl From<BoundCell> for Binding {
    fn from(cell: BoundCell) -> Self {
        Self {
            label: cell.label,
            value: cell.value,
        }
    }
}

/// Mutable cell store shared by every handle cloned from it.
///
/// # Thread Safety
///
/// The map sits behind a `parking_lot::RwLock`, so a context may be read and
/// written from nested pipelines running on different worker threads.
#[derive(Clone, Default)]
pub struct Context {
    bindings: Arc<RwLock<HashMap<CellId, Binding>>>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context seeded with the given bindings.
    ///
    /// Later bindings for the same slot replace earlier ones.
    ///
    /// ```
    /// use spindle_core::{Cell, Context};
    ///
    /// let user = Cell::new(String::new());
    /// let depth = Cell::new(0_u8);
    ///
    /// let ctx = Context::from_cells([
    ///     user.create("ada".to_string()).bind(),
    ///     depth.create(3).bind(),
    /// ]);
    ///
    /// assert_eq!(ctx.read(&user), "ada");
    /// assert_eq!(ctx.read(&depth), 3);
    /// ```
    pub fn from_cells<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = BoundCell>,
    {
        let bindings = cells
            .into_iter()
            .map(|cell| (cell.id, Binding::from(cell)))
            .collect();

        Self {
            bindings: Arc::new(RwLock::new(bindings)),
        }
    }

    /// Creates a builder for seeding a context.
    #[must_use]
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Reads the value bound to `cell`, or the cell's default.
    pub fn read<T>(&self, cell: &Cell<T>) -> T
    where
        T: Clone + Send + Sync + 'static,
    {
        (*self.read_shared(cell)).clone()
    }

    /// Reads the value bound to `cell` without cloning it.
    pub fn read_shared<T>(&self, cell: &Cell<T>) -> Arc<T>
    where
        T: Send + Sync + 'static,
    {
        let bound = self
            .bindings
            .read()
            .get(&cell.id())
            .and_then(|binding| Arc::clone(&binding.value).downcast::<T>().ok());

        bound.unwrap_or_else(|| cell.shared_value())
    }

    /// Binds `value` to `cell`, replacing any previous binding.
    pub fn write<T>(&self, cell: &Cell<T>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.insert(cell.create(value).bind());
    }

    /// Stores a pre-built binding.
    pub fn insert(&self, cell: BoundCell) {
        self.bindings.write().insert(cell.id, Binding::from(cell));
    }

    /// Replaces the value of `cell` with `f(current)`.
    ///
    /// `f` runs without any lock held, so it may read or write this context.
    /// The result is committed only if the binding did not change while `f`
    /// ran; otherwise `f` is called again with the newer value. Concurrent
    /// updates of one cell therefore never lose an increment.
    ///
    /// Returns the new value.
    pub fn update<T, F>(&self, cell: &Cell<T>, mut f: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut(&T) -> T,
    {
        let id = cell.id();
        loop {
            let snapshot = self
                .bindings
                .read()
                .get(&id)
                .map(|binding| Arc::clone(&binding.value));

            let current = snapshot
                .clone()
                .and_then(|value| value.downcast::<T>().ok())
                .unwrap_or_else(|| cell.shared_value());
            let next = f(&current);

            let mut bindings = self.bindings.write();
            let unchanged = match (bindings.get(&id), &snapshot) {
                (Some(binding), Some(seen)) => Arc::ptr_eq(&binding.value, seen),
                (None, None) => true,
                _ => false,
            };
            if unchanged {
                bindings.insert(
                    id,
                    Binding {
                        label: cell.label(),
                        value: Arc::new(next.clone()),
                    },
                );
                return next;
            }
        }
    }

    /// Returns `true` if `cell` has an explicit binding.
    #[must_use]
    pub fn contains<T>(&self, cell: &Cell<T>) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.bindings.read().contains_key(&cell.id())
    }

    /// Removes the binding for `cell`; later reads return the default again.
    ///
    /// Returns `true` if a binding was present.
    pub fn remove<T>(&self, cell: &Cell<T>) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.bindings.write().remove(&cell.id()).is_some()
    }

    /// Returns the number of explicit bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    /// Returns `true` if nothing has been bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }

    /// Returns an independent context holding a copy of the current bindings.
    ///
    /// Writes to the fork are not visible through `self`, and vice versa.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            bindings: Arc::new(RwLock::new(self.bindings.read().clone())),
        }
    }

    /// Returns `true` if both handles refer to the same store.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.bindings, &b.bindings)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.bindings.read();
        let mut slots: Vec<_> = bindings
            .iter()
            .map(|(id, binding)| (id.as_u64(), binding.label.unwrap_or("_")))
            .collect();
        slots.sort_unstable();

        f.debug_struct("Context").field("bindings", &slots).finish()
    }
}

/// Builder for seeding a [`Context`].
#[derive(Debug, Default)]
pub struct ContextBuilder {
    cells: Vec<BoundCell>,
}

impl ContextBuilder {
    /// Adds a binding.
    #[must_use]
    pub fn with(mut self, cell: impl Into<BoundCell>) -> Self {
        self.cells.push(cell.into());
        self
    }

    /// Builds the context.
    #[must_use]
    pub fn build(self) -> Context {
        Context::from_cells(self.cells)
    }
}
