//! Typed, identity-keyed storage slots.
//!
//! A [`Cell`] names one location in a [`Context`](crate::Context). The slot is
//! identified by an opaque [`CellId`] allocated when the cell is created, never
//! by its label or its value, so two features that both declare a
//! `Cell<u32>` with the same default can never collide.
//!
//! # Example
//!
//! ```
//! use spindle_core::Cell;
//!
//! let counter = Cell::new(0_u32);
//! let bound = counter.create(5);
//!
//! assert_eq!(counter.id(), bound.id());
//! assert_eq!(*counter.value(), 0);
//! assert_eq!(*bound.value(), 5);
//! ```

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CELL_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a cell.
///
/// Allocated from a process-wide counter; equal ids mean the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    fn next() -> Self {
        Self(NEXT_CELL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric identity, for logging.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// A typed storage slot carrying either its default or a bound value.
///
/// Cells are usually created once (for example in a `static` initializer or
/// when a feature is wired up) and then used as keys into any number of
/// contexts. [`Cell::create`] produces a value-carrier sharing the same
/// identity, which is how bindings are stored.
pub struct Cell<T> {
    id: CellId,
    label: Option<&'static str>,
    value: Arc<T>,
}

impl<T> Cell<T>
where
    T: Send + Sync + 'static,
{
    /// Allocates a new slot whose default value is `default`.
    #[must_use]
    pub fn new(default: T) -> Self {
        Self {
            id: CellId::next(),
            label: None,
            value: Arc::new(default),
        }
    }

    /// Allocates a new slot with a label used in `Debug` output and logs.
    ///
    /// The label has no effect on lookups.
    #[must_use]
    pub fn named(label: &'static str, default: T) -> Self {
        Self {
            id: CellId::next(),
            label: Some(label),
            value: Arc::new(default),
        }
    }

    /// Returns a new cell with the same identity bound to `value`.
    ///
    /// `self` is not modified.
    #[must_use]
    pub fn create(&self, value: T) -> Self {
        Self {
            id: self.id,
            label: self.label,
            value: Arc::new(value),
        }
    }

    /// Returns the identity of this slot.
    #[must_use]
    pub fn id(&self) -> CellId {
        self.id
    }

    /// Returns the label, if one was given.
    #[must_use]
    pub fn label(&self) -> Option<&'static str> {
        self.label
    }

    /// Returns the carried value (the default for a freshly created cell).
    #[must_use]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Returns `true` if both cells name the same slot.
    #[must_use]
    pub fn same_slot<U>(&self, other: &Cell<U>) -> bool {
        self.id == other.id
    }

    /// Type-erases this cell so it can seed a [`Context`](crate::Context).
    #[must_use]
    pub fn bind(self) -> BoundCell {
        BoundCell {
            id: self.id,
            label: self.label,
            value: self.value,
        }
    }

    pub(crate) fn shared_value(&self) -> Arc<T> {
        Arc::clone(&self.value)
    }
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            label: self.label,
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("value", &self.value)
            .finish()
    }
}

impl<T> From<Cell<T>> for BoundCell
where
    T: Send + Sync + 'static,
{
    fn from(cell: Cell<T>) -> Self {
        cell.bind()
    }
}

/// A type-erased binding: a cell identity plus its value.
pub struct BoundCell {
    pub(crate) id: CellId,
    pub(crate) label: Option<&'static str>,
    pub(crate) value: Arc<dyn Any + Send + Sync>,
}

impl BoundCell {
    /// Returns the identity of the bound slot.
    #[must_use]
    pub fn id(&self) -> CellId {
        self.id
    }

    /// Returns the label of the bound slot, if any.
    #[must_use]
    pub fn label(&self) -> Option<&'static str> {
        self.label
    }
}

impl fmt::Debug for BoundCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCell")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_cell_carries_default() {
        let cell = Cell::new("anonymous".to_string());
        assert_eq!(cell.value(), "anonymous");
        assert!(cell.label().is_none());
    }

    #[test]
    fn test_create_keeps_identity() {
        let cell = Cell::named("user", 1_i64);
        let bound = cell.create(42);

        assert_eq!(cell.id(), bound.id());
        assert!(cell.same_slot(&bound));
        assert_eq!(bound.label(), Some("user"));
    }

    #[test]
    fn test_create_does_not_mutate_original() {
        let cell = Cell::new(vec![1, 2, 3]);
        let _bound = cell.create(vec![9]);
        assert_eq!(cell.value(), &vec![1, 2, 3]);
    }

    #[test]
    fn test_clone_shares_identity() {
        let cell = Cell::new(7_u8);
        let clone = cell.clone();
        assert!(cell.same_slot(&clone));
    }

    #[test]
    fn test_cells_of_different_types_never_share_slot() {
        let a = Cell::new(0_u32);
        let b = Cell::new(String::new());
        assert!(!a.same_slot(&b));
    }

    #[test]
    fn test_display_id() {
        let cell = Cell::new(());
        assert_eq!(cell.id().to_string(), format!("cell#{}", cell.id().as_u64()));
    }

    #[test]
    fn test_bind_preserves_id_and_label() {
        let cell = Cell::named("locale", "en".to_string());
        let id = cell.id();
        let bound: BoundCell = cell.into();
        assert_eq!(bound.id(), id);
        assert_eq!(bound.label(), Some("locale"));
    }

    proptest! {
        #[test]
        fn prop_equal_defaults_get_distinct_ids(default in any::<i32>()) {
            let a = Cell::new(default);
            let b = Cell::new(default);
            prop_assert_ne!(a.id(), b.id());
        }
    }
}
