//! Valid/invalid state shared by every binding.
//!
//! # Invariants
//!
//! 1. `cached` is `Some` whenever `valid` is true.
//! 2. `version` increments by exactly 1 per recomputation.
//! 3. `invalidate` fires the registry only on a Valid → Invalid transition.

use std::cell::{Cell, RefCell};
use std::fmt;

use crate::listener::{Listener, ListenerRef};
use crate::observable::ObservableValue;
use crate::registry::{RegistryCell, RegistryKind};

/// Cached value, validity and listeners of one binding.
///
/// # Failure Modes
///
/// - A `compute` that panics inside [`BindingCore::get`] unwinds to the
///   caller. The core stays Invalid with `version` unchanged and the previous
///   cached value left in place; the next `get` computes again.
/// - A failing listener never surfaces from [`BindingCore::invalidate`]; it is
///   reported through the `"observable:error"` hook.
pub struct BindingCore<T> {
    /// Whether `cached` reflects the dependencies' current values.
    valid: Cell<bool>,
    /// Last computed value (None only before the first computation).
    cached: RefCell<Option<T>>,
    /// Number of recomputations.
    version: Cell<u64>,
    /// Listeners of the owning binding.
    listeners: RegistryCell<T>,
}

impl<T> BindingCore<T> {
    /// A core in the Invalid state with no cached value.
    #[must_use]
    pub fn new() -> Self {
        Self {
            valid: Cell::new(false),
            cached: RefCell::new(None),
            version: Cell::new(0),
            listeners: RegistryCell::new(),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    /// Number of recomputations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.get()
    }

    #[must_use]
    pub fn listener_kind(&self) -> RegistryKind {
        self.listeners.kind()
    }
}

impl<T: Clone + PartialEq + 'static> BindingCore<T> {
    /// Current value, running `compute` first when Invalid.
    ///
    /// A panicking `compute` leaves the core Invalid; the next call retries.
    pub fn get(&self, compute: impl FnOnce() -> T) -> T {
        if self.valid.get()
            && let Some(value) = self.cached.borrow().as_ref()
        {
            return value.clone();
        }
        let value = compute();
        *self.cached.borrow_mut() = Some(value.clone());
        let version = self.version.get() + 1;
        self.version.set(version);
        self.valid.set(true);
        tracing::trace!(version, "binding recomputed");
        value
    }

    /// Mark the binding Invalid and notify `owner`'s listeners.
    ///
    /// No-op when already Invalid.
    pub fn invalidate<O: ObservableValue<T>>(&self, owner: &O, on_invalidating: impl FnOnce()) {
        if !self.valid.replace(false) {
            return;
        }
        on_invalidating();
        tracing::trace!(version = self.version.get(), "binding invalidated");
        self.listeners.fire(owner);
    }

    pub fn add_listener<O: ObservableValue<T>>(&self, owner: &O, listener: Listener<T>) {
        self.listeners.add(owner, listener);
    }

    pub fn remove_listener<O: ObservableValue<T>>(
        &self,
        owner: &O,
        listener: ListenerRef<'_, T>,
    ) {
        self.listeners.remove(owner, listener);
    }

    #[must_use]
    pub fn has_listener(&self, listener: ListenerRef<'_, T>) -> bool {
        self.listeners.contains(listener)
    }

    /// `Binding [value: v]` when Valid, `Binding [invalid]` otherwise.
    pub fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        T: fmt::Display,
    {
        match self.cached.borrow().as_ref() {
            Some(value) if self.valid.get() => write!(f, "Binding [value: {value}]"),
            _ => f.write_str("Binding [invalid]"),
        }
    }
}

impl<T> Default for BindingCore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for BindingCore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingCore")
            .field("valid", &self.valid.get())
            .field("cached", &self.cached.borrow())
            .field("version", &self.version.get())
            .field("listeners", &self.listener_kind())
            .finish()
    }
}
