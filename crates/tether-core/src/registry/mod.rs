//! Variant-sized listener storage.
//!
//! An observable owns exactly one [`ListenerRegistry`]. The registry is a
//! value: every transition consumes it and returns the replacement, which the
//! owner stores. Most observables have zero or one listener, so those shapes
//! get their own cheap variants; only the many-listener case pays for slot
//! arrays.
//!
//! ```text
//!  Empty ──add──► SingleInvalidation / SingleChange ──add──► Generic
//!    ▲                      │   ▲                              │
//!    └──────remove──────────┘   └───────remove (collapse)──────┘
//! ```
//!
//! # Dispatch
//!
//! [`ListenerRegistry::fire_value_changed_event`] calls invalidation
//! listeners first, then, if the observable's value differs from the cached
//! one, change listeners. Each listener call is isolated: an `Err` goes to
//! the `"observable:error"` hook and iteration continues.

mod generic;
mod slots;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub use generic::Generic;

use crate::error::ListenerResult;
use crate::hooks;
use crate::listener::{ChangeListener, InvalidationListener, Listener, ListenerRef};
use crate::observable::ObservableValue;

/// A single change listener plus its change-detection baseline.
pub struct SingleChange<T> {
    listener: Rc<dyn ChangeListener<T>>,
    current_value: RefCell<T>,
}

impl<T> SingleChange<T> {
    #[must_use]
    pub fn listener(&self) -> &Rc<dyn ChangeListener<T>> {
        &self.listener
    }
}

impl<T: Clone> SingleChange<T> {
    /// The last value change listeners were told about.
    #[must_use]
    pub fn current_value(&self) -> T {
        self.current_value.borrow().clone()
    }
}

/// Registry shape, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    Empty,
    SingleInvalidation,
    SingleChange,
    Generic,
}

impl RegistryKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::SingleInvalidation => "single-invalidation",
            Self::SingleChange => "single-change",
            Self::Generic => "generic",
        }
    }
}

/// Listener storage for one observable.
pub enum ListenerRegistry<T> {
    Empty,
    SingleInvalidation(Rc<dyn InvalidationListener>),
    SingleChange(Rc<SingleChange<T>>),
    Generic(Rc<Generic<T>>),
}

impl<T> ListenerRegistry<T> {
    #[must_use]
    pub fn kind(&self) -> RegistryKind {
        match self {
            Self::Empty => RegistryKind::Empty,
            Self::SingleInvalidation(_) => RegistryKind::SingleInvalidation,
            Self::SingleChange(_) => RegistryKind::SingleChange,
            Self::Generic(_) => RegistryKind::Generic,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub(crate) fn single_change(listener: Rc<dyn ChangeListener<T>>, current_value: T) -> Self {
        Self::SingleChange(Rc::new(SingleChange {
            listener,
            current_value: RefCell::new(current_value),
        }))
    }
}

impl<T: Clone + PartialEq + 'static> ListenerRegistry<T> {
    /// Register `listener` on behalf of `observable`.
    ///
    /// The observable's value is read before anything else; a lazy binding
    /// becomes valid here, so its next invalidation is actually fired.
    #[must_use]
    pub fn add_listener<O: ObservableValue<T>>(self, observable: &O, listener: Listener<T>) -> Self {
        let current = observable.value();
        match self {
            Self::Empty => match listener {
                Listener::Invalidation(listener) => Self::SingleInvalidation(listener),
                Listener::Change(listener) => Self::single_change(listener, current),
            },
            Self::SingleInvalidation(existing) => Self::Generic(Rc::new(Generic::pair(
                Listener::Invalidation(existing),
                listener,
                current,
            ))),
            Self::SingleChange(existing) => Self::Generic(Rc::new(Generic::pair(
                Listener::Change(Rc::clone(&existing.listener)),
                listener,
                current,
            ))),
            Self::Generic(generic) => {
                generic.push(listener);
                Self::Generic(generic)
            }
        }
    }

    /// Remove the first registration of `listener` from `observable`'s
    /// registry. Unknown listeners and listeners of the other kind leave the
    /// registry unchanged.
    ///
    /// Collapsing onto a lone change listener reads `observable`'s value as
    /// the new baseline.
    #[must_use]
    pub fn remove_listener<O: ObservableValue<T>>(
        self,
        observable: &O,
        listener: ListenerRef<'_, T>,
    ) -> Self {
        match (self, listener) {
            (Self::SingleInvalidation(existing), ListenerRef::Invalidation(_))
                if Rc::as_ptr(&existing).cast::<()>() == listener.addr() =>
            {
                Self::Empty
            }
            (Self::SingleChange(existing), ListenerRef::Change(_))
                if Rc::as_ptr(&existing.listener).cast::<()>() == listener.addr() =>
            {
                Self::Empty
            }
            (Self::Generic(generic), listener) => generic.remove(observable, listener),
            (unchanged, _) => unchanged,
        }
    }

    #[must_use]
    pub fn has_listener(&self, listener: ListenerRef<'_, T>) -> bool {
        match (self, listener) {
            (Self::SingleInvalidation(existing), ListenerRef::Invalidation(_)) => {
                Rc::as_ptr(existing).cast::<()>() == listener.addr()
            }
            (Self::SingleChange(existing), ListenerRef::Change(_)) => {
                Rc::as_ptr(&existing.listener).cast::<()>() == listener.addr()
            }
            (Self::Generic(generic), listener) => generic.contains(listener),
            _ => false,
        }
    }

    /// Notify every registered listener that `observable` changed.
    ///
    /// Never fails: listener errors are routed to the error hook.
    pub fn fire_value_changed_event<O: ObservableValue<T>>(&self, observable: &O) {
        match self {
            Self::Empty => {}
            Self::SingleInvalidation(listener) => isolate(listener.invalidated(observable)),
            Self::SingleChange(single) => {
                let new_value = observable.value();
                let old_value = single.current_value.replace(new_value.clone());
                if old_value != new_value {
                    isolate(single.listener.changed(observable, &old_value, &new_value));
                }
            }
            Self::Generic(generic) => generic.fire(observable),
        }
    }

    /// Live invalidation listeners in registration order.
    #[must_use]
    pub fn invalidation_listeners(&self) -> Vec<Rc<dyn InvalidationListener>> {
        match self {
            Self::SingleInvalidation(listener) => vec![Rc::clone(listener)],
            Self::Generic(generic) => generic.invalidation_listeners(),
            Self::Empty | Self::SingleChange(_) => Vec::new(),
        }
    }

    /// Live change listeners in registration order.
    #[must_use]
    pub fn change_listeners(&self) -> Vec<Rc<dyn ChangeListener<T>>> {
        match self {
            Self::SingleChange(single) => vec![Rc::clone(&single.listener)],
            Self::Generic(generic) => generic.change_listeners(),
            Self::Empty | Self::SingleInvalidation(_) => Vec::new(),
        }
    }
}

impl<T> Clone for ListenerRegistry<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Empty => Self::Empty,
            Self::SingleInvalidation(listener) => Self::SingleInvalidation(Rc::clone(listener)),
            Self::SingleChange(single) => Self::SingleChange(Rc::clone(single)),
            Self::Generic(generic) => Self::Generic(Rc::clone(generic)),
        }
    }
}

impl<T> Default for ListenerRegistry<T> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<T> fmt::Debug for ListenerRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic(generic) => fmt::Debug::fmt(generic.as_ref(), f),
            other => write!(f, "{:?}", other.kind()),
        }
    }
}

/// Forward a failed listener call to the error hook.
pub(crate) fn isolate(result: ListenerResult) {
    if let Err(error) = result {
        hooks::call_observable_error(error);
    }
}

/// Per-observable holder of a [`ListenerRegistry`].
///
/// Never keeps its borrow across a listener call: transitions take a handle
/// out, compute the replacement, then store it, and dispatch runs on a cloned
/// handle. Listeners may therefore add or remove listeners on the same
/// observable while being notified.
pub struct RegistryCell<T> {
    registry: RefCell<ListenerRegistry<T>>,
}

impl<T> RegistryCell<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: RefCell::new(ListenerRegistry::Empty),
        }
    }

    #[must_use]
    pub fn kind(&self) -> RegistryKind {
        self.registry.borrow().kind()
    }

    #[must_use]
    pub fn snapshot(&self) -> ListenerRegistry<T> {
        self.registry.borrow().clone()
    }

    fn store(&self, next: ListenerRegistry<T>) {
        let before = self.kind();
        let after = next.kind();
        *self.registry.borrow_mut() = next;
        if before != after {
            tracing::trace!(
                from = before.as_str(),
                to = after.as_str(),
                "listener registry transition"
            );
        }
    }
}

impl<T: Clone + PartialEq + 'static> RegistryCell<T> {
    /// Register `listener`. `owner` is the observable this cell belongs to.
    pub fn add<O: ObservableValue<T>>(&self, owner: &O, listener: Listener<T>) {
        // The value read may recompute a binding, which may touch this cell.
        let current = self.snapshot();
        let next = current.add_listener(owner, listener);
        self.store(next);
    }

    /// Unregister `listener`. `owner` is the observable this cell belongs to.
    pub fn remove<O: ObservableValue<T>>(&self, owner: &O, listener: ListenerRef<'_, T>) {
        let current = self.snapshot();
        let next = current.remove_listener(owner, listener);
        self.store(next);
    }

    #[must_use]
    pub fn contains(&self, listener: ListenerRef<'_, T>) -> bool {
        self.registry.borrow().has_listener(listener)
    }

    pub fn fire<O: ObservableValue<T>>(&self, owner: &O) {
        let current = self.snapshot();
        current.fire_value_changed_event(owner);
    }
}

impl<T> Default for RegistryCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for RegistryCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.registry.borrow(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{change_fn, invalidation_fn};
    use crate::observable::ObservableCell;

    fn inv() -> Rc<dyn InvalidationListener> {
        invalidation_fn(|_| Ok(()))
    }

    fn chg() -> Rc<dyn ChangeListener<i32>> {
        change_fn(|_: &dyn ObservableValue<i32>, _: &i32, _: &i32| Ok(()))
    }

    #[test]
    fn add_walks_empty_single_generic() {
        let cell = ObservableCell::new(0);
        let registry = ListenerRegistry::Empty;
        let registry = registry.add_listener(&*cell, Listener::Invalidation(inv()));
        assert_eq!(registry.kind(), RegistryKind::SingleInvalidation);
        let registry = registry.add_listener(&*cell, Listener::Change(chg()));
        assert_eq!(registry.kind(), RegistryKind::Generic);
        let registry = registry.add_listener(&*cell, Listener::Invalidation(inv()));
        assert_eq!(registry.invalidation_listeners().len(), 2);
        assert_eq!(registry.change_listeners().len(), 1);
    }

    #[test]
    fn duplicate_add_promotes_to_generic() {
        let cell = ObservableCell::new(0);
        let listener = inv();
        let registry = ListenerRegistry::Empty
            .add_listener(&*cell, Listener::Invalidation(Rc::clone(&listener)))
            .add_listener(&*cell, Listener::Invalidation(Rc::clone(&listener)));
        assert_eq!(registry.kind(), RegistryKind::Generic);
        assert_eq!(registry.invalidation_listeners().len(), 2);

        let registry =
            registry.remove_listener(&*cell, ListenerRef::Invalidation(listener.as_ref()));
        assert_eq!(registry.kind(), RegistryKind::SingleInvalidation);
        assert!(registry.has_listener(ListenerRef::Invalidation(listener.as_ref())));
    }

    #[test]
    fn single_remove_is_kind_matched() {
        let cell = ObservableCell::new(0);
        let listener = inv();
        let registry = ListenerRegistry::Empty
            .add_listener(&*cell, Listener::Invalidation(Rc::clone(&listener)));
        let registry = registry.remove_listener(&*cell, ListenerRef::Change(chg().as_ref()));
        assert_eq!(registry.kind(), RegistryKind::SingleInvalidation);
        let registry =
            registry.remove_listener(&*cell, ListenerRef::Invalidation(listener.as_ref()));
        assert!(registry.is_empty());
    }

    #[test]
    fn removing_from_empty_is_a_noop() {
        let cell = ObservableCell::new(0);
        let registry: ListenerRegistry<i32> = ListenerRegistry::Empty;
        let registry = registry.remove_listener(&*cell, ListenerRef::Invalidation(inv().as_ref()));
        assert!(registry.is_empty());
    }

    #[test]
    fn collapse_reads_fresh_baseline() {
        let cell = ObservableCell::new(1);
        let invalidation = inv();
        let change = chg();
        let registry = ListenerRegistry::Empty
            .add_listener(&*cell, Listener::Invalidation(Rc::clone(&invalidation)))
            .add_listener(&*cell, Listener::Change(Rc::clone(&change)));
        // The registry is detached from the cell, so this set fires nothing
        // and the Generic baseline stays at 1.
        cell.set(5);

        let registry =
            registry.remove_listener(&*cell, ListenerRef::Invalidation(invalidation.as_ref()));
        let ListenerRegistry::SingleChange(single) = &registry else {
            panic!("expected SingleChange, got {registry:?}");
        };
        assert_eq!(single.current_value(), 5);
        assert!(std::ptr::addr_eq(
            Rc::as_ptr(single.listener()),
            Rc::as_ptr(&change)
        ));
    }

    #[test]
    fn generic_removal_with_crowded_other_kind_keeps_generic() {
        let cell = ObservableCell::new(0);
        let invalidation = inv();
        let registry = ListenerRegistry::Empty
            .add_listener(&*cell, Listener::Invalidation(Rc::clone(&invalidation)))
            .add_listener(&*cell, Listener::Change(chg()))
            .add_listener(&*cell, Listener::Change(chg()));
        let registry =
            registry.remove_listener(&*cell, ListenerRef::Invalidation(invalidation.as_ref()));
        assert_eq!(registry.kind(), RegistryKind::Generic);
        assert!(registry.invalidation_listeners().is_empty());
        assert_eq!(registry.change_listeners().len(), 2);
    }

    #[test]
    fn registry_cell_tracks_transitions() {
        let cell = ObservableCell::new(0);
        let holder: RegistryCell<i32> = RegistryCell::new();
        let listener = inv();
        holder.add(&*cell, Listener::Invalidation(Rc::clone(&listener)));
        assert_eq!(holder.kind(), RegistryKind::SingleInvalidation);
        assert!(holder.contains(ListenerRef::Invalidation(listener.as_ref())));
        holder.remove(&*cell, ListenerRef::Invalidation(listener.as_ref()));
        assert_eq!(holder.kind(), RegistryKind::Empty);
        assert_eq!(format!("{holder:?}"), "Empty");
    }

    #[test]
    fn kind_names() {
        assert_eq!(RegistryKind::Empty.as_str(), "empty");
        assert_eq!(RegistryKind::Generic.as_str(), "generic");
    }
}
