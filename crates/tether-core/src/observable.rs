#![forbid(unsafe_code)]

//! Observable capabilities and the generic observable-value base.
//!
//! [`ObservableCell<T>`] is the infrastructure every concrete value holder
//! builds on: a value plus a [`RegistryCell`] that handles invalidation and
//! change notification. It tolerates listeners being added and removed while
//! a notification is in progress, but it is not thread-safe.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::listener::{ChangeListener, InvalidationListener, Listener, ListenerRef};
use crate::registry::{ListenerRegistry, RegistryCell};

/// An entity whose content can be observed for invalidations.
pub trait Observable {
    /// Register `listener`. Registering the same listener twice notifies it
    /// twice.
    fn add_listener(&self, listener: Rc<dyn InvalidationListener>);

    /// Remove the first registration of `listener`. No-op if it was never
    /// added.
    fn remove_listener(&self, listener: &dyn InvalidationListener);

    fn has_listener(&self, listener: &dyn InvalidationListener) -> bool;
}

/// An [`Observable`] wrapping a value that supports change events.
///
/// Attaching a change listener forces eager evaluation: the value has to be
/// read on every pass to find out whether it changed.
pub trait ObservableValue<T>: Observable {
    fn value(&self) -> T;

    fn add_change_listener(&self, listener: Rc<dyn ChangeListener<T>>);

    fn remove_change_listener(&self, listener: &dyn ChangeListener<T>);

    fn has_change_listener(&self, listener: &dyn ChangeListener<T>) -> bool;
}

/// Whether two observable references point at the same object.
#[must_use]
pub fn same_observable<A: ?Sized, B: ?Sized>(a: &A, b: &B) -> bool {
    std::ptr::addr_eq(std::ptr::from_ref(a), std::ptr::from_ref(b))
}

/// A settable observable value.
///
/// `set` stores the value and fires a value-changed event; change listeners
/// only hear about it if the new value differs from the last one they saw.
pub struct ObservableCell<T> {
    value: RefCell<T>,
    listeners: RegistryCell<T>,
}

impl<T: Clone + PartialEq + 'static> ObservableCell<T> {
    #[must_use]
    pub fn new(value: T) -> Rc<Self> {
        Rc::new(Self {
            value: RefCell::new(value),
            listeners: RegistryCell::new(),
        })
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Store `value` and notify listeners.
    pub fn set(&self, value: T) {
        *self.value.borrow_mut() = value;
        self.fire_value_changed_event();
    }

    /// Notify the registered listeners.
    ///
    /// Listeners added or removed while the notification runs take effect on
    /// the following call.
    pub fn fire_value_changed_event(&self) {
        self.listeners.fire(self);
    }

    /// Snapshot of the current registry, for diagnostics.
    #[must_use]
    pub fn registry(&self) -> ListenerRegistry<T> {
        self.listeners.snapshot()
    }
}

impl<T: Clone + PartialEq + 'static> Observable for ObservableCell<T> {
    fn add_listener(&self, listener: Rc<dyn InvalidationListener>) {
        self.listeners.add(self, Listener::Invalidation(listener));
    }

    fn remove_listener(&self, listener: &dyn InvalidationListener) {
        self.listeners.remove(self, ListenerRef::Invalidation(listener));
    }

    fn has_listener(&self, listener: &dyn InvalidationListener) -> bool {
        self.listeners.contains(ListenerRef::Invalidation(listener))
    }
}

impl<T: Clone + PartialEq + 'static> ObservableValue<T> for ObservableCell<T> {
    fn value(&self) -> T {
        self.get()
    }

    fn add_change_listener(&self, listener: Rc<dyn ChangeListener<T>>) {
        self.listeners.add(self, Listener::Change(listener));
    }

    fn remove_change_listener(&self, listener: &dyn ChangeListener<T>) {
        self.listeners.remove(self, ListenerRef::Change(listener));
    }

    fn has_change_listener(&self, listener: &dyn ChangeListener<T>) -> bool {
        self.listeners.contains(ListenerRef::Change(listener))
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableCell")
            .field("value", &self.value.borrow())
            .field("listeners", &self.listeners.kind())
            .finish()
    }
}
