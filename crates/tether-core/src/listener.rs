//! Listener capabilities.
//!
//! A listener is anything implementing [`InvalidationListener`] and/or
//! [`ChangeListener`]. Registries classify a listener by the capability it is
//! registered under ([`Listener`]), and compare listeners by the address of
//! the listener object, never structurally.

use std::fmt;
use std::rc::Rc;

use crate::error::ListenerResult;
use crate::observable::{Observable, ObservableValue};

/// Notified whenever an [`Observable`] becomes invalid.
pub trait InvalidationListener {
    fn invalidated(&self, observable: &dyn Observable) -> ListenerResult;

    /// Weak-listener capability, if this listener has one.
    fn as_weak_listener(&self) -> Option<&dyn WeakListener> {
        None
    }
}

/// Notified whenever the value of an [`ObservableValue`] changes.
pub trait ChangeListener<T> {
    fn changed(
        &self,
        observable: &dyn ObservableValue<T>,
        old_value: &T,
        new_value: &T,
    ) -> ListenerResult;

    /// Weak-listener capability, if this listener has one.
    fn as_weak_listener(&self) -> Option<&dyn WeakListener> {
        None
    }
}

/// Capability of listeners that only hold their target weakly.
pub trait WeakListener {
    /// `true` once the wrapped listener has been reclaimed. Resolved on every
    /// call.
    fn was_garbage_collected(&self) -> bool;
}

/// A listener tagged with the capability it is registered under.
pub enum Listener<T> {
    Invalidation(Rc<dyn InvalidationListener>),
    Change(Rc<dyn ChangeListener<T>>),
}

impl<T> Listener<T> {
    #[must_use]
    pub fn by_ref(&self) -> ListenerRef<'_, T> {
        match self {
            Self::Invalidation(listener) => ListenerRef::Invalidation(listener.as_ref()),
            Self::Change(listener) => ListenerRef::Change(listener.as_ref()),
        }
    }
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Invalidation(listener) => Self::Invalidation(Rc::clone(listener)),
            Self::Change(listener) => Self::Change(Rc::clone(listener)),
        }
    }
}

impl<T> fmt::Debug for Listener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.by_ref(), f)
    }
}

/// Borrowed listener used for removal and membership tests.
pub enum ListenerRef<'a, T> {
    Invalidation(&'a dyn InvalidationListener),
    Change(&'a dyn ChangeListener<T>),
}

impl<T> ListenerRef<'_, T> {
    /// Address identifying the listener object.
    #[must_use]
    pub fn addr(&self) -> *const () {
        match self {
            Self::Invalidation(listener) => std::ptr::from_ref(*listener).cast::<()>(),
            Self::Change(listener) => std::ptr::from_ref(*listener).cast::<()>(),
        }
    }
}

impl<T> Clone for ListenerRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ListenerRef<'_, T> {}

impl<T> fmt::Debug for ListenerRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Invalidation(_) => "Invalidation",
            Self::Change(_) => "Change",
        };
        f.debug_tuple(kind).field(&self.addr()).finish()
    }
}

/// Whether two listener references point at the same object.
#[must_use]
pub fn same_listener<A: ?Sized, B: ?Sized>(a: &A, b: &B) -> bool {
    std::ptr::addr_eq(std::ptr::from_ref(a), std::ptr::from_ref(b))
}

// ---------------------------------------------------------------------------
// Closure adapters
// ---------------------------------------------------------------------------

/// Invalidation listener backed by a closure.
pub struct InvalidationFn<F> {
    callback: F,
}

impl<F> InvalidationListener for InvalidationFn<F>
where
    F: Fn(&dyn Observable) -> ListenerResult,
{
    fn invalidated(&self, observable: &dyn Observable) -> ListenerResult {
        (self.callback)(observable)
    }
}

/// Change listener backed by a closure.
pub struct ChangeFn<F> {
    callback: F,
}

impl<T, F> ChangeListener<T> for ChangeFn<F>
where
    F: Fn(&dyn ObservableValue<T>, &T, &T) -> ListenerResult,
{
    fn changed(
        &self,
        observable: &dyn ObservableValue<T>,
        old_value: &T,
        new_value: &T,
    ) -> ListenerResult {
        (self.callback)(observable, old_value, new_value)
    }
}

/// Wrap a closure as an invalidation listener.
///
/// Keep the returned `Rc` to remove the listener later.
pub fn invalidation_fn<F>(callback: F) -> Rc<InvalidationFn<F>>
where
    F: Fn(&dyn Observable) -> ListenerResult + 'static,
{
    Rc::new(InvalidationFn { callback })
}

/// Wrap a closure as a change listener.
pub fn change_fn<T, F>(callback: F) -> Rc<ChangeFn<F>>
where
    F: Fn(&dyn ObservableValue<T>, &T, &T) -> ListenerResult + 'static,
{
    Rc::new(ChangeFn { callback })
}
