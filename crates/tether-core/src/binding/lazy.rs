//! The generic lazily evaluated binding.
//!
//! [`LazyBinding`] pairs a [`BindingCore`] with a [`Compute`] strategy and a
//! weakly referencing [`BindingObserver`]. Dependencies are bound with
//! [`LazyBinding::bind`]; any invalidation they fire marks the binding
//! Invalid and forwards the event to the binding's own listeners. The value
//! is recomputed on the next read.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::observer::BindingObserver;
use super::state::BindingCore;
use super::{Binding, same_dependency};
use crate::listener::{ChangeListener, InvalidationListener, Listener, ListenerRef};
use crate::observable::{Observable, ObservableValue};

/// How a binding derives its value.
pub trait Compute<T> {
    fn compute_value(&self) -> T;

    /// Called after the binding turns Invalid, before its listeners run.
    fn on_invalidating(&self) {}
}

impl<T, F: Fn() -> T> Compute<T> for F {
    fn compute_value(&self) -> T {
        self()
    }
}

/// A binding whose value comes from a [`Compute`] strategy.
pub struct LazyBinding<T, C> {
    /// Validity, cached value and listeners.
    core: BindingCore<T>,
    /// Produces the value on the first read after an invalidation.
    compute: C,
    /// Back-reference handed to the observer without keeping `self` alive.
    this: Weak<Self>,
    /// Shared by every bound dependency; created on the first `bind`.
    observer: RefCell<Option<Rc<BindingObserver<T>>>>,
    /// Dependencies currently holding the observer, in bind order.
    dependencies: RefCell<Vec<Rc<dyn Observable>>>,
    /// Set by [`LazyBinding::bound`]: `dispose` unbinds everything.
    owns_dependencies: Cell<bool>,
}

impl<T, C> LazyBinding<T, C>
where
    T: Clone + PartialEq + 'static,
    C: Compute<T> + 'static,
{
    /// An unbound binding. Call [`bind`](Self::bind) to attach dependencies.
    #[must_use]
    pub fn new(compute: C) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            core: BindingCore::new(),
            compute,
            this: this.clone(),
            observer: RefCell::new(None),
            dependencies: RefCell::new(Vec::new()),
            owns_dependencies: Cell::new(false),
        })
    }

    /// A binding bound to `dependencies` that unbinds them on
    /// [`dispose`](Binding::dispose).
    #[must_use]
    pub fn bound(compute: C, dependencies: &[Rc<dyn Observable>]) -> Rc<Self> {
        let binding = Self::new(compute);
        binding.owns_dependencies.set(true);
        binding.bind(dependencies);
        binding
    }

    /// Start observing `dependencies`. Already bound ones are skipped.
    pub fn bind(&self, dependencies: &[Rc<dyn Observable>]) {
        let observer = self.observer_handle();
        for dependency in dependencies {
            let known = self
                .dependencies
                .borrow()
                .iter()
                .any(|bound| same_dependency(bound, dependency));
            if known {
                continue;
            }
            dependency.add_listener(Rc::clone(&observer) as Rc<dyn InvalidationListener>);
            self.dependencies.borrow_mut().push(Rc::clone(dependency));
        }
    }

    /// Stop observing `dependencies` and drop the observer.
    pub fn unbind(&self, dependencies: &[Rc<dyn Observable>]) {
        let Some(observer) = self.observer.borrow_mut().take() else {
            return;
        };
        for dependency in dependencies {
            dependency.remove_listener(observer.as_ref());
        }
        self.dependencies.borrow_mut().retain(|bound| {
            !dependencies
                .iter()
                .any(|dependency| same_dependency(bound, dependency))
        });
    }

    /// Current value, recomputed if Invalid.
    #[must_use]
    pub fn get(&self) -> T {
        self.core.get(|| self.compute.compute_value())
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.core.version()
    }

    #[must_use]
    pub fn compute(&self) -> &C {
        &self.compute
    }

    fn observer_handle(&self) -> Rc<BindingObserver<T>> {
        let mut slot = self.observer.borrow_mut();
        let observer = slot.get_or_insert_with(|| {
            let binding: Weak<dyn Binding<T>> = self.this.clone();
            Rc::new(BindingObserver::new(binding))
        });
        Rc::clone(observer)
    }
}

impl<T, C> Observable for LazyBinding<T, C>
where
    T: Clone + PartialEq + 'static,
    C: Compute<T> + 'static,
{
    fn add_listener(&self, listener: Rc<dyn InvalidationListener>) {
        self.core.add_listener(self, Listener::Invalidation(listener));
    }

    fn remove_listener(&self, listener: &dyn InvalidationListener) {
        self.core.remove_listener(self, ListenerRef::Invalidation(listener));
    }

    fn has_listener(&self, listener: &dyn InvalidationListener) -> bool {
        self.core.has_listener(ListenerRef::Invalidation(listener))
    }
}

impl<T, C> ObservableValue<T> for LazyBinding<T, C>
where
    T: Clone + PartialEq + 'static,
    C: Compute<T> + 'static,
{
    fn value(&self) -> T {
        self.get()
    }

    fn add_change_listener(&self, listener: Rc<dyn ChangeListener<T>>) {
        self.core.add_listener(self, Listener::Change(listener));
    }

    fn remove_change_listener(&self, listener: &dyn ChangeListener<T>) {
        self.core.remove_listener(self, ListenerRef::Change(listener));
    }

    fn has_change_listener(&self, listener: &dyn ChangeListener<T>) -> bool {
        self.core.has_listener(ListenerRef::Change(listener))
    }
}

impl<T, C> Binding<T> for LazyBinding<T, C>
where
    T: Clone + PartialEq + 'static,
    C: Compute<T> + 'static,
{
    fn is_valid(&self) -> bool {
        self.core.is_valid()
    }

    fn invalidate(&self) {
        self.core.invalidate(self, || self.compute.on_invalidating());
    }

    fn dependencies(&self) -> Vec<Rc<dyn Observable>> {
        self.dependencies.borrow().clone()
    }

    fn dispose(&self) {
        if self.owns_dependencies.get() {
            let dependencies = self.dependencies();
            self.unbind(&dependencies);
        }
    }
}

impl<T, C> fmt::Display for LazyBinding<T, C>
where
    T: Clone + PartialEq + fmt::Display + 'static,
    C: Compute<T> + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.describe(f)
    }
}

impl<T: fmt::Debug, C> fmt::Debug for LazyBinding<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyBinding")
            .field("core", &self.core)
            .field("dependencies", &self.dependencies.borrow().len())
            .field("bound", &self.observer.borrow().is_some())
            .finish()
    }
}
