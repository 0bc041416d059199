//! Weak listener proxies.
//!
//! A proxy registers on an observable in place of the real listener and only
//! holds it through [`Weak`]. Once the real listener is dropped, the next
//! notification removes the proxy from the observable that delivered it.
//!
//! ```ignore
//! let listener = invalidation_fn(|_| Ok(()));
//! cell.add_listener(Rc::new(WeakInvalidationListener::new(&listener)));
//! drop(listener); // the proxy unregisters on the next `set`
//! ```

use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::ListenerResult;
use crate::listener::{ChangeListener, InvalidationListener, WeakListener};
use crate::observable::{Observable, ObservableValue};

/// Invalidation listener forwarding to a weakly held target.
pub struct WeakInvalidationListener {
    target: Weak<dyn InvalidationListener>,
}

impl WeakInvalidationListener {
    #[must_use]
    pub fn new<L: InvalidationListener + 'static>(target: &Rc<L>) -> Self {
        let target: Rc<dyn InvalidationListener> = Rc::clone(target) as Rc<dyn InvalidationListener>;
        Self::from_dyn(&target)
    }

    #[must_use]
    pub fn from_dyn(target: &Rc<dyn InvalidationListener>) -> Self {
        Self {
            target: Rc::downgrade(target),
        }
    }
}

impl InvalidationListener for WeakInvalidationListener {
    fn invalidated(&self, observable: &dyn Observable) -> ListenerResult {
        match self.target.upgrade() {
            Some(target) => target.invalidated(observable),
            None => {
                tracing::debug!("weak invalidation listener reclaimed, unregistering");
                observable.remove_listener(self);
                Ok(())
            }
        }
    }

    fn as_weak_listener(&self) -> Option<&dyn WeakListener> {
        Some(self)
    }
}

impl WeakListener for WeakInvalidationListener {
    fn was_garbage_collected(&self) -> bool {
        self.target.strong_count() == 0
    }
}

impl fmt::Debug for WeakInvalidationListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakInvalidationListener")
            .field("reclaimed", &self.was_garbage_collected())
            .finish()
    }
}

/// Change listener forwarding to a weakly held target.
pub struct WeakChangeListener<T> {
    target: Weak<dyn ChangeListener<T>>,
}

impl<T: 'static> WeakChangeListener<T> {
    #[must_use]
    pub fn new<L: ChangeListener<T> + 'static>(target: &Rc<L>) -> Self {
        let target: Rc<dyn ChangeListener<T>> = Rc::clone(target) as Rc<dyn ChangeListener<T>>;
        Self::from_dyn(&target)
    }

    #[must_use]
    pub fn from_dyn(target: &Rc<dyn ChangeListener<T>>) -> Self {
        Self {
            target: Rc::downgrade(target),
        }
    }
}

impl<T> ChangeListener<T> for WeakChangeListener<T> {
    fn changed(
        &self,
        observable: &dyn ObservableValue<T>,
        old_value: &T,
        new_value: &T,
    ) -> ListenerResult {
        match self.target.upgrade() {
            Some(target) => target.changed(observable, old_value, new_value),
            None => {
                tracing::debug!("weak change listener reclaimed, unregistering");
                observable.remove_change_listener(self);
                Ok(())
            }
        }
    }

    fn as_weak_listener(&self) -> Option<&dyn WeakListener> {
        Some(self)
    }
}

impl<T> WeakListener for WeakChangeListener<T> {
    fn was_garbage_collected(&self) -> bool {
        self.target.strong_count() == 0
    }
}

impl<T> fmt::Debug for WeakChangeListener<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakChangeListener")
            .field("reclaimed", &self.was_garbage_collected())
            .finish()
    }
}
