//! The many-listener registry variant.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::slots::Slots;
use super::{ListenerRegistry, isolate};
use crate::config::{self, TrimPolicy};
use crate::listener::{ChangeListener, InvalidationListener, Listener, ListenerRef};
use crate::observable::ObservableValue;

/// Registry holding any number of invalidation and change listeners.
///
/// `locked` is set for the duration of a dispatch pass. It is a reentrancy
/// marker, not a cross-thread lock.
pub struct Generic<T> {
    /// Invalidation listeners, notified first on every pass.
    invalidation: RefCell<Slots<dyn InvalidationListener>>,
    /// Change listeners, notified only when the value read back differs.
    change: RefCell<Slots<dyn ChangeListener<T>>>,
    /// True while a dispatch pass is iterating the slot lists.
    locked: Cell<bool>,
    /// Baseline the next pass compares against.
    current_value: RefCell<T>,
    /// Captured from the active config when the registry was created.
    trim_policy: TrimPolicy,
}

/// Holds `locked` for one dispatch pass and restores the previous state on
/// every exit path, unwinding included.
struct DispatchLock<'a> {
    flag: &'a Cell<bool>,
    previous: bool,
}

impl<'a> DispatchLock<'a> {
    fn engage(flag: &'a Cell<bool>) -> Self {
        let previous = flag.replace(true);
        Self { flag, previous }
    }
}

impl Drop for DispatchLock<'_> {
    fn drop(&mut self) {
        self.flag.set(self.previous);
    }
}

/// Outcome of removing one listener from a Generic registry.
enum Removal<T> {
    /// Still Generic, possibly with one entry fewer.
    Kept,
    /// Collapsed to the survivor, or to nothing.
    Collapsed(Option<Listener<T>>),
}

impl<T: Clone + PartialEq + 'static> Generic<T> {
    /// Build a Generic registry from two listeners, in order.
    pub(crate) fn pair(first: Listener<T>, second: Listener<T>, current_value: T) -> Self {
        let generic = Self {
            invalidation: RefCell::new(Slots::new()),
            change: RefCell::new(Slots::new()),
            locked: Cell::new(false),
            current_value: RefCell::new(current_value),
            trim_policy: config::current().trim_policy,
        };
        generic.push(first);
        generic.push(second);
        generic
    }

    pub(crate) fn push(&self, listener: Listener<T>) {
        let locked = self.locked.get();
        match listener {
            Listener::Invalidation(listener) => {
                self.invalidation
                    .borrow_mut()
                    .push(listener, locked, self.trim_policy);
            }
            Listener::Change(listener) => {
                self.change
                    .borrow_mut()
                    .push(listener, locked, self.trim_policy);
            }
        }
    }

    /// Remove the first occurrence of `listener`, returning the registry the
    /// owner should hold afterwards.
    ///
    /// A surviving change listener gets a fresh baseline read from
    /// `observable`, so a collapse during a dispatch pass does not replay the
    /// change that pass is delivering.
    pub(crate) fn remove<O: ObservableValue<T>>(
        self: Rc<Self>,
        observable: &O,
        listener: ListenerRef<'_, T>,
    ) -> ListenerRegistry<T> {
        let removal = match listener {
            ListenerRef::Invalidation(_) => self.remove_invalidation(listener.addr()),
            ListenerRef::Change(_) => self.remove_change(listener.addr()),
        };
        match removal {
            Removal::Kept => ListenerRegistry::Generic(self),
            Removal::Collapsed(None) => ListenerRegistry::Empty,
            Removal::Collapsed(Some(Listener::Invalidation(survivor))) => {
                ListenerRegistry::SingleInvalidation(survivor)
            }
            Removal::Collapsed(Some(Listener::Change(survivor))) => {
                ListenerRegistry::single_change(survivor, observable.value())
            }
        }
    }

    fn remove_invalidation(&self, addr: *const ()) -> Removal<T> {
        let mut invalidation = self.invalidation.borrow_mut();
        let Some(index) = invalidation.position(addr) else {
            return Removal::Kept;
        };
        let change = self.change.borrow();

        if invalidation.len() == 1 {
            match change.len() {
                0 => return Removal::Collapsed(None),
                1 => {
                    return Removal::Collapsed(change.other_live(usize::MAX).map(Listener::Change));
                }
                _ => invalidation.clear(),
            }
        } else if invalidation.len() == 2 && change.len() == 0 {
            return Removal::Collapsed(invalidation.other_live(index).map(Listener::Invalidation));
        } else {
            invalidation.remove_at(index, self.locked.get());
        }
        Removal::Kept
    }

    fn remove_change(&self, addr: *const ()) -> Removal<T> {
        let mut change = self.change.borrow_mut();
        let Some(index) = change.position(addr) else {
            return Removal::Kept;
        };
        let invalidation = self.invalidation.borrow();

        if change.len() == 1 {
            match invalidation.len() {
                0 => return Removal::Collapsed(None),
                1 => {
                    return Removal::Collapsed(
                        invalidation.other_live(usize::MAX).map(Listener::Invalidation),
                    );
                }
                _ => change.clear(),
            }
        } else if change.len() == 2 && invalidation.len() == 0 {
            return Removal::Collapsed(change.other_live(index).map(Listener::Change));
        } else {
            change.remove_at(index, self.locked.get());
        }
        Removal::Kept
    }

    pub(crate) fn contains(&self, listener: ListenerRef<'_, T>) -> bool {
        match listener {
            ListenerRef::Invalidation(_) => self.invalidation.borrow().contains(listener.addr()),
            ListenerRef::Change(_) => self.change.borrow().contains(listener.addr()),
        }
    }

    /// One dispatch pass over aliased snapshots of both slot lists.
    pub(crate) fn fire<O: ObservableValue<T>>(&self, observable: &O) {
        let invalidation = self.invalidation.borrow().snapshot();
        let change = self.change.borrow().snapshot();
        let _lock = DispatchLock::engage(&self.locked);

        for listener in invalidation.iter() {
            isolate(listener.invalidated(observable));
        }

        if change.len() > 0 {
            let new_value = observable.value();
            let old_value = self.current_value.replace(new_value.clone());
            if old_value != new_value {
                for listener in change.iter() {
                    isolate(listener.changed(observable, &old_value, &new_value));
                }
            }
        }
    }

    pub(crate) fn invalidation_listeners(&self) -> Vec<Rc<dyn InvalidationListener>> {
        self.invalidation.borrow().live()
    }

    pub(crate) fn change_listeners(&self) -> Vec<Rc<dyn ChangeListener<T>>> {
        self.change.borrow().live()
    }
}

impl<T> Generic<T> {
    /// Whether a dispatch pass is currently running over this registry.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    #[must_use]
    pub fn trim_policy(&self) -> TrimPolicy {
        self.trim_policy
    }

    /// Logical size of the invalidation list, holes included.
    #[must_use]
    pub fn invalidation_len(&self) -> usize {
        self.invalidation.borrow().len()
    }

    #[must_use]
    pub fn invalidation_capacity(&self) -> usize {
        self.invalidation.borrow().capacity()
    }

    /// Logical size of the change list, holes included.
    #[must_use]
    pub fn change_len(&self) -> usize {
        self.change.borrow().len()
    }

    #[must_use]
    pub fn change_capacity(&self) -> usize {
        self.change.borrow().capacity()
    }
}

impl<T> fmt::Debug for Generic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generic")
            .field("invalidation", &self.invalidation.borrow().len())
            .field("change", &self.change.borrow().len())
            .field("locked", &self.locked.get())
            .field("trim_policy", &self.trim_policy)
            .finish()
    }
}
