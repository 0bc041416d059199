//! Slot arrays backing the Generic registry.
//!
//! A slot list is an `Rc`-shared array plus a logical size. Dispatch aliases
//! the array (clones the `Rc`) instead of copying it; any mutation made while
//! the registry is locked writes into a freshly allocated array so the alias
//! under iteration never changes.
//!
//! # Invariants
//!
//! 1. `size <= array.len()`.
//! 2. Slots at `size..` are always `None`.
//! 3. While locked, the array is never written in place.

use std::rc::Rc;

use crate::config::TrimPolicy;
use crate::listener::{ChangeListener, InvalidationListener};

/// Slot content that may report its target as reclaimed.
pub(crate) trait SlotListener {
    fn is_reclaimed(&self) -> bool;
}

impl SlotListener for dyn InvalidationListener {
    fn is_reclaimed(&self) -> bool {
        self.as_weak_listener()
            .is_some_and(|weak| weak.was_garbage_collected())
    }
}

impl<T> SlotListener for dyn ChangeListener<T> {
    fn is_reclaimed(&self) -> bool {
        self.as_weak_listener()
            .is_some_and(|weak| weak.was_garbage_collected())
    }
}

type SlotArray<L> = Rc<Vec<Option<Rc<L>>>>;

/// Growth used when a slot array is full: `floor(capacity * 1.5) + 1`.
pub(crate) const fn grown_capacity(capacity: usize) -> usize {
    capacity * 3 / 2 + 1
}

fn copy_of<L: ?Sized>(array: &[Option<Rc<L>>], len: usize) -> SlotArray<L> {
    let mut copy = Vec::with_capacity(len);
    copy.extend(array.iter().take(len).cloned());
    copy.resize(len, None);
    Rc::new(copy)
}

fn slot_addr<L: ?Sized>(slot: &Option<Rc<L>>) -> Option<*const ()> {
    slot.as_ref().map(|listener| Rc::as_ptr(listener).cast::<()>())
}

/// Aliased view of a slot list taken at the start of a dispatch pass.
pub(crate) struct Snapshot<L: ?Sized> {
    array: SlotArray<L>,
    size: usize,
}

impl<L: ?Sized> Snapshot<L> {
    /// Logical size captured for the pass (holes included).
    pub(crate) fn len(&self) -> usize {
        self.size
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Rc<L>> {
        self.array[..self.size].iter().flatten()
    }

    #[cfg(test)]
    pub(crate) fn aliases(&self, slots: &Slots<L>) -> bool {
        Rc::ptr_eq(&self.array, &slots.array)
    }
}

pub(crate) struct Slots<L: ?Sized> {
    array: SlotArray<L>,
    size: usize,
}

impl<L: ?Sized + SlotListener> Slots<L> {
    pub(crate) fn new() -> Self {
        Self {
            array: Rc::new(Vec::new()),
            size: 0,
        }
    }

    /// Logical size. Under [`TrimPolicy::Legacy`] this may count holes.
    pub(crate) fn len(&self) -> usize {
        self.size
    }

    pub(crate) fn capacity(&self) -> usize {
        self.array.len()
    }

    pub(crate) fn snapshot(&self) -> Snapshot<L> {
        Snapshot {
            array: Rc::clone(&self.array),
            size: self.size,
        }
    }

    pub(crate) fn position(&self, addr: *const ()) -> Option<usize> {
        self.array[..self.size]
            .iter()
            .position(|slot| slot_addr(slot) == Some(addr))
    }

    pub(crate) fn contains(&self, addr: *const ()) -> bool {
        self.position(addr).is_some()
    }

    /// Compacted copy of the live listeners.
    pub(crate) fn live(&self) -> Vec<Rc<L>> {
        self.array[..self.size].iter().flatten().cloned().collect()
    }

    /// First live listener outside `except`.
    pub(crate) fn other_live(&self, except: usize) -> Option<Rc<L>> {
        self.array[..self.size]
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != except)
            .find_map(|(_, slot)| slot.clone())
    }

    pub(crate) fn clear(&mut self) {
        self.array = Rc::new(Vec::new());
        self.size = 0;
    }

    pub(crate) fn push(&mut self, listener: Rc<L>, locked: bool, policy: TrimPolicy) {
        let capacity = self.array.len();
        if capacity == 0 {
            self.array = Rc::new(vec![Some(listener)]);
            self.size = 1;
            return;
        }

        if locked {
            let len = if self.size < capacity {
                capacity
            } else {
                grown_capacity(capacity)
            };
            self.array = copy_of(&self.array, len);
        } else if self.size == capacity {
            let live = self.trim();
            if policy == TrimPolicy::Reclaim {
                self.size = live;
            }
            if self.size == capacity {
                self.array = copy_of(&self.array, grown_capacity(capacity));
            }
        }

        let index = self.size;
        Rc::make_mut(&mut self.array)[index] = Some(listener);
        self.size += 1;
    }

    /// Compact reclaimed weak listeners out of the logical range in place and
    /// return the resulting live count. `size` itself is left to the caller.
    fn trim(&mut self) -> usize {
        let array = Rc::make_mut(&mut self.array);
        let mut real_size = self.size;
        let mut index = 0;
        while index < real_size {
            let reclaimed = array[index]
                .as_ref()
                .is_some_and(|listener| listener.is_reclaimed());
            if reclaimed {
                array[index..real_size].rotate_left(1);
                real_size -= 1;
                array[real_size] = None;
                // Re-examine `index`: it now holds the next entry.
            } else {
                index += 1;
            }
        }
        if real_size < self.size {
            tracing::debug!(
                reclaimed = self.size - real_size,
                "trimmed reclaimed weak listeners"
            );
        }
        real_size
    }

    pub(crate) fn remove_at(&mut self, index: usize, locked: bool) {
        let size = self.size;
        if locked {
            let mut fresh: Vec<Option<Rc<L>>> = vec![None; self.array.len()];
            fresh[..index].clone_from_slice(&self.array[..index]);
            fresh[index..size - 1].clone_from_slice(&self.array[index + 1..size]);
            self.array = Rc::new(fresh);
        } else {
            let array = Rc::make_mut(&mut self.array);
            array[index..size].rotate_left(1);
            // Drop the vacated reference so the listener can be reclaimed.
            array[size - 1] = None;
        }
        self.size -= 1;
    }
}
