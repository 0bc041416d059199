use std::fmt;
use std::rc::Weak;

use super::Binding;
use crate::error::ListenerResult;
use crate::listener::{InvalidationListener, WeakListener};
use crate::observable::Observable;

/// Dependency listener a binding registers on everything it depends on.
///
/// Holds the binding weakly so dependencies never keep it alive. Once the
/// binding is gone, the observer unregisters from whichever dependency calls
/// it next.
pub struct BindingObserver<T> {
    binding: Weak<dyn Binding<T>>,
}

impl<T> BindingObserver<T> {
    #[must_use]
    pub fn new(binding: Weak<dyn Binding<T>>) -> Self {
        Self { binding }
    }
}

impl<T> InvalidationListener for BindingObserver<T> {
    fn invalidated(&self, observable: &dyn Observable) -> ListenerResult {
        match self.binding.upgrade() {
            Some(binding) => binding.invalidate(),
            None => {
                tracing::debug!("binding reclaimed, observer unregistering");
                observable.remove_listener(self);
            }
        }
        Ok(())
    }

    fn as_weak_listener(&self) -> Option<&dyn WeakListener> {
        Some(self)
    }
}

impl<T> WeakListener for BindingObserver<T> {
    fn was_garbage_collected(&self) -> bool {
        self.binding.strong_count() == 0
    }
}

impl<T> fmt::Debug for BindingObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingObserver")
            .field("reclaimed", &self.was_garbage_collected())
            .finish()
    }
}
