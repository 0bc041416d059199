//! The `"observable:error"` hook.
//!
//! Every listener failure isolated during a dispatch pass is forwarded here,
//! in the order the failing listeners ran. Hooks are thread-local and stay
//! installed for as long as their [`HookGuard`] lives.
//!
//! Failures inside a hook are not isolated: a panicking hook unwinds through
//! the dispatch pass that called it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config;
use crate::error::ListenerError;

/// Name of the error hook, used as the `hook` field of log events.
pub const OBSERVABLE_ERROR: &str = "observable:error";

type ErrorHook = Rc<dyn Fn(&ListenerError)>;

thread_local! {
    static ERROR_HOOKS: RefCell<Vec<(u64, ErrorHook)>> = const { RefCell::new(Vec::new()) };
    static NEXT_HOOK_ID: Cell<u64> = const { Cell::new(1) };
}

/// Install `hook` for `"observable:error"` on this thread.
#[must_use = "the hook is removed when the guard is dropped"]
pub fn on_observable_error(hook: impl Fn(&ListenerError) + 'static) -> HookGuard {
    let id = NEXT_HOOK_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });
    ERROR_HOOKS.with(|hooks| hooks.borrow_mut().push((id, Rc::new(hook))));
    HookGuard { id }
}

/// Number of `"observable:error"` hooks installed on this thread.
#[must_use]
pub fn observable_error_hook_count() -> usize {
    ERROR_HOOKS.with(|hooks| hooks.borrow().len())
}

/// Route an isolated listener failure to the installed hooks.
pub(crate) fn call_observable_error(error: ListenerError) {
    if config::current().log_listener_errors {
        tracing::warn!(hook = OBSERVABLE_ERROR, error = %error, "listener callback failed");
    }
    // Snapshot so a hook may install or drop hooks while running.
    let hooks: Vec<ErrorHook> =
        ERROR_HOOKS.with(|hooks| hooks.borrow().iter().map(|(_, h)| Rc::clone(h)).collect());
    for hook in hooks {
        hook(&error);
    }
}

/// Uninstalls its hook on drop.
#[derive(Debug)]
pub struct HookGuard {
    id: u64,
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        let id = self.id;
        ERROR_HOOKS.with(|hooks| hooks.borrow_mut().retain(|(hook_id, _)| *hook_id != id));
    }
}
