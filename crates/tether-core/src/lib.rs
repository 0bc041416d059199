#![forbid(unsafe_code)]

//! Observable values, listener dispatch and lazy bindings.
//!
//! - [`ObservableCell`]: a settable value with invalidation and change
//!   listeners.
//! - [`ListenerRegistry`]: the variant-sized listener storage behind every
//!   observable, safe to mutate from inside a notification.
//! - [`WeakInvalidationListener`] / [`WeakChangeListener`]: proxies that
//!   unregister themselves once their target is dropped.
//! - [`binding`]: lazily evaluated derived values, including short-circuit
//!   boolean combinators.
//!
//! # Architecture
//!
//! Everything is single-threaded: shared state is `Rc` plus `Cell` /
//! `RefCell`, and no type here is `Send`. Dispatch iterates `Rc`-aliased
//! snapshots of the listener arrays; listeners that add or remove listeners
//! while being notified cause a copy-on-write, so their changes only show up
//! on the next pass.
//!
//! Listener failures never reach the code that fired the event. They are
//! handed to the `"observable:error"` hook ([`hooks::on_observable_error`])
//! and logged through `tracing`.
//!
//! # Invariants
//!
//! 1. Listeners are notified in registration order, invalidation listeners
//!    before change listeners.
//! 2. Change listeners only run when the value differs from the last value
//!    they were told about.
//! 3. Registering a listener twice notifies it twice; removal drops the first
//!    registration.
//! 4. No `RefCell` borrow is held across a listener or compute call.

pub mod binding;
pub mod config;
pub mod error;
pub mod hooks;
pub mod listener;
pub mod observable;
pub mod registry;
pub mod weak;

pub use binding::boolean::{and, not, or};
pub use binding::{Binding, BindingCore, Compute, LazyBinding};
pub use config::{EngineConfig, TrimPolicy};
pub use error::{ConfigError, ListenerError, ListenerResult};
pub use listener::{
    ChangeListener, InvalidationListener, Listener, ListenerRef, WeakListener, change_fn,
    invalidation_fn,
};
pub use observable::{Observable, ObservableCell, ObservableValue};
pub use registry::{ListenerRegistry, RegistryCell, RegistryKind};
pub use weak::{WeakChangeListener, WeakInvalidationListener};
