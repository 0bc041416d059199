#![forbid(unsafe_code)]

//! Lazily evaluated bindings.
//!
//! A binding is an [`ObservableValue`] whose value is derived from other
//! observables and cached until one of them fires an invalidation.
//!
//! - [`BindingCore`]: the Valid/Invalid state machine, cached value, version
//!   and listener registry shared by every binding.
//! - [`LazyBinding`]: generic binding driven by a [`Compute`] strategy.
//! - [`boolean`]: short-circuiting `and` / `or` and `not`.
//!
//! # Invariants
//!
//! 1. A binding starts Invalid; the first read computes and caches.
//! 2. Reads while Valid never recompute.
//! 3. An invalidation fired while Invalid is swallowed, so listeners hear at
//!    most one invalidation per computed value.
//! 4. Dependencies hold bindings only weakly.

pub mod boolean;
mod lazy;
mod observer;
mod state;

use std::rc::Rc;

use crate::observable::{Observable, ObservableValue};

pub use lazy::{Compute, LazyBinding};
pub use observer::BindingObserver;
pub use state::BindingCore;

/// An observable value derived from dependencies.
pub trait Binding<T>: ObservableValue<T> {
    fn is_valid(&self) -> bool;

    /// Mark the binding Invalid and notify its listeners if it was Valid.
    fn invalidate(&self);

    /// Observables this binding currently depends on.
    fn dependencies(&self) -> Vec<Rc<dyn Observable>>;

    /// Release the dependencies the binding registered itself on.
    fn dispose(&self);
}

fn same_dependency(a: &Rc<dyn Observable>, b: &Rc<dyn Observable>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}
