//! Boolean combinators with short-circuit invalidation.
//!
//! [`and`] and [`or`] register one shared invalidator on both operands. An
//! invalidation from the second operand is ignored while the first operand
//! already decides the result (`false` for AND, `true` for OR), so the
//! binding stays Valid and its listeners hear nothing.
//!
//! [`not`] has no short circuit and goes through the generic
//! [`LazyBinding`] machinery.

use std::fmt;
use std::rc::{Rc, Weak};

use super::state::BindingCore;
use super::{Binding, Compute, LazyBinding};
use crate::error::ListenerResult;
use crate::listener::{ChangeListener, InvalidationListener, Listener, ListenerRef, WeakListener};
use crate::observable::{Observable, ObservableValue, same_observable};

/// Boolean connective of a [`ShortCircuitBinding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    /// First-operand value for which the second operand still matters.
    #[must_use]
    pub const fn pass_through(self) -> bool {
        match self {
            Self::And => true,
            Self::Or => false,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// An operand viewed both as a boolean value and as a plain observable.
struct Operand {
    value: Rc<dyn ObservableValue<bool>>,
    observable: Rc<dyn Observable>,
}

impl Operand {
    fn new<O: ObservableValue<bool> + 'static>(operand: Rc<O>) -> Self {
        Self {
            value: operand.clone(),
            observable: operand,
        }
    }
}

/// `op1 && op2` or `op1 || op2`, evaluated lazily and left to right.
pub struct ShortCircuitBinding {
    core: BindingCore<bool>,
    connective: Connective,
    op1: Operand,
    op2: Operand,
    invalidator: Rc<ShortCircuitInvalidator>,
}

impl ShortCircuitBinding {
    fn new(connective: Connective, op1: Operand, op2: Operand) -> Rc<Self> {
        let binding = Rc::new_cyclic(|this: &Weak<Self>| Self {
            core: BindingCore::new(),
            connective,
            op1,
            op2,
            invalidator: Rc::new(ShortCircuitInvalidator {
                binding: this.clone(),
            }),
        });
        let invalidator: Rc<dyn InvalidationListener> = binding.invalidator.clone();
        binding.op1.observable.add_listener(Rc::clone(&invalidator));
        binding.op2.observable.add_listener(invalidator);
        binding
    }

    #[must_use]
    pub fn connective(&self) -> Connective {
        self.connective
    }

    #[must_use]
    pub fn get(&self) -> bool {
        self.core.get(|| match self.connective {
            Connective::And => self.op1.value.value() && self.op2.value.value(),
            Connective::Or => self.op1.value.value() || self.op2.value.value(),
        })
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.core.version()
    }

    fn operand_invalidated(&self, source: &dyn Observable) {
        let from_first = same_observable(source, self.op1.observable.as_ref());
        if from_first
            || (self.core.is_valid() && self.op1.value.value() == self.connective.pass_through())
        {
            self.invalidate();
        }
    }
}

impl Observable for ShortCircuitBinding {
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

impl ObservableValue<bool> for ShortCircuitBinding {
    fn value(&self) -> bool {
        self.get()
    }

    fn add_change_listener(&self, listener: Rc<dyn ChangeListener<bool>>) {
        self.core.add_listener(self, Listener::Change(listener));
    }

    fn remove_change_listener(&self, listener: &dyn ChangeListener<bool>) {
        self.core.remove_listener(self, ListenerRef::Change(listener));
    }

    fn has_change_listener(&self, listener: &dyn ChangeListener<bool>) -> bool {
        self.core.has_listener(ListenerRef::Change(listener))
    }
}

impl Binding<bool> for ShortCircuitBinding {
    fn is_valid(&self) -> bool {
        self.core.is_valid()
    }

    fn invalidate(&self) {
        self.core.invalidate(self, || {});
    }

    fn dependencies(&self) -> Vec<Rc<dyn Observable>> {
        vec![
            Rc::clone(&self.op1.observable),
            Rc::clone(&self.op2.observable),
        ]
    }

    fn dispose(&self) {
        self.op1.observable.remove_listener(self.invalidator.as_ref());
        self.op2.observable.remove_listener(self.invalidator.as_ref());
    }
}

impl fmt::Display for ShortCircuitBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.core.describe(f)
    }
}

impl fmt::Debug for ShortCircuitBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortCircuitBinding")
            .field("connective", &self.connective)
            .field("core", &self.core)
            .finish()
    }
}

/// Listener shared by both operands of a [`ShortCircuitBinding`].
struct ShortCircuitInvalidator {
    binding: Weak<ShortCircuitBinding>,
}

impl InvalidationListener for ShortCircuitInvalidator {
    fn invalidated(&self, observable: &dyn Observable) -> ListenerResult {
        match self.binding.upgrade() {
            Some(binding) => binding.operand_invalidated(observable),
            None => {
                tracing::debug!("short-circuit binding reclaimed, invalidator unregistering");
                observable.remove_listener(self);
            }
        }
        Ok(())
    }

    fn as_weak_listener(&self) -> Option<&dyn WeakListener> {
        Some(self)
    }
}

impl WeakListener for ShortCircuitInvalidator {
    fn was_garbage_collected(&self) -> bool {
        self.binding.strong_count() == 0
    }
}

/// Negation of a boolean operand.
pub struct Negate {
    operand: Rc<dyn ObservableValue<bool>>,
}

impl Compute<bool> for Negate {
    fn compute_value(&self) -> bool {
        !self.operand.value()
    }
}

/// Binding returned by [`not`].
pub type NotBinding = LazyBinding<bool, Negate>;

/// Short-circuiting `op1 && op2`.
#[must_use]
pub fn and<A, B>(op1: Rc<A>, op2: Rc<B>) -> Rc<ShortCircuitBinding>
where
    A: ObservableValue<bool> + 'static,
    B: ObservableValue<bool> + 'static,
{
    ShortCircuitBinding::new(Connective::And, Operand::new(op1), Operand::new(op2))
}

/// Short-circuiting `op1 || op2`.
#[must_use]
pub fn or<A, B>(op1: Rc<A>, op2: Rc<B>) -> Rc<ShortCircuitBinding>
where
    A: ObservableValue<bool> + 'static,
    B: ObservableValue<bool> + 'static,
{
    ShortCircuitBinding::new(Connective::Or, Operand::new(op1), Operand::new(op2))
}

/// `!op`. Disposing the result unbinds it from `op`.
#[must_use]
pub fn not<O>(op: Rc<O>) -> Rc<NotBinding>
where
    O: ObservableValue<bool> + 'static,
{
    let operand: Rc<dyn ObservableValue<bool>> = op.clone();
    let dependency: Rc<dyn Observable> = op;
    LazyBinding::bound(Negate { operand }, &[dependency])
}
