//! Listener mocks shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tether_core::{
    ChangeListener, InvalidationListener, ListenerError, ListenerResult, Observable,
    ObservableValue,
};

fn addr<O: ?Sized>(observable: &O) -> *const () {
    std::ptr::from_ref(observable).cast::<()>()
}

/// Records invalidation calls.
#[derive(Default)]
pub struct InvalidationListenerMock {
    last: Cell<Option<*const ()>>,
    count: Cell<usize>,
    fail_with: RefCell<Option<String>>,
}

impl InvalidationListenerMock {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// A mock that records the call and then fails with `message`.
    pub fn failing(message: &str) -> Rc<Self> {
        let mock = Self::default();
        *mock.fail_with.borrow_mut() = Some(message.to_string());
        Rc::new(mock)
    }

    /// Assert the last call came from `observable` and the call count, then
    /// reset.
    #[track_caller]
    pub fn check<O: ?Sized>(&self, observable: &O, count: usize) {
        assert_eq!(self.last.get(), Some(addr(observable)), "observable mismatch");
        assert_eq!(self.count.get(), count, "call count mismatch");
        self.reset();
    }

    /// Assert that no call happened since the last reset.
    #[track_caller]
    pub fn check_untouched(&self) {
        assert_eq!(self.last.get(), None, "unexpected invalidation");
        assert_eq!(self.count.get(), 0);
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }

    pub fn reset(&self) {
        self.last.set(None);
        self.count.set(0);
    }
}

impl InvalidationListener for InvalidationListenerMock {
    fn invalidated(&self, observable: &dyn Observable) -> ListenerResult {
        self.last.set(Some(addr(observable)));
        self.count.set(self.count.get() + 1);
        match self.fail_with.borrow().as_deref() {
            Some(message) => Err(ListenerError::failed(message)),
            None => Ok(()),
        }
    }
}

/// Records change calls.
pub struct ChangeListenerMock<T> {
    last: RefCell<Option<(*const (), T, T)>>,
    count: Cell<usize>,
    fail_with: RefCell<Option<String>>,
}

impl<T: Clone + PartialEq + std::fmt::Debug> ChangeListenerMock<T> {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            last: RefCell::new(None),
            count: Cell::new(0),
            fail_with: RefCell::new(None),
        })
    }

    pub fn failing(message: &str) -> Rc<Self> {
        let mock = Self::new();
        *mock.fail_with.borrow_mut() = Some(message.to_string());
        mock
    }

    /// Assert the last call and the call count, then reset.
    #[track_caller]
    pub fn check<O: ?Sized>(&self, observable: &O, old_value: T, new_value: T, count: usize) {
        let last = self.last.borrow_mut().take();
        assert_eq!(
            last,
            Some((addr(observable), old_value, new_value)),
            "last change mismatch"
        );
        assert_eq!(self.count.get(), count, "call count mismatch");
        self.count.set(0);
    }

    /// Assert that no change was delivered since the last reset.
    #[track_caller]
    pub fn check_untouched(&self) {
        assert!(self.last.borrow().is_none(), "unexpected change event");
        assert_eq!(self.count.get(), 0);
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }

    pub fn reset(&self) {
        self.last.borrow_mut().take();
        self.count.set(0);
    }
}

impl<T: Clone> ChangeListener<T> for ChangeListenerMock<T> {
    fn changed(
        &self,
        observable: &dyn ObservableValue<T>,
        old_value: &T,
        new_value: &T,
    ) -> ListenerResult {
        *self.last.borrow_mut() = Some((addr(observable), old_value.clone(), new_value.clone()));
        self.count.set(self.count.get() + 1);
        match self.fail_with.borrow().as_deref() {
            Some(message) => Err(ListenerError::failed(message)),
            None => Ok(()),
        }
    }
}
