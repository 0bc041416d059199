#![forbid(unsafe_code)]

//! Dispatch behaviour of the listener registry, driven through
//! [`ObservableCell`].

mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::{ChangeListenerMock, InvalidationListenerMock};
use tether_core::config::{self, EngineConfig};
use tether_core::hooks;
use tether_core::{
    ChangeListener, InvalidationListener, ListenerRegistry, Observable, ObservableCell,
    ObservableValue, RegistryKind, TrimPolicy, WeakInvalidationListener, invalidation_fn,
};

fn collect_errors() -> (Rc<RefCell<Vec<String>>>, hooks::HookGuard) {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    let guard = hooks::on_observable_error(move |err| sink.borrow_mut().push(err.to_string()));
    (errors, guard)
}

// ── Empty registry ──────────────────────────────────────────────────────

#[test]
fn empty_registry_ignores_remove_and_fire() {
    let cell = ObservableCell::new(0);
    let (errors, _guard) = collect_errors();
    let stranger = InvalidationListenerMock::new();

    cell.remove_listener(stranger.as_ref());
    cell.fire_value_changed_event();

    assert_eq!(cell.registry().kind(), RegistryKind::Empty);
    assert!(errors.borrow().is_empty());
    stranger.check_untouched();
}

// ── Single listeners ────────────────────────────────────────────────────

#[test]
fn single_invalidation_listener() {
    let cell = ObservableCell::new(0);
    let listener = InvalidationListenerMock::new();

    cell.add_listener(listener.clone());
    cell.fire_value_changed_event();
    listener.check(cell.as_ref(), 1);

    cell.remove_listener(listener.as_ref());
    cell.fire_value_changed_event();
    listener.check_untouched();
}

#[test]
fn single_change_listener() {
    let cell = ObservableCell::new(String::from("a"));
    let listener = ChangeListenerMock::new();

    cell.add_change_listener(listener.clone());
    cell.set("b".to_string());
    listener.check(cell.as_ref(), "a".to_string(), "b".to_string(), 1);

    cell.set("b".to_string());
    listener.check_untouched();

    cell.remove_change_listener(listener.as_ref());
    cell.set("c".to_string());
    listener.check_untouched();
}

#[test]
fn single_variants_only_remove_their_own_kind() {
    let cell = ObservableCell::new(0);
    let listener = InvalidationListenerMock::new();
    let other = ChangeListenerMock::<i32>::new();

    cell.add_listener(listener.clone());
    cell.remove_change_listener(other.as_ref());
    assert_eq!(cell.registry().kind(), RegistryKind::SingleInvalidation);
}

// ── Generic ─────────────────────────────────────────────────────────────

#[test]
fn invalidation_before_change_in_registration_order() {
    let cell = ObservableCell::new(0);
    let order = Rc::new(RefCell::new(Vec::new()));

    let log = Rc::clone(&order);
    let change: Rc<dyn ChangeListener<i32>> = tether_core::change_fn(
        move |_: &dyn ObservableValue<i32>, _: &i32, _: &i32| {
            log.borrow_mut().push("change");
            Ok(())
        },
    );
    cell.add_change_listener(change);

    for name in ["first", "second"] {
        let log = Rc::clone(&order);
        cell.add_listener(invalidation_fn(move |_| {
            log.borrow_mut().push(name);
            Ok(())
        }));
    }

    cell.set(1);
    assert_eq!(*order.borrow(), vec!["first", "second", "change"]);
}

#[test]
fn duplicates_are_counted_independently() {
    let cell = ObservableCell::new(0);
    let listener = InvalidationListenerMock::new();

    cell.add_listener(listener.clone());
    cell.add_listener(listener.clone());
    assert_eq!(cell.registry().kind(), RegistryKind::Generic);

    cell.fire_value_changed_event();
    listener.check(cell.as_ref(), 2);

    cell.remove_listener(listener.as_ref());
    cell.fire_value_changed_event();
    listener.check(cell.as_ref(), 1);
    assert!(cell.has_listener(listener.as_ref()));
}

#[test]
fn change_listeners_need_a_different_value() {
    let cell = ObservableCell::new(1);
    let invalidation = InvalidationListenerMock::new();
    let change = ChangeListenerMock::new();
    cell.add_listener(invalidation.clone());
    cell.add_change_listener(change.clone());

    cell.set(1);
    invalidation.check(cell.as_ref(), 1);
    change.check_untouched();

    cell.set(2);
    invalidation.check(cell.as_ref(), 1);
    change.check(cell.as_ref(), 1, 2, 1);
}

#[test]
fn absent_values_take_part_in_change_detection() {
    let cell = ObservableCell::new(None::<i32>);
    let change = ChangeListenerMock::new();
    cell.add_listener(InvalidationListenerMock::new());
    cell.add_change_listener(change.clone());

    cell.set(None);
    change.check_untouched();
    cell.set(Some(3));
    change.check(cell.as_ref(), None, Some(3), 1);
    cell.set(None);
    change.check(cell.as_ref(), Some(3), None, 1);
}

#[test]
fn collapsed_generic_behaves_like_single_change() {
    let collapsed = ObservableCell::new(0);
    let direct = ObservableCell::new(0);
    let invalidation = InvalidationListenerMock::new();
    let collapsed_change = ChangeListenerMock::new();
    let direct_change = ChangeListenerMock::new();

    collapsed.add_listener(invalidation.clone());
    collapsed.add_change_listener(collapsed_change.clone());
    collapsed.remove_listener(invalidation.as_ref());
    direct.add_change_listener(direct_change.clone());

    assert_eq!(collapsed.registry().kind(), RegistryKind::SingleChange);
    assert_eq!(collapsed.registry().kind(), direct.registry().kind());

    for value in [0, 1, 1, 2] {
        collapsed.set(value);
        direct.set(value);
        assert_eq!(collapsed_change.count(), direct_change.count());
    }
    collapsed_change.check(collapsed.as_ref(), 1, 2, 2);
    direct_change.check(direct.as_ref(), 1, 2, 2);
    invalidation.check_untouched();
}

#[test]
fn generic_collapses_back_to_empty() {
    let cell = ObservableCell::new(0);
    let a = InvalidationListenerMock::new();
    let b = InvalidationListenerMock::new();
    let c = InvalidationListenerMock::new();
    cell.add_listener(a.clone());
    cell.add_listener(b.clone());
    cell.add_listener(c.clone());

    cell.remove_listener(b.as_ref());
    assert_eq!(cell.registry().kind(), RegistryKind::Generic);
    cell.remove_listener(a.as_ref());
    assert_eq!(cell.registry().kind(), RegistryKind::SingleInvalidation);
    assert!(cell.has_listener(c.as_ref()));
    cell.remove_listener(c.as_ref());
    assert_eq!(cell.registry().kind(), RegistryKind::Empty);
}

#[test]
fn removing_unknown_listener_from_generic_is_a_noop() {
    let cell = ObservableCell::new(0);
    let a = InvalidationListenerMock::new();
    let b = InvalidationListenerMock::new();
    cell.add_listener(a.clone());
    cell.add_listener(b.clone());

    cell.remove_listener(InvalidationListenerMock::new().as_ref());
    assert_eq!(cell.registry().invalidation_listeners().len(), 2);
}

// ── Mutation during dispatch ────────────────────────────────────────────

#[test]
fn listener_added_during_dispatch_runs_next_pass() {
    let cell = ObservableCell::new(0);
    let late = InvalidationListenerMock::new();
    let added = Rc::new(Cell::new(false));

    let target = Rc::clone(&cell);
    let late_handle = late.clone();
    let flag = Rc::clone(&added);
    cell.add_listener(invalidation_fn(move |_| {
        if !flag.replace(true) {
            target.add_listener(late_handle.clone());
        }
        Ok(())
    }));
    cell.add_listener(InvalidationListenerMock::new());

    cell.fire_value_changed_event();
    late.check_untouched();

    cell.fire_value_changed_event();
    late.check(cell.as_ref(), 1);
}

#[test]
fn listener_removed_during_dispatch_still_runs_this_pass() {
    let cell = ObservableCell::new(0);
    let victim = InvalidationListenerMock::new();

    let target = Rc::clone(&cell);
    let victim_handle = victim.clone();
    cell.add_listener(invalidation_fn(move |_| {
        target.remove_listener(victim_handle.as_ref());
        Ok(())
    }));
    cell.add_listener(victim.clone());
    cell.add_listener(InvalidationListenerMock::new());

    cell.fire_value_changed_event();
    victim.check(cell.as_ref(), 1);

    cell.fire_value_changed_event();
    victim.check_untouched();
}

#[test]
fn self_removal_during_dispatch() {
    let cell = ObservableCell::new(0);
    let calls = Rc::new(Cell::new(0u32));
    let holder: Rc<RefCell<Option<Rc<dyn InvalidationListener>>>> = Rc::new(RefCell::new(None));

    let target = Rc::clone(&cell);
    let counter = Rc::clone(&calls);
    let me = Rc::clone(&holder);
    let listener: Rc<dyn InvalidationListener> = invalidation_fn(move |_| {
        counter.set(counter.get() + 1);
        if let Some(me) = me.borrow().as_ref() {
            target.remove_listener(me.as_ref());
        }
        Ok(())
    });
    *holder.borrow_mut() = Some(Rc::clone(&listener));
    cell.add_listener(Rc::clone(&listener));
    cell.add_listener(InvalidationListenerMock::new());

    cell.fire_value_changed_event();
    cell.fire_value_changed_event();
    assert_eq!(calls.get(), 1);
    holder.borrow_mut().take();
}

#[test]
fn self_removal_collapsing_to_single_change_does_not_replay_the_change() {
    let cell = ObservableCell::new(0);
    let change = ChangeListenerMock::new();
    let holder: Rc<RefCell<Option<Rc<dyn InvalidationListener>>>> = Rc::new(RefCell::new(None));

    let target = Rc::downgrade(&cell);
    let me = Rc::clone(&holder);
    let one_shot: Rc<dyn InvalidationListener> = invalidation_fn(move |_| {
        if let Some(cell) = target.upgrade()
            && let Some(me) = me.borrow().as_ref()
        {
            cell.remove_listener(me.as_ref());
        }
        Ok(())
    });
    *holder.borrow_mut() = Some(Rc::clone(&one_shot));
    cell.add_listener(Rc::clone(&one_shot));
    cell.add_change_listener(change.clone());

    cell.set(1);
    assert_eq!(cell.registry().kind(), RegistryKind::SingleChange);
    change.check(cell.as_ref(), 0, 1, 1);

    cell.fire_value_changed_event();
    change.check_untouched();

    cell.set(2);
    change.check(cell.as_ref(), 1, 2, 1);
    holder.borrow_mut().take();
}

#[test]
fn change_listener_setting_the_value_reenters() {
    let cell = ObservableCell::new(0);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let target = Rc::clone(&cell);
    let log = Rc::clone(&seen);
    cell.add_change_listener(tether_core::change_fn(
        move |_: &dyn ObservableValue<i32>, old: &i32, new: &i32| {
            log.borrow_mut().push((*old, *new));
            if *new < 3 {
                target.set(*new + 1);
            }
            Ok(())
        },
    ));
    cell.add_listener(InvalidationListenerMock::new());

    cell.set(1);
    assert_eq!(*seen.borrow(), vec![(0, 1), (1, 2), (2, 3)]);
    assert_eq!(cell.get(), 3);
}

// ── Failures ────────────────────────────────────────────────────────────

#[test]
fn failing_listeners_are_isolated_and_reported_in_order() {
    let cell = ObservableCell::new(0);
    let (errors, _guard) = collect_errors();
    let healthy = InvalidationListenerMock::new();
    let change = ChangeListenerMock::new();

    cell.add_listener(InvalidationListenerMock::failing("first"));
    cell.add_listener(healthy.clone());
    cell.add_change_listener(ChangeListenerMock::failing("second"));
    cell.add_change_listener(change.clone());

    cell.set(1);

    healthy.check(cell.as_ref(), 1);
    change.check(cell.as_ref(), 0, 1, 1);
    assert_eq!(
        *errors.borrow(),
        vec![
            "listener failed: first".to_string(),
            "listener failed: second".to_string()
        ]
    );
}

#[test]
fn single_listener_failure_reaches_the_hook() {
    let cell = ObservableCell::new(0);
    let (errors, _guard) = collect_errors();
    let _quiet = config::install(EngineConfig::default().with_log_listener_errors(false));
    cell.add_listener(InvalidationListenerMock::failing("lonely"));

    cell.fire_value_changed_event();
    assert_eq!(*errors.borrow(), vec!["listener failed: lonely".to_string()]);
}

// ── Trim policy ─────────────────────────────────────────────────────────

fn generic_after_reclaim(policy: TrimPolicy) -> (Rc<ObservableCell<i32>>, Vec<Rc<InvalidationListenerMock>>) {
    let _config = config::install(EngineConfig::default().with_trim_policy(policy));
    let cell = ObservableCell::new(0);
    let a = InvalidationListenerMock::new();
    let b = InvalidationListenerMock::new();
    let doomed = InvalidationListenerMock::new();

    cell.add_listener(a.clone());
    cell.add_listener(Rc::new(WeakInvalidationListener::new(&doomed)));
    drop(doomed);
    cell.add_listener(b.clone());
    (cell, vec![a, b])
}

#[test]
fn reclaim_policy_reuses_freed_slots() {
    let (cell, live) = generic_after_reclaim(TrimPolicy::Reclaim);
    let ListenerRegistry::Generic(generic) = cell.registry() else {
        panic!("expected a generic registry");
    };
    assert_eq!(generic.trim_policy(), TrimPolicy::Reclaim);
    assert_eq!(generic.invalidation_len(), 2);
    assert_eq!(generic.invalidation_capacity(), 2);

    cell.fire_value_changed_event();
    for listener in &live {
        listener.check(cell.as_ref(), 1);
    }
}

#[test]
fn legacy_policy_grows_and_leaves_holes() {
    let (cell, live) = generic_after_reclaim(TrimPolicy::Legacy);
    let ListenerRegistry::Generic(generic) = cell.registry() else {
        panic!("expected a generic registry");
    };
    assert_eq!(generic.trim_policy(), TrimPolicy::Legacy);
    assert_eq!(generic.invalidation_len(), 3);
    assert_eq!(generic.invalidation_capacity(), 4);
    assert_eq!(cell.registry().invalidation_listeners().len(), 2);

    cell.fire_value_changed_event();
    for listener in &live {
        listener.check(cell.as_ref(), 1);
    }
}
