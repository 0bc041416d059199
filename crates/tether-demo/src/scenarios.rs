//! Scripted walkthroughs of the engine.
//!
//! Every scenario returns the lines it wants printed and checks the outcome
//! it narrates, failing with [`DemoError::Scenario`] if the engine disagrees.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::config;
use tether_core::hooks;
use tether_core::{
    Binding, InvalidationListener, ListenerError, ListenerRegistry, Observable, ObservableCell,
    ObservableValue, WeakInvalidationListener, and, change_fn, invalidation_fn, or,
};

use crate::error::{DemoError, Result};

type Journal = Rc<RefCell<Vec<&'static str>>>;

fn recorder(journal: &Journal, name: &'static str) -> Rc<dyn InvalidationListener> {
    let journal = Rc::clone(journal);
    invalidation_fn(move |_| {
        journal.borrow_mut().push(name);
        Ok(())
    })
}

fn expect(scenario: &'static str, ok: bool, message: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(DemoError::scenario(scenario, message()))
    }
}

fn describe<T>(registry: &ListenerRegistry<T>) -> String
where
    T: Clone + PartialEq + 'static,
{
    format!(
        "{} ({} invalidation, {} change)",
        registry.kind().as_str(),
        registry.invalidation_listeners().len(),
        registry.change_listeners().len()
    )
}

/// Listeners adding and removing listeners while a pass is running.
pub fn dispatch() -> Result<Vec<String>> {
    const NAME: &str = "dispatch";
    let mut lines = Vec::new();
    let cell = ObservableCell::new(20);
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));

    let logger = recorder(&journal, "logger");
    let late = recorder(&journal, "late");
    let target = Rc::downgrade(&cell);
    let recruit_journal = Rc::clone(&journal);
    let (logger_handle, late_handle) = (Rc::clone(&logger), Rc::clone(&late));
    let recruiter = invalidation_fn(move |_| {
        recruit_journal.borrow_mut().push("recruiter");
        if let Some(cell) = target.upgrade()
            && !cell.has_listener(late_handle.as_ref())
        {
            cell.remove_listener(logger_handle.as_ref());
            cell.add_listener(Rc::clone(&late_handle));
        }
        Ok(())
    });

    cell.add_listener(Rc::clone(&logger));
    cell.add_listener(recruiter);
    lines.push(format!("registered: {}", describe(&cell.registry())));

    for (pass, value) in [(1, 21), (2, 22)] {
        journal.borrow_mut().clear();
        cell.set(value);
        let notified = journal.borrow().join(", ");
        tracing::info!(pass, notified = %notified, "dispatch pass finished");
        lines.push(format!("pass {pass} (value {value}): {notified}"));
    }

    let last_pass = journal.borrow().clone();
    expect(NAME, last_pass == ["recruiter", "late"], || {
        format!("second pass notified {last_pass:?}")
    })?;
    lines.push(format!("registry now: {}", describe(&cell.registry())));
    Ok(lines)
}

/// Which operand invalidations reach AND / OR bindings.
pub fn short_circuit() -> Result<Vec<String>> {
    const NAME: &str = "short-circuit";
    let mut lines = Vec::new();

    let op1 = ObservableCell::new(false);
    let op2 = ObservableCell::new(true);
    let both = and(op1.clone(), op2.clone());
    let either = or(op1.clone(), op2.clone());
    lines.push(format!("op1=false op2=true: and={} or={}", both.get(), either.get()));

    op2.set(false);
    lines.push(format!(
        "op2 -> false: and valid={} (short-circuited), or valid={}",
        both.is_valid(),
        either.is_valid()
    ));
    expect(NAME, both.is_valid() && !either.is_valid(), || {
        "op2 change should only reach the OR binding".to_string()
    })?;
    lines.push(format!("recomputed: and={} or={}", both.get(), either.get()));

    op1.set(true);
    lines.push(format!(
        "op1 -> true: and valid={}, or valid={}",
        both.is_valid(),
        either.is_valid()
    ));
    let _ = (both.get(), either.get());

    op2.set(true);
    lines.push(format!(
        "op2 -> true: and valid={}, or valid={} (short-circuited)",
        both.is_valid(),
        either.is_valid()
    ));
    expect(NAME, !both.is_valid() && either.is_valid(), || {
        "op2 change should only reach the AND binding".to_string()
    })?;
    lines.push(format!("before read: and {both}, or {either}"));
    lines.push(format!("recomputed: and={} or={}", both.get(), either.get()));

    both.dispose();
    either.dispose();
    Ok(lines)
}

/// A weak listener outliving its target, then a trim pass.
pub fn weak() -> Result<Vec<String>> {
    const NAME: &str = "weak";
    let mut lines = Vec::new();
    let policy = config::current().trim_policy;
    lines.push(format!("trim policy: {}", policy.as_str()));

    let cell = ObservableCell::new(0u32);
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let keep = recorder(&journal, "keep");
    let target = recorder(&journal, "weak target");
    let proxy: Rc<dyn InvalidationListener> =
        Rc::new(WeakInvalidationListener::from_dyn(&target));

    cell.add_listener(Rc::clone(&keep));
    cell.add_listener(Rc::clone(&proxy));
    cell.set(1);
    lines.push(format!("before drop, notified: {}", journal.borrow().join(", ")));

    drop(target);
    journal.borrow_mut().clear();
    cell.set(2);
    lines.push(format!("after drop, notified: {}", journal.borrow().join(", ")));
    lines.push(format!("registry: {}", describe(&cell.registry())));
    expect(NAME, !cell.has_listener(proxy.as_ref()), || {
        "proxy stayed registered after its target was dropped".to_string()
    })?;

    // A full Generic list with a reclaimed entry: the next add trims it.
    let crowded = ObservableCell::new(0u32);
    let first = recorder(&journal, "first");
    let doomed = recorder(&journal, "doomed");
    crowded.add_listener(Rc::clone(&first));
    crowded.add_listener(Rc::new(WeakInvalidationListener::from_dyn(&doomed)));
    drop(doomed);
    crowded.add_listener(recorder(&journal, "second"));

    if let ListenerRegistry::Generic(generic) = crowded.registry() {
        lines.push(format!(
            "after trim: {} slots used of {} allocated, {} live",
            generic.invalidation_len(),
            generic.invalidation_capacity(),
            crowded.registry().invalidation_listeners().len()
        ));
    }
    Ok(lines)
}

/// Failing listeners routed to the error hook while the rest still run.
pub fn failures() -> Result<Vec<String>> {
    const NAME: &str = "failures";
    let mut lines = Vec::new();
    let reported = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&reported);
    let _hook = hooks::on_observable_error(move |error: &ListenerError| {
        sink.borrow_mut().push(error.to_string());
    });

    let cell = ObservableCell::new(String::from("idle"));
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    cell.add_listener(invalidation_fn(|_| Err(ListenerError::failed("sensor offline"))));
    cell.add_listener(recorder(&journal, "healthy"));
    cell.add_change_listener(change_fn(
        |_: &dyn ObservableValue<String>, old: &String, new: &String| {
            Err(ListenerError::failed(format!("cannot apply {old} -> {new}")))
        },
    ));

    cell.set("running".to_string());
    lines.push(format!("still notified: {}", journal.borrow().join(", ")));
    for (index, message) in reported.borrow().iter().enumerate() {
        lines.push(format!("{} #{}: {message}", hooks::OBSERVABLE_ERROR, index + 1));
    }

    let count = reported.borrow().len();
    expect(NAME, count == 2 && journal.borrow().len() == 1, || {
        format!("expected 2 reported failures and 1 healthy call, got {count}")
    })?;
    Ok(lines)
}
