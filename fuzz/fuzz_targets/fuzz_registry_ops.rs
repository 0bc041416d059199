#![no_main]

use std::cell::RefCell;
use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tether_core::config::{self, EngineConfig};
use tether_core::{
    InvalidationListener, Observable, ObservableCell, TrimPolicy, WeakInvalidationListener,
    invalidation_fn,
};

const SLOTS: usize = 6;

#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Add(u8),
    AddWeak(u8),
    Remove(u8),
    DropTarget(u8),
    Set(i16),
    /// Install a listener that adds slot `add` and removes slot `remove`
    /// every time it is notified.
    Mutator { add: u8, remove: u8 },
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    legacy_trim: bool,
    ops: Vec<FuzzOp>,
}

type Pool = Rc<RefCell<Vec<Option<Rc<dyn InvalidationListener>>>>>;

fn slot(pool: &Pool, index: u8) -> Option<Rc<dyn InvalidationListener>> {
    pool.borrow()[usize::from(index) % SLOTS].clone()
}

fuzz_target!(|input: FuzzInput| {
    let policy = if input.legacy_trim {
        TrimPolicy::Legacy
    } else {
        TrimPolicy::Reclaim
    };
    let _config = config::install(EngineConfig::default().with_trim_policy(policy));
    let cell = ObservableCell::new(0i16);
    let pool: Pool = Rc::new(RefCell::new(
        (0..SLOTS)
            .map(|_| Some(invalidation_fn(|_| Ok(())) as Rc<dyn InvalidationListener>))
            .collect(),
    ));

    for op in input.ops.into_iter().take(128) {
        match op {
            FuzzOp::Add(index) => {
                if let Some(listener) = slot(&pool, index) {
                    cell.add_listener(listener);
                }
            }
            FuzzOp::AddWeak(index) => {
                if let Some(listener) = slot(&pool, index) {
                    cell.add_listener(Rc::new(WeakInvalidationListener::from_dyn(&listener)));
                }
            }
            FuzzOp::Remove(index) => {
                if let Some(listener) = slot(&pool, index) {
                    cell.remove_listener(listener.as_ref());
                }
            }
            FuzzOp::DropTarget(index) => {
                pool.borrow_mut()[usize::from(index) % SLOTS] = None;
            }
            FuzzOp::Set(value) => cell.set(value),
            FuzzOp::Mutator { add, remove } => {
                let target = Rc::downgrade(&cell);
                let pool = Rc::clone(&pool);
                cell.add_listener(invalidation_fn(move |_| {
                    if let Some(cell) = target.upgrade() {
                        if let Some(listener) = slot(&pool, add) {
                            cell.add_listener(listener);
                        }
                        if let Some(listener) = slot(&pool, remove) {
                            cell.remove_listener(listener.as_ref());
                        }
                    }
                    Ok(())
                }));
            }
        }

        let live = cell.registry().invalidation_listeners();
        for listener in [live.first(), live.last()].into_iter().flatten() {
            assert!(cell.has_listener(listener.as_ref()));
        }
    }
});
