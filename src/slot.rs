//! Per-thread result slots.
//!
//! Every engine instance owns a [`ResultSlot`] identified by a process-unique
//! owner id. The stored values live in thread-local storage keyed by that id,
//! so a thread only ever reads or writes its own value and unrelated callers
//! never contend on a shared lock.
//!
//! Live owner ids are tracked in a process-wide set. Dropping a slot removes
//! its id and bumps a retirement counter; each thread sweeps entries of retired
//! owners the next time it touches its storage, so long-lived worker threads do
//! not accumulate values of engines that no longer exist.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashSet;

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);
static LIVE_OWNERS: LazyLock<DashSet<u64>> = LazyLock::new(DashSet::new);
static RETIRED: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static SLOTS: RefCell<LocalSlots> = RefCell::new(LocalSlots::default());
}

/// One thread's values, keyed by owner id.
#[derive(Default)]
struct LocalSlots {
    values: HashMap<u64, Box<dyn Any>>,
    swept_at: u64,
}

impl LocalSlots {
    /// Drop entries whose owner has been retired since the last sweep.
    fn sweep(&mut self) {
        let retired = RETIRED.load(Ordering::Acquire);
        if retired == self.swept_at {
            return;
        }
        self.values.retain(|owner, _| LIVE_OWNERS.contains(owner));
        self.swept_at = retired;
    }
}

/// Handle to one engine's per-thread result storage.
pub(crate) struct ResultSlot<R> {
    owner: u64,
    _value: PhantomData<fn() -> R>,
}

impl<R> ResultSlot<R> {
    pub(crate) fn new() -> Self {
        let owner = NEXT_OWNER.fetch_add(1, Ordering::Relaxed);
        LIVE_OWNERS.insert(owner);
        Self {
            owner,
            _value: PhantomData,
        }
    }

    /// Forget the calling thread's value.
    pub(crate) fn clear(&self) {
        // Ignore access errors during thread teardown.
        let _ = SLOTS.try_with(|slots| {
            let mut slots = slots.borrow_mut();
            slots.sweep();
            slots.values.remove(&self.owner);
        });
    }
}

impl<R: Clone + 'static> ResultSlot<R> {
    /// Overwrite the calling thread's value. `None` empties the slot.
    pub(crate) fn store(&self, value: Option<R>) {
        match value {
            Some(value) => SLOTS.with(|slots| {
                let mut slots = slots.borrow_mut();
                slots.sweep();
                slots.values.insert(self.owner, Box::new(value));
            }),
            None => self.clear(),
        }
    }

    /// The calling thread's value, if any.
    pub(crate) fn load(&self) -> Option<R> {
        SLOTS.with(|slots| {
            let mut slots = slots.borrow_mut();
            slots.sweep();
            slots
                .values
                .get(&self.owner)
                .and_then(|value| value.downcast_ref::<R>())
                .cloned()
        })
    }
}

impl<R> Drop for ResultSlot<R> {
    fn drop(&mut self) {
        // The id must leave the live set before the counter moves, so a thread
        // that observes the new count also observes the removal.
        LIVE_OWNERS.remove(&self.owner);
        RETIRED.fetch_add(1, Ordering::Release);
        self.clear();
    }
}
