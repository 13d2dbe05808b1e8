use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use super::subscribe::{lock, Subscription};

/// Subscriptions keyed by id, each removable on its own.
///
/// A key is reserved before the subscription exists, since a synchronous source
/// may finish (and [`release`](Self::release) its key) before `subscribe` returns.
/// Parking a subscription under a released key, or after the set was disposed,
/// disposes it immediately.
#[derive(Clone, Default)]
pub(crate) struct KeyedSubscriptions(Arc<Mutex<KeyedState>>);

#[derive(Default)]
struct KeyedState {
    next_key: u64,
    live: HashMap<u64, Option<Subscription>>,
    disposed: bool,
}

impl KeyedSubscriptions {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reserve(&self) -> u64 {
        let mut state = lock(&self.0);
        let key = state.next_key;
        state.next_key += 1;
        if !state.disposed {
            state.live.insert(key, None);
        }
        key
    }

    pub(crate) fn park(&self, key: u64, mut subscription: Subscription) {
        {
            let mut state = lock(&self.0);
            if let Some(slot) = state.live.get_mut(&key) {
                if slot.is_none() {
                    *slot = Some(subscription.take());
                    return;
                }
            }
        }
        subscription.dispose();
    }

    /// Removes `key`, disposing the subscription parked under it.
    pub(crate) fn release(&self, key: u64) {
        let parked = lock(&self.0).live.remove(&key).flatten();
        if let Some(mut s) = parked {
            s.dispose();
        }
    }

    /// Removes `key` without disposing what was parked under it.
    pub(crate) fn forget(&self, key: u64) {
        let _parked = lock(&self.0).live.remove(&key);
    }

    pub(crate) fn dispose(&self) {
        let parked: Vec<Subscription> = {
            let mut state = lock(&self.0);
            state.disposed = true;
            state.live.drain().filter_map(|(_, s)| s).collect()
        };
        for mut s in parked {
            s.dispose();
        }
    }

    /// Number of keys reserved and not yet released.
    pub(crate) fn len(&self) -> usize {
        lock(&self.0).live.len()
    }
}
