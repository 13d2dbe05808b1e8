use std::sync::{Arc, Mutex};

use super::subscribe::{lock, Subscription};

/// Holds at most one subscription; replacing it disposes the previous one.
///
/// Operators use it where the upstream subscription only becomes available after
/// `subscribe` returns but may need disposing from inside a callback that already
/// ran (synchronous sources): if the slot was disposed first, the late subscription
/// is disposed as soon as it is stored.
#[derive(Clone, Default)]
pub struct SerialSubscription(Arc<Mutex<SerialState>>);

#[derive(Default)]
struct SerialState {
    current: Option<Subscription>,
    disposed: bool,
}

impl SerialSubscription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `subscription`, disposing whatever was stored before.
    pub fn replace(&self, mut subscription: Subscription) {
        let previous = {
            let mut state = lock(&self.0);
            if state.disposed {
                None
            } else {
                Some(state.current.replace(subscription.take()))
            }
        };
        match previous {
            // Slot already disposed: release the newcomer.
            None => subscription.dispose(),
            Some(Some(mut old)) => old.dispose(),
            Some(None) => {}
        }
    }

    /// Disposes the stored subscription, if any, and any later one.
    pub fn dispose(&self) {
        let current = {
            let mut state = lock(&self.0);
            state.disposed = true;
            state.current.take()
        };
        if let Some(mut s) = current {
            s.dispose();
        }
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.0).disposed
    }
}

impl Subscription {
    // Moves the logic out, leaving an inert subscription behind.
    pub(crate) fn take(&mut self) -> Subscription {
        std::mem::replace(self, Subscription::nil())
    }
}
