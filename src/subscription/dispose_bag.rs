use std::sync::{Arc, Mutex};

use super::subscribe::{lock, Subscription};

/// Aggregate owner of subscriptions that are released together.
///
/// Cloning a `DisposeBag` yields another handle to the same bag. Nothing happens on
/// drop; call [`dispose`](DisposeBag::dispose) when the owner goes away.
#[derive(Clone, Default)]
pub struct DisposeBag(Arc<Mutex<BagState>>);

#[derive(Default)]
struct BagState {
    members: Vec<Subscription>,
    disposed: bool,
}

impl DisposeBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `subscription` to the bag. A bag that was already disposed disposes the
    /// newcomer right away.
    pub fn insert(&self, mut subscription: Subscription) {
        let mut state = lock(&self.0);
        if state.disposed {
            drop(state);
            subscription.dispose();
            return;
        }
        state.members.push(subscription);
    }

    /// Disposes every member in insertion order and empties the bag.
    pub fn dispose(&self) {
        let members = {
            let mut state = lock(&self.0);
            state.disposed = true;
            std::mem::take(&mut state.members)
        };
        tracing::trace!(count = members.len(), "disposing bag");
        for mut s in members {
            s.dispose();
        }
    }

    pub fn is_disposed(&self) -> bool {
        lock(&self.0).disposed
    }

    pub fn len(&self) -> usize {
        lock(&self.0).members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(log: &Arc<Mutex<Vec<u32>>>, id: u32) -> Subscription {
        let log = Arc::clone(log);
        Subscription::from_logic(move || log.lock().unwrap().push(id))
    }

    #[test]
    fn disposes_members_in_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bag = DisposeBag::new();
        recording(&log, 1).disposed_by(&bag);
        recording(&log, 2).disposed_by(&bag);
        recording(&log, 3).disposed_by(&bag);
        assert_eq!(bag.len(), 3);

        bag.dispose();

        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
        assert!(bag.is_empty());
        assert!(bag.is_disposed());
    }

    #[test]
    fn second_dispose_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bag = DisposeBag::new();
        bag.insert(recording(&log, 1));
        bag.dispose();
        bag.dispose();
        assert_eq!(*log.lock().unwrap(), vec![1]);
    }

    #[test]
    fn insert_after_dispose_disposes_immediately() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bag = DisposeBag::new();
        bag.dispose();
        bag.insert(recording(&log, 9));
        assert_eq!(*log.lock().unwrap(), vec![9]);
        assert!(bag.is_empty());
    }
}
