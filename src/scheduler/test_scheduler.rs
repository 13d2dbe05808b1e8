use std::{
    cmp::Ordering as CmpOrdering,
    collections::BinaryHeap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use super::{Action, Scheduler};
use crate::subscription::subscribe::{lock, Subscription};

/// Deterministic virtual-time scheduler.
///
/// Scheduled actions only run from [`advance_by`](Self::advance_by),
/// [`advance_to`](Self::advance_to) or [`flush`](Self::flush), on the calling thread,
/// ordered by due time and then by scheduling order. Clones share the same clock
/// and queue.
#[derive(Clone, Default)]
pub struct TestScheduler(Arc<Mutex<TestState>>);

#[derive(Default)]
struct TestState {
    now: Duration,
    queue: BinaryHeap<ScheduledAction>,
    next_id: u64,
}

struct ScheduledAction {
    due: Duration,
    id: u64,
    action: Action,
    cancelled: Arc<AtomicBool>,
}

impl PartialEq for ScheduledAction {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.id == other.id
    }
}

impl Eq for ScheduledAction {}

impl PartialOrd for ScheduledAction {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledAction {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Min-heap: earlier due time first, then FIFO by id.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl TestScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `delta`, running everything that becomes due.
    pub fn advance_by(&self, delta: Duration) {
        let target = lock(&self.0).now + delta;
        self.advance_to(target);
    }

    /// Moves the clock to `target`, running everything due at or before it.
    ///
    /// Actions scheduled by running actions are picked up in the same call when they
    /// fall inside the window. The clock never moves backwards.
    pub fn advance_to(&self, target: Duration) {
        loop {
            let next = {
                let mut state = lock(&self.0);
                match state.queue.peek() {
                    Some(top) if top.due <= target => {
                        let item = state.queue.pop();
                        if let Some(item) = &item {
                            state.now = state.now.max(item.due);
                        }
                        item
                    }
                    _ => None,
                }
            };
            match next {
                Some(item) => {
                    if !item.cancelled.load(Ordering::Acquire) {
                        (item.action)();
                    }
                }
                None => break,
            }
        }
        let mut state = lock(&self.0);
        state.now = state.now.max(target);
    }

    /// Runs every action pending at call time, moving the clock to the latest due
    /// time among them. Periodic work rescheduled past that point stays queued.
    pub fn flush(&self) {
        let last_due = lock(&self.0).queue.iter().map(|a| a.due).max();
        if let Some(due) = last_due {
            self.advance_to(due);
        }
    }

    /// Number of queued actions that were not cancelled.
    pub fn pending(&self) -> usize {
        lock(&self.0)
            .queue
            .iter()
            .filter(|a| !a.cancelled.load(Ordering::Acquire))
            .count()
    }
}

impl Scheduler for TestScheduler {
    fn now(&self) -> Duration {
        lock(&self.0).now
    }

    fn schedule_after(&self, delay: Duration, action: Action) -> Subscription {
        let cancelled = Arc::new(AtomicBool::new(false));
        {
            let mut state = lock(&self.0);
            let id = state.next_id;
            state.next_id += 1;
            let due = state.now + delay;
            state.queue.push(ScheduledAction {
                due,
                id,
                action,
                cancelled: Arc::clone(&cancelled),
            });
        }
        Subscription::from_logic(move || cancelled.store(true, Ordering::Release))
    }
}
