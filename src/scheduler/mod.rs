//! Where and when deferred work runs.
//!
//! Time based operators (`interval`, `timer`, `delay`, `buffer`, `observe_on`) and
//! the time-aware `ReplaySubject` never touch a clock or spawn work themselves: they
//! go through an injected [`Scheduler`]. Tests use [`TestScheduler`], whose virtual
//! clock only moves when told to; applications use [`TokioScheduler`].

mod test_scheduler;
mod tokio_scheduler;

use std::{sync::Arc, time::Duration};

use crate::subscription::subscribe::Subscription;

pub use test_scheduler::TestScheduler;
pub use tokio_scheduler::TokioScheduler;

/// Boxed unit of deferred work.
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// Scheduler handle as stored by operators.
pub type SharedScheduler = Arc<dyn Scheduler>;

pub trait Scheduler: Send + Sync {
    /// Time elapsed since the scheduler's own epoch.
    fn now(&self) -> Duration;

    /// Runs `action` once `delay` has elapsed. Disposing the returned subscription
    /// before that cancels the action.
    fn schedule_after(&self, delay: Duration, action: Action) -> Subscription;
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn schedule_after(&self, delay: Duration, action: Action) -> Subscription {
        (**self).schedule_after(delay, action)
    }
}
