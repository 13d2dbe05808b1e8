use std::time::Duration;

use tokio::{runtime, time::Instant};

use super::{Action, Scheduler};
use crate::{errors::ObservableError, subscription::subscribe::Subscription};

/// Runs scheduled actions as tasks on a tokio runtime.
///
/// The clock is `tokio::time::Instant`, so a runtime with a paused clock
/// (`tokio::time::pause`) drives this scheduler deterministically as well.
#[derive(Clone)]
pub struct TokioScheduler {
    handle: runtime::Handle,
    epoch: Instant,
}

impl TokioScheduler {
    pub fn new(handle: runtime::Handle) -> Self {
        TokioScheduler {
            handle,
            epoch: Instant::now(),
        }
    }

    /// Scheduler bound to the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns `ObservableError::RuntimeUnavailable` outside of a tokio runtime.
    pub fn current() -> Result<Self, ObservableError> {
        runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|_| ObservableError::RuntimeUnavailable)
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Duration {
        Instant::now().duration_since(self.epoch)
    }

    fn schedule_after(&self, delay: Duration, action: Action) -> Subscription {
        let task = self.handle.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            action();
        });
        Subscription::from_logic(move || task.abort())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::subscription::subscribe::Unsubscribeable;

    #[test]
    fn current_fails_outside_runtime() {
        assert!(matches!(
            TokioScheduler::current(),
            Err(ObservableError::RuntimeUnavailable)
        ));
    }

    #[tokio::test]
    async fn runs_action_after_delay() {
        let scheduler = TokioScheduler::current().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let _s = scheduler.schedule_after(
            Duration::from_millis(5),
            Box::new(move || {
                let _ = tx.send(42);
            }),
        );
        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn disposed_action_never_runs() {
        let scheduler = TokioScheduler::current().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_c = Arc::clone(&hits);
        let s = scheduler.schedule_after(
            Duration::from_millis(20),
            Box::new(move || {
                hits_c.fetch_add(1, Ordering::SeqCst);
            }),
        );
        s.unsubscribe();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
