use std::{marker::PhantomData, sync::Arc, time::Duration};

use super::{
    state::{ReplayPolicy, SubjectCore},
    SubjectEmitter, SubjectReceiver,
};
use crate::scheduler::Scheduler;

/// Specifies the buffer size for replaying previous emissions in `ReplaySubject`
/// and the `replay` family of operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufSize {
    /// Specifies an infinite buffer size, allowing all emitted values to be replayed.
    Unbounded,

    /// Specifies a limited buffer size with the maximum number of values to be replayed.
    Bounded(usize),
}

impl BufSize {
    pub(crate) fn limit(self) -> Option<usize> {
        match self {
            BufSize::Unbounded => None,
            BufSize::Bounded(n) => Some(n),
        }
    }
}

/// Replaying old values to new subscribers, this variant of a subject emits these
/// values upon subscription.
///
/// A `ReplaySubject` keeps up to [`BufSize`] of the latest values and delivers them,
/// in order, to every new observer before `subscribe` returns. Even after completion
/// or an error it replays the buffer before the terminal event.
///
/// With [`emitter_receiver_time_aware`](Self::emitter_receiver_time_aware) values
/// additionally expire once they are older than a time window, measured on the
/// given scheduler.
///
/// # Example
///
/// ```no_run
/// use rxcore::{
///     subjects::{BufSize, ReplaySubject},
///     subscribe::Subscriber,
///     Observer, Subscribeable,
/// };
///
/// let (mut emitter, receiver) = ReplaySubject::emitter_receiver(BufSize::Bounded(2));
///
/// emitter.next(1);
/// emitter.next(2);
/// emitter.next(3);
///
/// // Prints "replayed 2" and "replayed 3".
/// receiver.subscribe(Subscriber::on_next(|v| println!("replayed {}", v)));
/// ```
pub struct ReplaySubject<T>(PhantomData<T>);

impl<T: Clone + Send + 'static> ReplaySubject<T> {
    /// Creates a new pair of `SubjectEmitter` for emitting values and
    /// `SubjectReceiver` for subscribing to values.
    pub fn emitter_receiver(buf_size: BufSize) -> (SubjectEmitter<T>, SubjectReceiver<T>) {
        let core = SubjectCore::new(
            "replay",
            ReplayPolicy {
                limit: buf_size.limit(),
                window: None,
                after_terminal: true,
            },
            None,
        );
        (SubjectEmitter(core.clone()), SubjectReceiver(core))
    }

    /// Like [`emitter_receiver`](Self::emitter_receiver), replaying only values
    /// emitted at most `window` ago according to `scheduler`.
    pub fn emitter_receiver_time_aware<S>(
        buf_size: BufSize,
        window: Duration,
        scheduler: S,
    ) -> (SubjectEmitter<T>, SubjectReceiver<T>)
    where
        S: Scheduler + 'static,
    {
        let core = SubjectCore::new(
            "replay",
            ReplayPolicy {
                limit: buf_size.limit(),
                window: Some((window, Arc::new(scheduler))),
                after_terminal: true,
            },
            None,
        );
        (SubjectEmitter(core.clone()), SubjectReceiver(core))
    }
}
