use std::{
    error::Error,
    sync::{Arc, Mutex},
    time::Duration,
};

use super::Observable;
use crate::{
    errors::{catch_fault, ObservableError, SharedError},
    observer::Observer,
    scheduler::{Scheduler, SharedScheduler},
    subscription::{
        subscribe::{lock, SharedSubscriber, Subscribeable, Subscriber, Subscription},
        SerialSubscription,
    },
};

impl<T: Send + 'static> Observable<T> {
    /// Emits `value` once, then completes.
    pub fn just(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Observable::new(move |mut s| {
            s.next(value.clone());
            s.complete();
            Subscription::nil()
        })
    }

    /// Emits `values` in order, then completes.
    pub fn of<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Clone + Sync,
    {
        Observable::from_iter(values.into_iter().collect::<Vec<_>>())
    }

    /// Emits every item of `iter` in order, then completes.
    ///
    /// The iterator is cloned for every subscription. Emission stops as soon as the
    /// subscriber closes, so unbounded iterators are fine downstream of `take`.
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
    {
        Observable::new(move |mut s| {
            for v in iter.clone() {
                if s.is_closed() {
                    tracing::trace!("iterator source stopped, subscriber closed");
                    return Subscription::nil();
                }
                s.next(v);
            }
            s.complete();
            Subscription::nil()
        })
    }

    /// Completes immediately.
    pub fn empty() -> Self {
        Observable::new(|mut s| {
            s.complete();
            Subscription::nil()
        })
    }

    /// Never emits and never terminates.
    pub fn never() -> Self {
        Observable::new(|_| Subscription::nil())
    }

    /// Fails immediately with `error`.
    pub fn throw_error<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        let error: SharedError = Arc::new(error);
        Observable::new(move |mut s| {
            s.error(Arc::clone(&error));
            Subscription::nil()
        })
    }

    /// Observable backed by a custom producer.
    ///
    /// Same contract as [`Observable::new`]; a panic inside `producer` is reported as
    /// a `ProducerFailure` of the `create` operator.
    pub fn create(producer: impl Fn(Subscriber<T>) -> Subscription + Send + Sync + 'static) -> Self {
        Observable::new(move |s| {
            let shared = SharedSubscriber::new(s);
            match catch_fault("create", || producer(shared.forward())) {
                Ok(subscription) => subscription,
                Err(e) => {
                    shared.error(e);
                    Subscription::nil()
                }
            }
        })
    }

    /// Calls `factory` on every subscription and subscribes to the observable it
    /// returns.
    pub fn deferred<F>(factory: F) -> Self
    where
        F: FnMut() -> Observable<T> + Send + 'static,
    {
        let factory = Mutex::new(factory);
        Observable::new(move |mut s| {
            let made = catch_fault("deferred", || {
                let mut factory = lock(&factory);
                (*factory)()
            });
            match made {
                Ok(observable) => observable.subscribe(s),
                Err(e) => {
                    s.error(e);
                    Subscription::nil()
                }
            }
        })
    }
}

impl Observable<i64> {
    /// Emits `count` consecutive integers starting at `start`.
    ///
    /// If the last value would not fit in an `i64`, the observable emits nothing and
    /// fails with `ObservableError::RangeOverflow`.
    pub fn range(start: i64, count: usize) -> Self {
        if count == 0 {
            return Observable::empty();
        }
        let last = i64::try_from(count - 1)
            .ok()
            .and_then(|offset| start.checked_add(offset));
        match last {
            Some(last) => Observable::from_iter(start..=last),
            None => Observable::throw_error(ObservableError::RangeOverflow { start, count }),
        }
    }
}

impl Observable<u64> {
    /// Emits `0, 1, 2, ...` every `period` on `scheduler`. Never completes.
    pub fn interval<S>(period: Duration, scheduler: S) -> Self
    where
        S: Scheduler + 'static,
    {
        let scheduler: SharedScheduler = Arc::new(scheduler);
        Observable::new(move |s| {
            let out = SharedSubscriber::new(s);
            let pending = SerialSubscription::new();
            schedule_tick(Arc::clone(&scheduler), period, 0, out, pending.clone());
            Subscription::from_logic(move || pending.dispose())
        })
    }

    /// Emits `0` after `delay` on `scheduler`, then completes.
    pub fn timer<S>(delay: Duration, scheduler: S) -> Self
    where
        S: Scheduler + 'static,
    {
        let scheduler: SharedScheduler = Arc::new(scheduler);
        Observable::new(move |s| {
            let out = SharedSubscriber::new(s);
            let mut pending = scheduler.schedule_after(
                delay,
                Box::new(move || {
                    out.next(0);
                    out.complete();
                }),
            );
            Subscription::from_logic(move || pending.dispose())
        })
    }
}

fn schedule_tick(
    scheduler: SharedScheduler,
    period: Duration,
    tick: u64,
    out: SharedSubscriber<u64>,
    pending: SerialSubscription,
) {
    let (next_scheduler, next_pending) = (Arc::clone(&scheduler), pending.clone());
    let scheduled = scheduler.schedule_after(
        period,
        Box::new(move || {
            if out.is_closed() {
                return;
            }
            out.next(tick);
            schedule_tick(next_scheduler, period, tick + 1, out, next_pending);
        }),
    );
    pending.replace(scheduled);
}
