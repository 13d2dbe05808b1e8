//! The `observable` module provides the building blocks for creating and manipulating
//! observables.
//!
//! An [`Observable`] is a lazy producer: nothing runs until `subscribe` is called, and
//! every subscription runs the producer again with its own state. Operators are
//! provided by [`ObservableExt`]; each one returns a new `Observable` that subscribes
//! upstream, transforms the notifications and forwards them downstream.

mod combining;
mod creation;
mod flattening;
mod multicast;
mod time;


use std::{
    error::Error,
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{
    errors::catch_fault,
    event::Event,
    observer::Observer,
    scheduler::Scheduler,
    subjects::BufSize,
    subscription::{
        subscribe::{
            lock, SharedSubscriber, Subscribeable, Subscriber, Subscription, UnsubscribeLogic,
        },
        SerialSubscription,
    },
};

pub use multicast::Connectable;

type Producer<T> = dyn Fn(Subscriber<T>) -> Subscription + Send + Sync;

/// The `Observable` struct represents a source of values that can be observed
/// and transformed.
///
/// Cloning is cheap: clones share the producer, but every `subscribe` runs it anew.
///
/// # Example
///
/// ```no_run
/// use rxcore::{subscribe::Subscriber, Observable, ObservableExt, Subscribeable};
///
/// let observable = Observable::of(vec![1, 2, 3, 4, 5]);
///
/// observable
///     .filter(|v| v % 2 == 1)
///     .map(|v| v * 10)
///     .subscribe(Subscriber::on_next(|v| println!("Emitted {}", v)));
/// ```
pub struct Observable<T> {
    subscribe_fn: Arc<Producer<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Observable {
            subscribe_fn: Arc::clone(&self.subscribe_fn),
        }
    }
}

impl<T: 'static> Observable<T> {
    /// Creates a new `Observable` with the provided subscribe function.
    ///
    /// `sf` runs once per subscription. It should deliver notifications to the
    /// given `Subscriber` and return a `Subscription` that stops the work it started.
    /// Long running producers should stop as soon as `Subscriber::is_closed` turns
    /// `true`. A panic inside `sf` is delivered as an
    /// `ObservableError::ProducerFailure` error instead of unwinding into the caller
    /// of `subscribe`.
    pub fn new(sf: impl Fn(Subscriber<T>) -> Subscription + Send + Sync + 'static) -> Self {
        Observable {
            subscribe_fn: Arc::new(sf),
        }
    }
}

impl<T: 'static> Subscribeable for Observable<T> {
    type ObsType = T;

    fn subscribe(&self, s: Subscriber<Self::ObsType>) -> Subscription {
        let token = s.token();
        tracing::trace!("subscribing to observable");
        // A panicking producer ends the stream with `ProducerFailure`, unless it
        // already delivered a terminal notification.
        let out = SharedSubscriber::new(s);
        let mut inner = match catch_fault("subscribe", || (self.subscribe_fn)(out.forward())) {
            Ok(inner) => inner,
            Err(e) => {
                out.error(e);
                Subscription::nil()
            }
        };
        let handle = inner.take_handle();

        // Cancelling first guarantees nothing reaches the subscriber once dispose
        // returns, even when the producer ignores its own unsubscribe logic.
        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || {
                tracing::trace!("observable subscription disposed");
                token.cancel();
                inner.dispose();
            })),
            handle,
        )
    }
}

/// Operator skeleton: `setup` turns the downstream subscriber into the one that is
/// subscribed upstream.
pub(crate) fn lift<T, U>(
    source: Observable<T>,
    setup: impl Fn(SharedSubscriber<U>) -> Subscriber<T> + Send + Sync + 'static,
) -> Observable<U>
where
    T: 'static,
    U: 'static,
{
    Observable::new(move |o| source.subscribe(setup(SharedSubscriber::new(o))))
}

/// Like [`lift`], for operators that finish before their upstream does and have to
/// release it from inside a callback.
pub(crate) fn lift_serial<T, U>(
    source: Observable<T>,
    setup: impl Fn(SharedSubscriber<U>, SerialSubscription) -> Subscriber<T>
        + Send
        + Sync
        + 'static,
) -> Observable<U>
where
    T: 'static,
    U: 'static,
{
    Observable::new(move |o| {
        let serial = SerialSubscription::new();
        let upstream = setup(SharedSubscriber::new(o), serial.clone());
        subscribe_serial(&source, upstream, serial)
    })
}

/// Subscribes `upstream` to `source` and parks the subscription in `serial`.
///
/// The returned subscription disposes `serial` and carries the join handle of the
/// source.
pub(crate) fn subscribe_serial<T: 'static>(
    source: &Observable<T>,
    upstream: Subscriber<T>,
    serial: SerialSubscription,
) -> Subscription {
    let mut inner = source.subscribe(upstream);
    let handle = inner.take_handle();
    serial.replace(inner);
    Subscription::new(
        UnsubscribeLogic::Logic(Box::new(move || serial.dispose())),
        handle,
    )
}

/// The `ObservableExt` trait provides the operators that can be applied to
/// observables and subject receivers.
///
/// Every user closure passed to an operator runs under a fault guard: if it panics,
/// the resulting observable emits a single `ObservableError::ProducerFailure` error
/// and stops.
pub trait ObservableExt<T: Send + 'static>:
    Subscribeable<ObsType = T> + Sized + Send + Sync + 'static
{
    /// Converts `self` into a plain `Observable`.
    fn into_observable(self) -> Observable<T> {
        Observable::new(move |s| self.subscribe(s))
    }

    /// Transforms the items emitted by the observable using a transformation
    /// function.
    fn map<U, F>(self, f: F) -> Observable<U>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
        U: 'static,
    {
        let f = Arc::new(f);
        lift(self.into_observable(), move |o| {
            let f = Arc::clone(&f);
            let out = o.clone();
            o.relay(move |v| {
                if let Some(u) = out.guard("map", || f(v)) {
                    out.next(u);
                }
            })
        })
    }

    /// Fallible `map`: an `Err` returned by `f` becomes the error notification and
    /// terminates the stream.
    fn try_map<U, E, F>(self, f: F) -> Observable<U>
    where
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
        E: Error + Send + Sync + 'static,
        U: 'static,
    {
        let f = Arc::new(f);
        lift(self.into_observable(), move |o| {
            let f = Arc::clone(&f);
            let out = o.clone();
            o.relay(move |v| match out.guard("try_map", || f(v)) {
                Some(Ok(u)) => out.next(u),
                Some(Err(e)) => out.error(Arc::new(e)),
                None => {}
            })
        })
    }

    /// Filters the items emitted by the observable based on a predicate function.
    fn filter<P>(self, predicate: P) -> Observable<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        lift(self.into_observable(), move |o| {
            let predicate = Arc::clone(&predicate);
            let out = o.clone();
            o.relay(move |v| {
                if out.guard("filter", || predicate(&v)) == Some(true) {
                    out.next(v);
                }
            })
        })
    }

    /// Emits the accumulator after every value.
    ///
    /// The accumulator starts from `seed` for every subscription.
    fn scan<A, F>(self, seed: A, f: F) -> Observable<A>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        lift(self.into_observable(), move |o| {
            let f = Arc::clone(&f);
            let out = o.clone();
            let mut acc = Some(seed.clone());
            o.relay(move |v| {
                let Some(current) = acc.take() else {
                    return;
                };
                if let Some(next) = out.guard("scan", || f(current, v)) {
                    acc = Some(next.clone());
                    out.next(next);
                }
            })
        })
    }

    /// Folds the stream into a single value, emitted right before completion.
    ///
    /// If the upstream fails only the error is delivered.
    fn reduce<A, F>(self, seed: A, f: F) -> Observable<A>
    where
        A: Clone + Send + Sync + 'static,
        F: Fn(A, T) -> A + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        lift(self.into_observable(), move |o| {
            let acc = Arc::new(Mutex::new(Some(seed.clone())));
            let (acc_n, f) = (Arc::clone(&acc), Arc::clone(&f));
            let (out_n, out_e, out_c) = (o.clone(), o.clone(), o.clone());
            o.upstream(
                move |v| {
                    let current = lock(&acc_n).take();
                    if let Some(current) = current {
                        if let Some(next) = out_n.guard("reduce", || f(current, v)) {
                            *lock(&acc_n) = Some(next);
                        }
                    }
                },
                move |e| out_e.error(e),
                move || {
                    let total = lock(&acc).take();
                    if let Some(total) = total {
                        out_c.next(total);
                    }
                    out_c.complete();
                },
            )
        })
    }

    /// Collects every value and emits them as one `Vec` on completion.
    fn to_array(self) -> Observable<Vec<T>> {
        lift(self.into_observable(), |o| {
            let items = Arc::new(Mutex::new(Vec::new()));
            let items_c = Arc::clone(&items);
            let (out_e, out_c) = (o.clone(), o.clone());
            o.upstream(
                move |v| lock(&items).push(v),
                move |e| out_e.error(e),
                move || {
                    let collected = std::mem::take(&mut *lock(&items_c));
                    out_c.next(collected);
                    out_c.complete();
                },
            )
        })
    }

    /// Pairs every value with its zero based index.
    fn enumerate(self) -> Observable<(usize, T)> {
        lift(self.into_observable(), |o| {
            let out = o.clone();
            let mut index = 0;
            o.relay(move |v| {
                out.next((index, v));
                index += 1;
            })
        })
    }

    /// Drops values equal to the previous one according to `eq`.
    fn distinct_until_changed_by<F>(self, eq: F) -> Observable<T>
    where
        T: Clone,
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        let eq = Arc::new(eq);
        lift(self.into_observable(), move |o| {
            let eq = Arc::clone(&eq);
            let out = o.clone();
            let mut last: Option<T> = None;
            o.relay(move |v| {
                let same = match &last {
                    Some(prev) => match out.guard("distinct_until_changed", || eq(prev, &v)) {
                        Some(same) => same,
                        None => return,
                    },
                    None => false,
                };
                if !same {
                    last = Some(v.clone());
                    out.next(v);
                }
            })
        })
    }

    /// Drops consecutive duplicates.
    fn distinct_until_changed(self) -> Observable<T>
    where
        T: Clone + PartialEq,
    {
        self.distinct_until_changed_by(|a, b| a == b)
    }

    /// Emits at most the first `n` values, then completes and disposes the upstream.
    ///
    /// `take(0)` completes immediately without subscribing upstream.
    fn take(self, n: usize) -> Observable<T> {
        if n == 0 {
            return Observable::new(|mut s: Subscriber<T>| {
                s.complete();
                Subscription::nil()
            });
        }
        lift_serial(self.into_observable(), move |o, serial| {
            let out = o.clone();
            let mut taken = 0;
            o.relay(move |v| {
                taken += 1;
                out.next(v);
                if taken == n {
                    out.complete();
                    serial.dispose();
                }
            })
        })
    }

    /// Skips the first `n` items emitted by the observable and then emits the rest.
    fn skip(self, n: usize) -> Observable<T> {
        lift(self.into_observable(), move |o| {
            let out = o.clone();
            let mut remaining = n;
            o.relay(move |v| {
                if remaining > 0 {
                    remaining -= 1;
                    return;
                }
                out.next(v);
            })
        })
    }

    /// Emits values while `predicate` holds; the first failing value completes the
    /// stream.
    fn take_while<P>(self, predicate: P) -> Observable<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        lift_serial(self.into_observable(), move |o, serial| {
            let predicate = Arc::clone(&predicate);
            let out = o.clone();
            o.relay(move |v| match out.guard("take_while", || predicate(&v)) {
                Some(true) => out.next(v),
                Some(false) => {
                    out.complete();
                    serial.dispose();
                }
                None => serial.dispose(),
            })
        })
    }

    /// Drops values while `predicate` holds, then emits everything.
    fn skip_while<P>(self, predicate: P) -> Observable<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        lift(self.into_observable(), move |o| {
            let predicate = Arc::clone(&predicate);
            let out = o.clone();
            let mut skipping = true;
            o.relay(move |v| {
                if skipping {
                    match out.guard("skip_while", || predicate(&v)) {
                        Some(true) => return,
                        Some(false) => skipping = false,
                        None => return,
                    }
                }
                out.next(v);
            })
        })
    }

    /// Mirrors the source until `trigger` emits, then completes.
    ///
    /// Completion of `trigger` is ignored, its error is forwarded.
    fn take_until<U, O>(self, trigger: O) -> Observable<T>
    where
        U: 'static,
        O: Into<Observable<U>>,
    {
        let source = self.into_observable();
        let trigger: Observable<U> = trigger.into();
        Observable::new(move |o| {
            let o = SharedSubscriber::new(o);
            let trigger_sub = SerialSubscription::new();
            let source_sub = SerialSubscription::new();

            let (out_n, out_e) = (o.clone(), o.clone());
            let (ts, ss) = (trigger_sub.clone(), source_sub.clone());
            let t = o.upstream(
                move |_: U| {
                    out_n.complete();
                    ts.dispose();
                    ss.dispose();
                },
                move |e| out_e.error(e),
                || {},
            );
            trigger_sub.replace(trigger.subscribe(t));

            let mut subscription = subscribe_serial(&source, o.forward(), source_sub);
            let handle = subscription.take_handle();
            Subscription::new(
                UnsubscribeLogic::Logic(Box::new(move || {
                    trigger_sub.dispose();
                    subscription.dispose();
                })),
                handle,
            )
        })
    }

    /// Drops source values until `trigger` emits for the first time.
    fn skip_until<U, O>(self, trigger: O) -> Observable<T>
    where
        U: 'static,
        O: Into<Observable<U>>,
    {
        let source = self.into_observable();
        let trigger: Observable<U> = trigger.into();
        Observable::new(move |o| {
            let o = SharedSubscriber::new(o);
            let open = Arc::new(std::sync::atomic::AtomicBool::new(false));
            let trigger_sub = SerialSubscription::new();

            let (open_t, ts, out_e) = (Arc::clone(&open), trigger_sub.clone(), o.clone());
            let t = o.upstream(
                move |_: U| {
                    open_t.store(true, std::sync::atomic::Ordering::Release);
                    ts.dispose();
                },
                move |e| out_e.error(e),
                || {},
            );
            trigger_sub.replace(trigger.subscribe(t));

            let out = o.clone();
            let mut subscription = source.subscribe(o.relay(move |v| {
                if open.load(std::sync::atomic::Ordering::Acquire) {
                    out.next(v);
                }
            }));
            let handle = subscription.take_handle();
            Subscription::new(
                UnsubscribeLogic::Logic(Box::new(move || {
                    trigger_sub.dispose();
                    subscription.dispose();
                })),
                handle,
            )
        })
    }

    /// Emits only the value at zero based position `index`, then completes.
    ///
    /// If the upstream terminates earlier, its terminal notification is forwarded
    /// and nothing is emitted.
    fn element_at(self, index: usize) -> Observable<T> {
        lift_serial(self.into_observable(), move |o, serial| {
            let out = o.clone();
            let mut position = 0;
            o.relay(move |v| {
                if position == index {
                    out.next(v);
                    out.complete();
                    serial.dispose();
                }
                position += 1;
            })
        })
    }

    /// Drops every value, forwarding only the terminal notification.
    fn ignore_elements(self) -> Observable<T> {
        lift(self.into_observable(), |o| o.relay(|_| {}))
    }

    /// Emits `values` before the values of the source.
    fn start_with<I>(self, values: I) -> Observable<T>
    where
        I: IntoIterator<Item = T>,
        T: Clone + Sync,
    {
        let prefix: Vec<T> = values.into_iter().collect();
        Observable::concat_many(vec![Observable::from_iter(prefix), self.into_observable()])
    }

    /// Turns every notification into an `Event` value. The resulting stream completes
    /// after emitting the terminal event.
    fn materialize(self) -> Observable<Event<T>> {
        lift(self.into_observable(), |o| {
            let (out_n, out_e, out_c) = (o.clone(), o.clone(), o.clone());
            o.upstream(
                move |v| out_n.next(Event::Next(v)),
                move |e| {
                    out_e.next(Event::Error(e));
                    out_e.complete();
                },
                move || {
                    out_c.next(Event::Completed);
                    out_c.complete();
                },
            )
        })
    }

    /// Replaces an error with `value` followed by completion.
    fn on_error_return(self, value: T) -> Observable<T>
    where
        T: Clone + Sync,
    {
        lift(self.into_observable(), move |o| {
            let value = value.clone();
            let (out_e, out_c) = (o.clone(), o.clone());
            let out = o.clone();
            o.upstream(
                move |v| out.next(v),
                move |e| {
                    tracing::debug!(error = %e, "error replaced with fallback value");
                    out_e.next(value.clone());
                    out_e.complete();
                },
                move || out_c.complete(),
            )
        })
    }

    /// Projects every value to an inner observable and merges all of them.
    ///
    /// Completes once the source and every inner observable completed; the first
    /// error terminates everything.
    fn flat_map<U, F>(self, f: F) -> Observable<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Observable<U> + Send + Sync + 'static,
    {
        self.map(f).merge_all()
    }

    /// Alias of [`flat_map`](Self::flat_map).
    fn merge_map<U, F>(self, f: F) -> Observable<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Observable<U> + Send + Sync + 'static,
    {
        self.flat_map(f)
    }

    /// Projects every value to an inner observable, keeping only the latest one
    /// subscribed. The previous inner is disposed before the next one starts.
    fn flat_map_latest<U, F>(self, f: F) -> Observable<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Observable<U> + Send + Sync + 'static,
    {
        self.map(f).switch_latest()
    }

    /// Projects every value to an inner observable and subscribes them one after
    /// another, each only after the previous completed.
    fn concat_map<U, F>(self, f: F) -> Observable<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Observable<U> + Send + Sync + 'static,
    {
        self.map(f).concat_all()
    }

    /// Interleaves the values of both sources.
    fn merge<O>(self, other: O) -> Observable<T>
    where
        O: Into<Observable<T>>,
    {
        Observable::merge_many(vec![self.into_observable(), other.into()])
    }

    /// Emits the values of `self`, then, once it completed, those of `other`.
    fn concat<O>(self, other: O) -> Observable<T>
    where
        O: Into<Observable<T>>,
    {
        Observable::concat_many(vec![self.into_observable(), other.into()])
    }

    /// Combines the latest value of each side whenever either emits, once both
    /// have emitted at least once.
    fn combine_latest<U, R, O, F>(self, other: O, f: F) -> Observable<R>
    where
        T: Clone,
        U: Clone + Send + 'static,
        R: 'static,
        O: Into<Observable<U>>,
        F: Fn(T, U) -> R + Send + Sync + 'static,
    {
        combining::combine_latest(self.into_observable(), other.into(), f)
    }

    /// Pairs values by index.
    ///
    /// Completes as soon as a completed side has no buffered values left.
    fn zip<U, R, O, F>(self, other: O, f: F) -> Observable<R>
    where
        U: Send + 'static,
        R: 'static,
        O: Into<Observable<U>>,
        F: Fn(T, U) -> R + Send + Sync + 'static,
    {
        combining::zip(self.into_observable(), other.into(), f)
    }

    /// Combines every source value with the latest value of `other`.
    ///
    /// Source values arriving before `other` emitted are dropped. Only the source
    /// drives emissions and completion.
    fn with_latest_from<U, R, O, F>(self, other: O, f: F) -> Observable<R>
    where
        U: Clone + Send + 'static,
        R: 'static,
        O: Into<Observable<U>>,
        F: Fn(T, U) -> R + Send + Sync + 'static,
    {
        combining::with_latest_from(self.into_observable(), other.into(), f)
    }

    /// Emits the latest source value whenever `trigger` emits, if a new value
    /// arrived since the previous firing.
    fn sample<U, O>(self, trigger: O) -> Observable<T>
    where
        U: 'static,
        O: Into<Observable<U>>,
    {
        combining::sample(self.into_observable(), trigger.into())
    }

    /// Mirrors whichever side delivers the first notification; the other side is
    /// disposed.
    fn amb<O>(self, other: O) -> Observable<T>
    where
        O: Into<Observable<T>>,
    {
        Observable::amb_many(vec![self.into_observable(), other.into()])
    }

    /// Collects values into a `Vec` emitted every `time_span` or as soon as `count`
    /// values are gathered, whichever comes first. Every emission restarts the
    /// window; a window that elapses empty emits an empty `Vec`. The remaining
    /// buffer is emitted on completion.
    fn buffer<S>(self, time_span: Duration, count: usize, scheduler: S) -> Observable<Vec<T>>
    where
        S: Scheduler + 'static,
    {
        time::buffer(self.into_observable(), time_span, count, Arc::new(scheduler))
    }

    /// Shifts every value and the completion by `delay`. Errors are not delayed.
    fn delay<S>(self, delay: Duration, scheduler: S) -> Observable<T>
    where
        S: Scheduler + 'static,
    {
        time::delay(self.into_observable(), delay, Arc::new(scheduler))
    }

    /// Delivers every notification through `scheduler`, preserving order.
    fn observe_on<S>(self, scheduler: S) -> Observable<T>
    where
        S: Scheduler + 'static,
    {
        time::observe_on(self.into_observable(), Arc::new(scheduler))
    }

    /// Shares one upstream subscription between subscribers once `connect` is
    /// called. Late subscribers only see values emitted after they joined.
    fn publish(self) -> Connectable<T>
    where
        T: Clone + Sync,
    {
        Connectable::publish(self.into_observable())
    }

    /// Like [`publish`](Self::publish), replaying up to `buf_size` values to late
    /// subscribers.
    fn replay(self, buf_size: BufSize) -> Connectable<T>
    where
        T: Clone + Sync,
    {
        Connectable::replay(self.into_observable(), buf_size)
    }

    /// Connects on the first subscription and replays up to `buf_size` values to
    /// every later subscriber. The upstream stays connected.
    fn share_replay(self, buf_size: BufSize) -> Observable<T>
    where
        T: Clone + Sync,
    {
        multicast::share_replay(self.into_observable(), buf_size)
    }
}

impl<T: Send + 'static> ObservableExt<T> for Observable<T> {
    fn into_observable(self) -> Observable<T> {
        self
    }
}

impl<T: Send + 'static> Observable<Event<T>> {
    /// Turns `Event` values back into notifications.
    pub fn dematerialize(self) -> Observable<T> {
        lift(self, |o| {
            let out = o.clone();
            o.relay(move |event: Event<T>| match event {
                Event::Next(v) => out.next(v),
                Event::Error(e) => out.error(e),
                Event::Completed => out.complete(),
            })
        })
    }
}

impl<T: Send + 'static> Observable<Observable<T>> {
    /// Subscribes to every inner observable as it arrives and merges their values.
    pub fn merge_all(self) -> Observable<T> {
        flattening::merge_all(self)
    }

    /// Subscribes to the inner observables one at a time, in arrival order.
    pub fn concat_all(self) -> Observable<T> {
        flattening::concat_all(self)
    }

    /// Mirrors the most recent inner observable, disposing the previous one.
    pub fn switch_latest(self) -> Observable<T> {
        flattening::switch_latest(self)
    }
}
