//! Operators combining several sources into one stream.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use super::Observable;
use crate::{
    errors::SharedError,
    subscription::{
        subscribe::{lock, CancelToken, SharedSubscriber, Subscribeable, Subscription},
        DisposeBag, SerialSubscription,
    },
};

fn dispose_all(bag: DisposeBag) -> Subscription {
    Subscription::from_logic(move || bag.dispose())
}

impl<T: Send + 'static> Observable<T> {
    /// Emits the values of every source in turn. Source `n + 1` is subscribed only
    /// once source `n` completed; an error aborts the sequence.
    pub fn concat_many(sources: Vec<Observable<T>>) -> Observable<T> {
        Observable::from_iter(sources).concat_all()
    }

    /// Subscribes to all sources at once and interleaves their values.
    pub fn merge_many(sources: Vec<Observable<T>>) -> Observable<T> {
        Observable::from_iter(sources).merge_all()
    }

    /// Emits `f` applied to the latest value of every source whenever one of them
    /// emits, once all of them have emitted.
    ///
    /// Completes when every source completed, or as soon as a source completes
    /// without ever emitting.
    pub fn combine_latest_many<R, F>(sources: Vec<Observable<T>>, f: F) -> Observable<R>
    where
        T: Clone,
        R: 'static,
        F: Fn(Vec<T>) -> R + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |o| {
            let o = SharedSubscriber::new(o);
            let n = sources.len();
            if n == 0 {
                o.complete();
                return Subscription::nil();
            }
            let state = Arc::new(Mutex::new(CombineState {
                latest: vec![None; n],
                completed: vec![false; n],
            }));
            let bag = DisposeBag::new();

            for (i, source) in sources.iter().enumerate() {
                if o.is_closed() {
                    break;
                }
                let (out_n, st_n, f) = (o.clone(), Arc::clone(&state), Arc::clone(&f));
                let (out_c, st_c) = (o.clone(), Arc::clone(&state));
                let s = o.upstream(
                    move |v: T| {
                        let mut st = lock(&st_n);
                        st.latest[i] = Some(v);
                        if let Some(values) = st.snapshot() {
                            if let Some(r) = out_n.guard("combine_latest", || f(values)) {
                                out_n.next(r);
                            }
                        }
                    },
                    error_forwarder(&o, &bag),
                    move || {
                        let done = {
                            let mut st = lock(&st_c);
                            st.completed[i] = true;
                            st.latest[i].is_none() || st.completed.iter().all(|c| *c)
                        };
                        if done {
                            out_c.complete();
                        }
                    },
                );
                bag.insert(source.subscribe(s));
            }
            dispose_all(bag)
        })
    }

    /// Pairs the `n`-th values of all sources.
    ///
    /// Completes as soon as a completed source has no buffered values left.
    pub fn zip_many<R, F>(sources: Vec<Observable<T>>, f: F) -> Observable<R>
    where
        R: 'static,
        F: Fn(Vec<T>) -> R + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |o| {
            let o = SharedSubscriber::new(o);
            let n = sources.len();
            if n == 0 {
                o.complete();
                return Subscription::nil();
            }
            let state = Arc::new(Mutex::new(ZipState {
                queues: (0..n).map(|_| VecDeque::new()).collect(),
                completed: vec![false; n],
            }));
            let bag = DisposeBag::new();

            for (i, source) in sources.iter().enumerate() {
                if o.is_closed() {
                    break;
                }
                let (out_n, st_n, f) = (o.clone(), Arc::clone(&state), Arc::clone(&f));
                let (out_c, st_c) = (o.clone(), Arc::clone(&state));
                let s = o.upstream(
                    move |v: T| {
                        let mut st = lock(&st_n);
                        st.queues[i].push_back(v);
                        if let Some(row) = st.pop_row() {
                            if let Some(r) = out_n.guard("zip", || f(row)) {
                                out_n.next(r);
                            }
                        }
                        if st.exhausted() {
                            out_n.complete();
                        }
                    },
                    error_forwarder(&o, &bag),
                    move || {
                        let done = {
                            let mut st = lock(&st_c);
                            st.completed[i] = true;
                            st.exhausted()
                        };
                        if done {
                            out_c.complete();
                        }
                    },
                );
                bag.insert(source.subscribe(s));
            }
            dispose_all(bag)
        })
    }

    /// Mirrors the source that delivers the first notification and disposes all
    /// the others.
    pub fn amb_many(sources: Vec<Observable<T>>) -> Observable<T> {
        Observable::new(move |o| {
            let o = SharedSubscriber::new(o);
            if sources.is_empty() {
                o.complete();
                return Subscription::nil();
            }
            let race = Arc::new(AmbRace {
                winner: Mutex::new(None),
                contenders: (0..sources.len())
                    .map(|_| (o.token().child(), SerialSubscription::new()))
                    .collect(),
            });

            for (i, source) in sources.iter().enumerate() {
                if race.lost(i) {
                    tracing::trace!(source = i, "amb source skipped, race already decided");
                    continue;
                }
                let (out_n, r_n) = (o.clone(), Arc::clone(&race));
                let (out_e, r_e) = (o.clone(), Arc::clone(&race));
                let (out_c, r_c) = (o.clone(), Arc::clone(&race));
                let s = o.upstream(
                    move |v| {
                        if r_n.claim(i) {
                            out_n.next(v);
                        }
                    },
                    move |e| {
                        if r_e.claim(i) {
                            out_e.error(e);
                        }
                    },
                    move || {
                        if r_c.claim(i) {
                            out_c.complete();
                        }
                    },
                );
                // Let the race cancel this contender even before `subscribe` returns.
                let s = s.with_token(race.contenders[i].0.clone());
                let subscription = source.subscribe(s);
                race.contenders[i].1.replace(subscription);
            }

            Subscription::from_logic(move || {
                for (_, subscription) in &race.contenders {
                    subscription.dispose();
                }
            })
        })
    }
}

struct CombineState<T> {
    latest: Vec<Option<T>>,
    completed: Vec<bool>,
}

impl<T: Clone> CombineState<T> {
    fn snapshot(&self) -> Option<Vec<T>> {
        self.latest.iter().cloned().collect()
    }
}

struct ZipState<T> {
    queues: Vec<VecDeque<T>>,
    completed: Vec<bool>,
}

impl<T> ZipState<T> {
    fn pop_row(&mut self) -> Option<Vec<T>> {
        if self.queues.iter().any(VecDeque::is_empty) {
            return None;
        }
        self.queues.iter_mut().map(VecDeque::pop_front).collect()
    }

    // No further row can be formed.
    fn exhausted(&self) -> bool {
        self.queues
            .iter()
            .zip(&self.completed)
            .any(|(queue, completed)| *completed && queue.is_empty())
    }
}

struct AmbRace {
    winner: Mutex<Option<usize>>,
    contenders: Vec<(CancelToken, SerialSubscription)>,
}

impl AmbRace {
    /// `true` if `i` won or wins now. The first claim cancels every other contender.
    fn claim(&self, i: usize) -> bool {
        {
            let mut winner = lock(&self.winner);
            if let Some(w) = *winner {
                return w == i;
            }
            *winner = Some(i);
        }
        tracing::trace!(winner = i, "amb race decided");
        for (j, (token, subscription)) in self.contenders.iter().enumerate() {
            if j != i {
                token.cancel();
                subscription.dispose();
            }
        }
        true
    }

    fn lost(&self, i: usize) -> bool {
        matches!(*lock(&self.winner), Some(w) if w != i)
    }
}

/// Error callback forwarding downstream and disposing every sibling subscription.
fn error_forwarder<T: 'static>(
    o: &SharedSubscriber<T>,
    bag: &DisposeBag,
) -> impl FnMut(SharedError) + Send + 'static {
    let (out, bag) = (o.clone(), bag.clone());
    move |e| {
        out.error(e);
        bag.dispose();
    }
}

pub(super) fn combine_latest<T, U, R, F>(
    left: Observable<T>,
    right: Observable<U>,
    f: F,
) -> Observable<R>
where
    T: Clone + Send + 'static,
    U: Clone + Send + 'static,
    R: 'static,
    F: Fn(T, U) -> R + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Observable::new(move |o| {
        let o = SharedSubscriber::new(o);
        let state = Arc::new(Mutex::new(Pair::<T, U>::default()));
        let bag = DisposeBag::new();

        let (out_l, st_l, f_l) = (o.clone(), Arc::clone(&state), Arc::clone(&f));
        let (out_lc, st_lc) = (o.clone(), Arc::clone(&state));
        let l = o.upstream(
            move |v: T| {
                let mut st = lock(&st_l);
                st.left = Some(v);
                if let (Some(a), Some(b)) = (st.left.clone(), st.right.clone()) {
                    if let Some(r) = out_l.guard("combine_latest", || f_l(a, b)) {
                        out_l.next(r);
                    }
                }
            },
            error_forwarder(&o, &bag),
            move || {
                let done = {
                    let mut st = lock(&st_lc);
                    st.left_done = true;
                    st.left.is_none() || st.right_done
                };
                if done {
                    out_lc.complete();
                }
            },
        );
        bag.insert(left.subscribe(l));

        let (out_r, st_r, f_r) = (o.clone(), Arc::clone(&state), Arc::clone(&f));
        let (out_rc, st_rc) = (o.clone(), Arc::clone(&state));
        let r = o.upstream(
            move |v: U| {
                let mut st = lock(&st_r);
                st.right = Some(v);
                if let (Some(a), Some(b)) = (st.left.clone(), st.right.clone()) {
                    if let Some(r) = out_r.guard("combine_latest", || f_r(a, b)) {
                        out_r.next(r);
                    }
                }
            },
            error_forwarder(&o, &bag),
            move || {
                let done = {
                    let mut st = lock(&st_rc);
                    st.right_done = true;
                    st.right.is_none() || st.left_done
                };
                if done {
                    out_rc.complete();
                }
            },
        );
        if !o.is_closed() {
            bag.insert(right.subscribe(r));
        }
        dispose_all(bag)
    })
}

struct Pair<T, U> {
    left: Option<T>,
    right: Option<U>,
    left_done: bool,
    right_done: bool,
}

impl<T, U> Default for Pair<T, U> {
    fn default() -> Self {
        Pair {
            left: None,
            right: None,
            left_done: false,
            right_done: false,
        }
    }
}

struct ZipPair<T, U> {
    left: VecDeque<T>,
    right: VecDeque<U>,
    left_done: bool,
    right_done: bool,
}

impl<T, U> ZipPair<T, U> {
    fn pop_pair(&mut self) -> Option<(T, U)> {
        if self.left.is_empty() || self.right.is_empty() {
            return None;
        }
        self.left.pop_front().zip(self.right.pop_front())
    }

    fn exhausted(&self) -> bool {
        (self.left_done && self.left.is_empty()) || (self.right_done && self.right.is_empty())
    }
}

pub(super) fn zip<T, U, R, F>(left: Observable<T>, right: Observable<U>, f: F) -> Observable<R>
where
    T: Send + 'static,
    U: Send + 'static,
    R: 'static,
    F: Fn(T, U) -> R + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Observable::new(move |o| {
        let o = SharedSubscriber::new(o);
        let state = Arc::new(Mutex::new(ZipPair {
            left: VecDeque::new(),
            right: VecDeque::new(),
            left_done: false,
            right_done: false,
        }));
        let bag = DisposeBag::new();

        let (out_l, st_l, f_l) = (o.clone(), Arc::clone(&state), Arc::clone(&f));
        let (out_lc, st_lc) = (o.clone(), Arc::clone(&state));
        let l = o.upstream(
            move |v: T| {
                let mut st = lock(&st_l);
                st.left.push_back(v);
                if let Some((a, b)) = st.pop_pair() {
                    if let Some(r) = out_l.guard("zip", || f_l(a, b)) {
                        out_l.next(r);
                    }
                }
                if st.exhausted() {
                    out_l.complete();
                }
            },
            error_forwarder(&o, &bag),
            move || {
                let done = {
                    let mut st = lock(&st_lc);
                    st.left_done = true;
                    st.exhausted()
                };
                if done {
                    out_lc.complete();
                }
            },
        );
        bag.insert(left.subscribe(l));

        let (out_r, st_r, f_r) = (o.clone(), Arc::clone(&state), Arc::clone(&f));
        let (out_rc, st_rc) = (o.clone(), Arc::clone(&state));
        let r = o.upstream(
            move |v: U| {
                let mut st = lock(&st_r);
                st.right.push_back(v);
                if let Some((a, b)) = st.pop_pair() {
                    if let Some(r) = out_r.guard("zip", || f_r(a, b)) {
                        out_r.next(r);
                    }
                }
                if st.exhausted() {
                    out_r.complete();
                }
            },
            error_forwarder(&o, &bag),
            move || {
                let done = {
                    let mut st = lock(&st_rc);
                    st.right_done = true;
                    st.exhausted()
                };
                if done {
                    out_rc.complete();
                }
            },
        );
        if !o.is_closed() {
            bag.insert(right.subscribe(r));
        }
        dispose_all(bag)
    })
}

pub(super) fn with_latest_from<T, U, R, F>(
    source: Observable<T>,
    other: Observable<U>,
    f: F,
) -> Observable<R>
where
    T: Send + 'static,
    U: Clone + Send + 'static,
    R: 'static,
    F: Fn(T, U) -> R + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Observable::new(move |o| {
        let o = SharedSubscriber::new(o);
        let latest: Arc<Mutex<Option<U>>> = Arc::new(Mutex::new(None));
        let bag = DisposeBag::new();

        // `other` goes first so a synchronous value is available to the source.
        let latest_o = Arc::clone(&latest);
        let other_s = o.upstream(
            move |v: U| *lock(&latest_o) = Some(v),
            error_forwarder(&o, &bag),
            || {},
        );
        bag.insert(other.subscribe(other_s));

        let (out, f) = (o.clone(), Arc::clone(&f));
        let (out_c, bag_c) = (o.clone(), bag.clone());
        let source_s = o.upstream(
            move |v: T| {
                let current = lock(&latest).clone();
                if let Some(u) = current {
                    if let Some(r) = out.guard("with_latest_from", || f(v, u)) {
                        out.next(r);
                    }
                }
            },
            error_forwarder(&o, &bag),
            move || {
                out_c.complete();
                bag_c.dispose();
            },
        );
        if !o.is_closed() {
            bag.insert(source.subscribe(source_s));
        }
        dispose_all(bag)
    })
}

struct Sampled<T> {
    latest: Option<T>,
    source_done: bool,
}

/// Once the source completed, the value still waiting is emitted on the next
/// trigger and the stream completes right after it.
pub(super) fn sample<T, U>(source: Observable<T>, trigger: Observable<U>) -> Observable<T>
where
    T: Send + 'static,
    U: 'static,
{
    Observable::new(move |o| {
        let o = SharedSubscriber::new(o);
        let state = Arc::new(Mutex::new(Sampled {
            latest: None,
            source_done: false,
        }));
        let bag = DisposeBag::new();

        let state_n = Arc::clone(&state);
        let (out_sc, st_sc, bag_sc) = (o.clone(), Arc::clone(&state), bag.clone());
        let source_s = o.upstream(
            move |v: T| lock(&state_n).latest = Some(v),
            error_forwarder(&o, &bag),
            move || {
                let waiting = {
                    let mut st = lock(&st_sc);
                    st.source_done = true;
                    st.latest.is_some()
                };
                if !waiting {
                    out_sc.complete();
                    bag_sc.dispose();
                }
            },
        );
        bag.insert(source.subscribe(source_s));

        let (out_t, st_t, bag_t) = (o.clone(), Arc::clone(&state), bag.clone());
        let (out_tc, bag_tc) = (o.clone(), bag.clone());
        let trigger_s = o.upstream(
            move |_: U| {
                let (value, done) = {
                    let mut st = lock(&st_t);
                    (st.latest.take(), st.source_done)
                };
                if let Some(v) = value {
                    out_t.next(v);
                }
                if done {
                    out_t.complete();
                    bag_t.dispose();
                }
            },
            error_forwarder(&o, &bag),
            move || {
                let value = lock(&state).latest.take();
                if let Some(v) = value {
                    out_tc.next(v);
                }
                out_tc.complete();
                bag_tc.dispose();
            },
        );
        if !o.is_closed() {
            bag.insert(trigger.subscribe(trigger_s));
        }
        dispose_all(bag)
    })
}
