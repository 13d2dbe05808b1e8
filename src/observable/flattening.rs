//! Operators flattening an `Observable<Observable<T>>`.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use super::Observable;
use crate::subscription::{
    subscribe::{
        lock, SharedSubscriber, Subscribeable, Subscriber, Subscription, UnsubscribeLogic,
        Unsubscribeable,
    },
    KeyedSubscriptions, SerialSubscription,
};

/// Everything a flattening operator has to release.
#[derive(Clone, Default)]
struct Teardown {
    outer: SerialSubscription,
    inners: KeyedSubscriptions,
}

impl Teardown {
    fn dispose(&self) {
        self.outer.dispose();
        self.inners.dispose();
    }

    fn attach_outer<T: 'static>(
        &self,
        source: &Observable<Observable<T>>,
        upstream: Subscriber<Observable<T>>,
    ) -> Subscription {
        let mut subscription = source.subscribe(upstream);
        let handle = subscription.take_handle();
        self.outer.replace(subscription);
        let teardown = self.clone();
        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || teardown.dispose())),
            handle,
        )
    }
}

struct MergeState {
    active: usize,
    outer_done: bool,
}

pub(super) fn merge_all<T: Send + 'static>(source: Observable<Observable<T>>) -> Observable<T> {
    Observable::new(move |o| {
        let o = SharedSubscriber::new(o);
        let state = Arc::new(Mutex::new(MergeState {
            active: 0,
            outer_done: false,
        }));
        let teardown = Teardown::default();

        let (out, st, td) = (o.clone(), Arc::clone(&state), teardown.clone());
        let (out_e, td_e) = (o.clone(), teardown.clone());
        let (out_c, st_c) = (o.clone(), Arc::clone(&state));
        let outer = o.upstream(
            move |inner: Observable<T>| {
                lock(&st).active += 1;
                let key = td.inners.reserve();
                let out_n = out.clone();
                let (out_ie, td_ie) = (out.clone(), td.clone());
                let (out_ic, st_i, td_ic) = (out.clone(), Arc::clone(&st), td.clone());
                let s = out.upstream(
                    move |v| out_n.next(v),
                    move |e| {
                        out_ie.error(e);
                        td_ie.dispose();
                    },
                    move || {
                        td_ic.inners.release(key);
                        let done = {
                            let mut st = lock(&st_i);
                            st.active -= 1;
                            st.active == 0 && st.outer_done
                        };
                        if done {
                            out_ic.complete();
                        }
                    },
                );
                td.inners.park(key, inner.subscribe(s));
            },
            move |e| {
                out_e.error(e);
                td_e.dispose();
            },
            move || {
                let done = {
                    let mut st = lock(&st_c);
                    st.outer_done = true;
                    st.active == 0
                };
                if done {
                    out_c.complete();
                }
            },
        );
        teardown.attach_outer(&source, outer)
    })
}

struct ConcatState<T> {
    queue: VecDeque<Observable<T>>,
    active: bool,
    draining: bool,
    outer_done: bool,
}

/// Serializes inner observables. Synchronous inners complete inside `subscribe`;
/// `draining` turns that recursion into iteration of the loop in `drain`.
struct ConcatQueue<T> {
    state: Mutex<ConcatState<T>>,
    current: SerialSubscription,
    out: SharedSubscriber<T>,
}

impl<T: Send + 'static> ConcatQueue<T> {
    fn push(self: &Arc<Self>, inner: Observable<T>) {
        lock(&self.state).queue.push_back(inner);
        self.drain();
    }

    fn outer_completed(self: &Arc<Self>) {
        lock(&self.state).outer_done = true;
        self.drain();
    }

    fn inner_completed(self: &Arc<Self>) {
        lock(&self.state).active = false;
        self.drain();
    }

    fn drain(self: &Arc<Self>) {
        loop {
            let next = {
                let mut st = lock(&self.state);
                if st.draining || st.active {
                    return;
                }
                match st.queue.pop_front() {
                    Some(next) => {
                        st.active = true;
                        st.draining = true;
                        next
                    }
                    None => {
                        let done = st.outer_done;
                        drop(st);
                        if done {
                            self.out.complete();
                        }
                        return;
                    }
                }
            };
            if self.out.is_closed() {
                return;
            }

            let this = Arc::clone(self);
            let (out_n, out_e) = (self.out.clone(), self.out.clone());
            let s = self.out.upstream(
                move |v| out_n.next(v),
                move |e| out_e.error(e),
                move || this.inner_completed(),
            );
            let subscription = next.subscribe(s);
            self.current.replace(subscription);
            lock(&self.state).draining = false;
        }
    }
}

pub(super) fn concat_all<T: Send + 'static>(source: Observable<Observable<T>>) -> Observable<T> {
    Observable::new(move |o| {
        let o = SharedSubscriber::new(o);
        let queue = Arc::new(ConcatQueue {
            state: Mutex::new(ConcatState {
                queue: VecDeque::new(),
                active: false,
                draining: false,
                outer_done: false,
            }),
            current: SerialSubscription::new(),
            out: o.clone(),
        });
        let teardown = Teardown::default();

        let (q_n, q_c) = (Arc::clone(&queue), Arc::clone(&queue));
        let out_e = o.clone();
        let outer = o.upstream(
            move |inner: Observable<T>| q_n.push(inner),
            move |e| out_e.error(e),
            move || q_c.outer_completed(),
        );
        let mut subscription = teardown.attach_outer(&source, outer);
        let handle = subscription.take_handle();
        let current = queue.current.clone();
        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || {
                subscription.dispose();
                current.dispose();
            })),
            handle,
        )
    })
}

struct SwitchState {
    latest: u64,
    inner_active: bool,
    outer_done: bool,
}

pub(super) fn switch_latest<T: Send + 'static>(
    source: Observable<Observable<T>>,
) -> Observable<T> {
    Observable::new(move |o| {
        let o = SharedSubscriber::new(o);
        let state = Arc::new(Mutex::new(SwitchState {
            latest: 0,
            inner_active: false,
            outer_done: false,
        }));
        let current = SerialSubscription::new();
        let teardown = Teardown::default();

        let (out, st, cur) = (o.clone(), Arc::clone(&state), current.clone());
        let out_e = o.clone();
        let (out_c, st_c) = (o.clone(), Arc::clone(&state));
        let outer = o.upstream(
            move |inner: Observable<T>| {
                let id = {
                    let mut st = lock(&st);
                    st.latest += 1;
                    st.inner_active = true;
                    st.latest
                };
                // Release the previous inner before the new one starts.
                cur.replace(Subscription::nil());

                let (out_n, st_n) = (out.clone(), Arc::clone(&st));
                let (out_ie, st_e) = (out.clone(), Arc::clone(&st));
                let (out_ic, st_i) = (out.clone(), Arc::clone(&st));
                let s = out.upstream(
                    move |v| {
                        let is_latest = lock(&st_n).latest == id;
                        if is_latest {
                            out_n.next(v);
                        }
                    },
                    move |e| {
                        let is_latest = lock(&st_e).latest == id;
                        if is_latest {
                            out_ie.error(e);
                        }
                    },
                    move || {
                        let done = {
                            let mut st = lock(&st_i);
                            if st.latest != id {
                                return;
                            }
                            st.inner_active = false;
                            st.outer_done
                        };
                        if done {
                            out_ic.complete();
                        }
                    },
                );
                let subscription = inner.subscribe(s);
                let still_latest = lock(&st).latest == id;
                if still_latest {
                    cur.replace(subscription);
                } else {
                    subscription.unsubscribe();
                }
            },
            move |e| out_e.error(e),
            move || {
                let done = {
                    let mut st = lock(&st_c);
                    st.outer_done = true;
                    !st.inner_active
                };
                if done {
                    out_c.complete();
                }
            },
        );
        let mut subscription = teardown.attach_outer(&source, outer);
        let handle = subscription.take_handle();
        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || {
                subscription.dispose();
                current.dispose();
            })),
            handle,
        )
    })
}
