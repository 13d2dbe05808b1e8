use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use crate::{
    errors::SharedError,
    observer::Observer,
    scheduler::SharedScheduler,
    subscription::subscribe::{lock, CancelToken, Subscriber, Subscription},
};

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

type Slot<T> = Arc<Mutex<Subscriber<T>>>;

struct Registered<T> {
    id: u64,
    token: CancelToken,
    slot: Slot<T>,
}

impl<T> Clone for Registered<T> {
    fn clone(&self) -> Self {
        Registered {
            id: self.id,
            token: self.token.clone(),
            slot: Arc::clone(&self.slot),
        }
    }
}

#[derive(Clone)]
pub(crate) enum Terminal {
    Completed,
    Failed(SharedError),
}

impl Terminal {
    fn deliver<T>(&self, s: &mut Subscriber<T>) {
        match self {
            Terminal::Completed => s.complete(),
            Terminal::Failed(e) => s.error(Arc::clone(e)),
        }
    }
}

/// How much history a subject keeps and what late subscribers get.
pub(crate) struct ReplayPolicy {
    /// Maximum number of buffered values, `None` for unbounded.
    pub(crate) limit: Option<usize>,
    /// Values older than this are dropped from the buffer.
    pub(crate) window: Option<(Duration, SharedScheduler)>,
    /// Replay the buffer to subscribers arriving after the terminal event.
    pub(crate) after_terminal: bool,
}

struct SubjectState<T> {
    observers: Vec<Registered<T>>,
    buffer: VecDeque<(T, Duration)>,
    terminal: Option<Terminal>,
    closed: bool,
}

/// State shared by every subject flavour.
///
/// Broadcasts are serialized by `emit`. The observer list is snapshotted under
/// `state` and delivered to with `state` released, so observers may subscribe or
/// dispose from inside a callback. A new observer's slot is locked before `state` is
/// released, so a concurrent broadcast reaches it only after its replay finished.
pub(crate) struct SubjectCore<T> {
    state: Mutex<SubjectState<T>>,
    emit: Mutex<()>,
    policy: ReplayPolicy,
    kind: &'static str,
}

impl<T: Clone + Send + 'static> SubjectCore<T> {
    pub(crate) fn new(kind: &'static str, policy: ReplayPolicy, seed: Option<T>) -> Arc<Self> {
        let mut buffer = VecDeque::new();
        if let Some(seed) = seed {
            buffer.push_back((seed, Self::now(&policy)));
        }
        Arc::new(SubjectCore {
            state: Mutex::new(SubjectState {
                observers: Vec::new(),
                buffer,
                terminal: None,
                closed: false,
            }),
            emit: Mutex::new(()),
            policy,
            kind,
        })
    }

    fn now(policy: &ReplayPolicy) -> Duration {
        policy
            .window
            .as_ref()
            .map_or(Duration::ZERO, |(_, scheduler)| scheduler.now())
    }

    fn trim(&self, buffer: &mut VecDeque<(T, Duration)>) {
        if let Some(limit) = self.policy.limit {
            while buffer.len() > limit {
                buffer.pop_front();
            }
        }
        if let Some((window, scheduler)) = &self.policy.window {
            let now = scheduler.now();
            while buffer
                .front()
                .is_some_and(|(_, stamp)| now.saturating_sub(*stamp) > *window)
            {
                buffer.pop_front();
            }
        }
    }

    pub(crate) fn next(&self, v: T) {
        let _emit = lock(&self.emit);
        let observers = {
            let mut st = lock(&self.state);
            if st.terminal.is_some() || st.closed {
                tracing::trace!(subject = self.kind, "next on terminated subject dropped");
                return;
            }
            if self.policy.limit != Some(0) {
                let stamp = Self::now(&self.policy);
                st.buffer.push_back((v.clone(), stamp));
                self.trim(&mut st.buffer);
            }
            st.observers.retain(|r| !r.token.is_cancelled());
            st.observers.clone()
        };
        for registered in observers {
            lock(&registered.slot).next(v.clone());
        }
    }

    pub(crate) fn terminate(&self, terminal: Terminal) {
        let _emit = lock(&self.emit);
        let observers = {
            let mut st = lock(&self.state);
            if st.terminal.is_some() || st.closed {
                tracing::trace!(subject = self.kind, "repeated terminal event dropped");
                return;
            }
            st.terminal = Some(terminal.clone());
            std::mem::take(&mut st.observers)
        };
        tracing::debug!(
            subject = self.kind,
            observers = observers.len(),
            failed = matches!(terminal, Terminal::Failed(_)),
            "subject terminated"
        );
        for registered in observers {
            terminal.deliver(&mut lock(&registered.slot));
        }
    }

    /// Registers `s`, replaying buffered values and, if terminated, the terminal
    /// event before returning.
    pub(crate) fn register(self: &Arc<Self>, s: Subscriber<T>) -> Subscription {
        let id = NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed);
        let token = s.token();
        let cancel = token.clone();
        let slot: Slot<T> = Arc::new(Mutex::new(s));

        let mut subscriber = lock(&slot);
        let (replay, terminal) = {
            let mut st = lock(&self.state);
            if st.closed {
                tracing::trace!(subject = self.kind, "subscribe on closed subject ignored");
                return Subscription::nil();
            }
            self.trim(&mut st.buffer);
            let replay: Vec<T> = if st.terminal.is_none() || self.policy.after_terminal {
                st.buffer.iter().map(|(v, _)| v.clone()).collect()
            } else {
                Vec::new()
            };
            if st.terminal.is_none() {
                st.observers.push(Registered {
                    id,
                    token,
                    slot: Arc::clone(&slot),
                });
            }
            (replay, st.terminal.clone())
        };
        tracing::trace!(subject = self.kind, id, replayed = replay.len(), "observer registered");

        for v in replay {
            subscriber.next(v);
        }
        if let Some(terminal) = terminal {
            terminal.deliver(&mut subscriber);
            return Subscription::nil();
        }
        drop(subscriber);

        let core = Arc::clone(self);
        Subscription::from_logic(move || {
            cancel.cancel();
            core.remove(id);
        })
    }

    // Never locks an observer slot: disposal may run inside that observer's callback.
    fn remove(&self, id: u64) {
        lock(&self.state).observers.retain(|r| r.id != id);
        tracing::trace!(subject = self.kind, id, "observer removed");
    }

    /// Closes the subject: every observer is dropped without a terminal event and
    /// further emissions and subscriptions are ignored.
    pub(crate) fn close(&self) {
        let mut st = lock(&self.state);
        st.closed = true;
        st.observers.clear();
        st.buffer.clear();
    }

    pub(crate) fn len(&self) -> usize {
        let mut st = lock(&self.state);
        st.observers.retain(|r| !r.token.is_cancelled());
        st.observers.len()
    }

    pub(crate) fn latest(&self) -> Option<T> {
        let mut st = lock(&self.state);
        self.trim(&mut st.buffer);
        st.buffer.back().map(|(v, _)| v.clone())
    }

    pub(crate) fn is_terminated(&self) -> bool {
        lock(&self.state).terminal.is_some()
    }
}
