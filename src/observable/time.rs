//! Operators that move notifications in time through a `Scheduler`.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use super::Observable;
use crate::{
    errors::SharedError,
    event::Event,
    scheduler::SharedScheduler,
    subscription::{
        subscribe::{lock, SharedSubscriber, Subscribeable, Subscription, UnsubscribeLogic},
        KeyedSubscriptions, SerialSubscription,
    },
};

/// Re-emits notifications after a fixed delay, in arrival order.
///
/// Every notification schedules one delivery; each delivery hands out the oldest
/// pending notification, so order holds even if the scheduler runs equally due
/// actions out of order.
struct Shifter<T> {
    pending: Mutex<VecDeque<Event<T>>>,
    scheduled: KeyedSubscriptions,
    out: SharedSubscriber<T>,
    scheduler: SharedScheduler,
    delay: Duration,
}

impl<T: Send + 'static> Shifter<T> {
    fn push(self: &Arc<Self>, event: Event<T>) {
        lock(&self.pending).push_back(event);
        let this = Arc::clone(self);
        let key = self.scheduled.reserve();
        let action = self.scheduler.schedule_after(
            self.delay,
            Box::new(move || {
                this.scheduled.forget(key);
                this.deliver_one();
            }),
        );
        self.scheduled.park(key, action);
    }

    fn deliver_one(&self) {
        let mut pending = lock(&self.pending);
        if self.out.is_closed() {
            pending.clear();
            return;
        }
        match pending.pop_front() {
            Some(Event::Next(v)) => self.out.next(v),
            Some(Event::Error(e)) => self.out.error(e),
            Some(Event::Completed) => self.out.complete(),
            None => {}
        }
    }

    fn fail_now(&self, e: SharedError) {
        {
            let mut pending = lock(&self.pending);
            pending.clear();
            self.out.error(e);
        }
        self.scheduled.dispose();
    }
}

fn shifted<T: Send + 'static>(
    source: Observable<T>,
    delay: Duration,
    scheduler: SharedScheduler,
    delay_errors: bool,
) -> Observable<T> {
    Observable::new(move |o| {
        let o = SharedSubscriber::new(o);
        let shifter = Arc::new(Shifter {
            pending: Mutex::new(VecDeque::new()),
            scheduled: KeyedSubscriptions::new(),
            out: o.clone(),
            scheduler: Arc::clone(&scheduler),
            delay,
        });
        let (sh_n, sh_e, sh_c) = (
            Arc::clone(&shifter),
            Arc::clone(&shifter),
            Arc::clone(&shifter),
        );
        let mut upstream = source.subscribe(o.upstream(
            move |v| sh_n.push(Event::Next(v)),
            move |e| {
                if delay_errors {
                    sh_e.push(Event::Error(e));
                } else {
                    sh_e.fail_now(e);
                }
            },
            move || sh_c.push(Event::Completed),
        ));
        let handle = upstream.take_handle();
        let scheduled = shifter.scheduled.clone();
        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || {
                upstream.dispose();
                scheduled.dispose();
            })),
            handle,
        )
    })
}

pub(super) fn delay<T: Send + 'static>(
    source: Observable<T>,
    delay: Duration,
    scheduler: SharedScheduler,
) -> Observable<T> {
    shifted(source, delay, scheduler, false)
}

pub(super) fn observe_on<T: Send + 'static>(
    source: Observable<T>,
    scheduler: SharedScheduler,
) -> Observable<T> {
    shifted(source, Duration::ZERO, scheduler, true)
}

struct Window<T> {
    items: Vec<T>,
    id: u64,
}

/// Time-or-count buffering. `Window::id` identifies the current window so a timer
/// of a window closed early by `count` is ignored.
struct Buffer<T> {
    window: Mutex<Window<T>>,
    out: SharedSubscriber<Vec<T>>,
    timer: SerialSubscription,
    scheduler: SharedScheduler,
    span: Duration,
    count: usize,
}

impl<T: Send + 'static> Buffer<T> {
    fn start_window(self: &Arc<Self>, id: u64) {
        let this = Arc::clone(self);
        let scheduled = self
            .scheduler
            .schedule_after(self.span, Box::new(move || this.window_elapsed(id)));
        self.timer.replace(scheduled);
    }

    fn window_elapsed(self: &Arc<Self>, id: u64) {
        let next = {
            let mut window = lock(&self.window);
            if window.id != id || self.out.is_closed() {
                return;
            }
            let items = std::mem::take(&mut window.items);
            window.id += 1;
            self.out.next(items);
            window.id
        };
        self.start_window(next);
    }

    fn push(self: &Arc<Self>, v: T) {
        let next = {
            let mut window = lock(&self.window);
            window.items.push(v);
            if self.count == 0 || window.items.len() < self.count {
                return;
            }
            let items = std::mem::take(&mut window.items);
            window.id += 1;
            self.out.next(items);
            window.id
        };
        self.start_window(next);
    }

    fn finish(&self) {
        {
            let mut window = lock(&self.window);
            let items = std::mem::take(&mut window.items);
            self.out.next(items);
            self.out.complete();
        }
        self.timer.dispose();
    }

    fn fail(&self, e: SharedError) {
        self.out.error(e);
        self.timer.dispose();
    }
}

/// `count == 0` disables the count limit.
pub(super) fn buffer<T: Send + 'static>(
    source: Observable<T>,
    span: Duration,
    count: usize,
    scheduler: SharedScheduler,
) -> Observable<Vec<T>> {
    Observable::new(move |o| {
        let o = SharedSubscriber::new(o);
        let buffer = Arc::new(Buffer {
            window: Mutex::new(Window {
                items: Vec::new(),
                id: 0,
            }),
            out: o.clone(),
            timer: SerialSubscription::new(),
            scheduler: Arc::clone(&scheduler),
            span,
            count,
        });
        buffer.start_window(0);

        let (b_n, b_e, b_c) = (Arc::clone(&buffer), Arc::clone(&buffer), Arc::clone(&buffer));
        let mut upstream = source.subscribe(o.upstream(
            move |v| b_n.push(v),
            move |e| b_e.fail(e),
            move || b_c.finish(),
        ));
        let handle = upstream.take_handle();
        let timer = buffer.timer.clone();
        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || {
                timer.dispose();
                upstream.dispose();
            })),
            handle,
        )
    })
}
