//! The `subjects` module provides various types of subjects for handling and observing
//! data streams. Subjects serve both as observers and observables, allowing multiple
//! observers to subscribe to a single source and receive updates.
//!
//! Subjects are split into emitter and receiver using the `emitter_receiver`
//! function of each variant.
//!
//! The [`SubjectEmitter`] behaves as an `Observer`, enabling `next()`, `error()` and
//! `complete()` calls. It can also be converted into a `Subscriber` and passed to the
//! `subscribe` method of another `Observable`.
//!
//! The [`SubjectReceiver`] functions as an `Observable`, enabling you to use the
//! `subscribe` and `unsubscribe` methods and every operator on it.
//!
//! Three variants are provided: [`PublishSubject`] stores nothing,
//! [`BehaviorSubject`] holds a current value and [`ReplaySubject`] replays a buffer.
//! [`Variable`] wraps a `BehaviorSubject` behind a get/set interface.
//!
//! All variants share one state machine. While active, `next` is broadcast to the
//! observers in subscription order. The first `error` or `complete` is broadcast,
//! cached and the observer list cleared; from then on `next` is ignored and new
//! observers immediately receive the cached terminal event. Emitting into a subject
//! from one of its own observers is not supported.

mod behavior_subject;
mod endpoints;
mod publish_subject;
mod replay_subject;
mod state;
mod variable;

pub use behavior_subject::BehaviorSubject;
pub use endpoints::{SubjectEmitter, SubjectReceiver};
pub use publish_subject::PublishSubject;
pub use replay_subject::{BufSize, ReplaySubject};
pub use variable::Variable;
