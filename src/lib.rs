//! `rxcore` is a minimal reactive-streams engine: observables, subjects, operators and
//! explicit disposal.
//!
//! Observables are cold and lazy. Nothing happens until `subscribe` is called, and
//! every subscription runs its own copy of the producer. Values are pushed
//! synchronously on the producing thread unless a [`Scheduler`] moves them
//! (`observe_on`, `delay`, `interval`, ...).
//!
//! Each stream delivers zero or more values followed by at most one terminal event,
//! `error` or `complete`. Nothing is delivered after the terminal event or after the
//! subscription was disposed.
//!
//! # Example
//!
//! ```no_run
//! use rxcore::{
//!     subjects::PublishSubject, subscribe::Subscriber, DisposeBag, Observable,
//!     ObservableExt, Observer, Subscribeable,
//! };
//!
//! let bag = DisposeBag::new();
//! let (mut emitter, receiver) = PublishSubject::emitter_receiver();
//!
//! receiver
//!     .clone()
//!     .merge(Observable::of(vec![10, 20]))
//!     .filter(|v| v % 2 == 0)
//!     .map(|v| v * 2)
//!     .subscribe(Subscriber::on_next(|v| println!("{}", v)))
//!     .disposed_by(&bag);
//!
//! emitter.next(4);
//! emitter.complete();
//! bag.dispose();
//! ```
//!
//! Logging goes through `tracing`; install a subscriber to see subscribe, dispose and
//! terminal transitions.

mod errors;
mod event;
mod observable;
pub mod observer;
pub mod scheduler;
pub mod subjects;
mod subscription;

pub use errors::{ObservableError, SharedError};
pub use event::Event;
pub use observable::{Connectable, Observable, ObservableExt};
pub use observer::Observer;
pub use scheduler::{Scheduler, TestScheduler, TokioScheduler};
pub use subscription::subscribe;
pub use subscription::subscribe::{Subscribeable, Unsubscribeable};
pub use subscription::{DisposeBag, SerialSubscription};
