//! Provides structures and traits related to subscription management.
//!
//! This module includes types such as `Subscriber` for handling observed values,
//! errors, and completions, as well as `Subscription` for controlling subscriptions
//! to observables and subjects.
//!
//! Disposal is explicit: `Subscription::dispose` is idempotent, `DisposeBag` releases
//! a group of subscriptions together and `SerialSubscription` keeps a single
//! replaceable one.
mod dispose_bag;
mod keyed;
mod serial;
pub mod subscribe;

pub use dispose_bag::DisposeBag;
pub(crate) use keyed::KeyedSubscriptions;
pub use serial::SerialSubscription;
