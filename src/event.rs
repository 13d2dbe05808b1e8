//! Reified notifications.
//!
//! `Event` is what `materialize()` emits and `dematerialize()` consumes. It is also
//! handy in tests for recording the exact sequence an observer saw.

use std::fmt;

use crate::{errors::SharedError, observer::Observer};

/// One notification of a stream.
pub enum Event<T> {
    Next(T),
    Error(SharedError),
    Completed,
}

impl<T> Event<T> {
    /// `true` for `Error` and `Completed`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::Next(_))
    }

    /// Returns the carried value for `Next`, `None` otherwise.
    pub fn value(self) -> Option<T> {
        match self {
            Event::Next(v) => Some(v),
            _ => None,
        }
    }

    /// Delivers this event to `observer`.
    pub fn accept<O>(self, observer: &mut O)
    where
        O: Observer<NextFnType = T> + ?Sized,
    {
        match self {
            Event::Next(v) => observer.next(v),
            Event::Error(e) => observer.error(e),
            Event::Completed => observer.complete(),
        }
    }
}

impl<T: Clone> Clone for Event<T> {
    fn clone(&self) -> Self {
        match self {
            Event::Next(v) => Event::Next(v.clone()),
            Event::Error(e) => Event::Error(e.clone()),
            Event::Completed => Event::Completed,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Next(v) => f.debug_tuple("Next").field(v).finish(),
            Event::Error(e) => f.debug_tuple("Error").field(&e.to_string()).finish(),
            Event::Completed => f.write_str("Completed"),
        }
    }
}

// Errors compare by message; two error events are equal when they read the same.
impl<T: PartialEq> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Event::Next(a), Event::Next(b)) => a == b,
            (Event::Error(a), Event::Error(b)) => a.to_string() == b.to_string(),
            (Event::Completed, Event::Completed) => true,
            _ => false,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Next(v) => write!(f, "next({v})"),
            Event::Error(e) => write!(f, "error({e})"),
            Event::Completed => f.write_str("completed"),
        }
    }
}
