use std::sync::Arc;

use super::state::{SubjectCore, Terminal};
use crate::{
    errors::SharedError,
    observable::{Observable, ObservableExt},
    observer::Observer,
    subscription::subscribe::{Subscribeable, Subscriber, Subscription, Unsubscribeable},
};

/// Emitting half of a subject. Acts as an `Observer`, so it can also be turned into
/// a `Subscriber` and subscribed to another observable.
///
/// Clones emit into the same subject.
pub struct SubjectEmitter<T>(pub(super) Arc<SubjectCore<T>>);

/// Subscribing half of a subject. All observable operators apply to it.
///
/// Clones subscribe to the same subject.
pub struct SubjectReceiver<T>(pub(super) Arc<SubjectCore<T>>);

impl<T> Clone for SubjectEmitter<T> {
    fn clone(&self) -> Self {
        SubjectEmitter(Arc::clone(&self.0))
    }
}

impl<T> Clone for SubjectReceiver<T> {
    fn clone(&self) -> Self {
        SubjectReceiver(Arc::clone(&self.0))
    }
}

impl<T: Clone + Send + 'static> SubjectEmitter<T> {
    /// `true` once `error` or `complete` went through.
    pub fn is_terminated(&self) -> bool {
        self.0.is_terminated()
    }
}

impl<T: Clone + Send + 'static> Observer for SubjectEmitter<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        self.0.next(v);
    }

    fn error(&mut self, e: SharedError) {
        self.0.terminate(Terminal::Failed(e));
    }

    fn complete(&mut self) {
        self.0.terminate(Terminal::Completed);
    }
}

impl<T: Clone + Send + 'static> SubjectReceiver<T> {
    /// Returns the number of live observers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no live observers are registered, `false` otherwise.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent buffered value: the current value of a `BehaviorSubject`, the
    /// newest replayable value of a `ReplaySubject`, always `None` for a
    /// `PublishSubject`.
    pub fn latest(&self) -> Option<T> {
        self.0.latest()
    }
}

impl<T: Clone + Send + 'static> Subscribeable for SubjectReceiver<T> {
    type ObsType = T;

    fn subscribe(&self, s: Subscriber<Self::ObsType>) -> Subscription {
        self.0.register(s)
    }
}

impl<T: Clone + Send + 'static> Unsubscribeable for SubjectReceiver<T> {
    /// Closes the subject: observers are dropped without a terminal event and later
    /// emissions and subscriptions are ignored.
    fn unsubscribe(self) {
        tracing::debug!("subject closed by receiver");
        self.0.close();
    }
}

impl<T: Clone + Send + 'static> ObservableExt<T> for SubjectReceiver<T> {}

impl<T: Clone + Send + 'static> From<SubjectEmitter<T>> for Subscriber<T> {
    fn from(value: SubjectEmitter<T>) -> Self {
        let (mut vn, mut ve, mut vc) = (value.clone(), value.clone(), value);
        Subscriber::new(
            move |v| vn.next(v),
            move |e| ve.error(e),
            move || vc.complete(),
        )
    }
}

impl<T: Clone + Send + 'static> From<SubjectReceiver<T>> for Observable<T> {
    fn from(value: SubjectReceiver<T>) -> Self {
        Observable::new(move |subscriber| value.subscribe(subscriber))
    }
}
