use std::sync::{Arc, Mutex};

use super::{BehaviorSubject, SubjectEmitter, SubjectReceiver};
use crate::{
    observable::Observable,
    observer::Observer,
    subscription::subscribe::lock,
};

/// A mutable value that can be observed.
///
/// Wraps a `BehaviorSubject`: subscribers get the current value immediately and every
/// later `set_value`. Reading the value never blocks on observers. Unlike a subject it
/// cannot fail; [`complete`](Self::complete) ends the stream for all observers and
/// later assignments only update the stored value.
pub struct Variable<T> {
    current: Arc<Mutex<T>>,
    assign: Arc<Mutex<()>>,
    emitter: SubjectEmitter<T>,
    receiver: SubjectReceiver<T>,
}

impl<T> Clone for Variable<T> {
    fn clone(&self) -> Self {
        Variable {
            current: Arc::clone(&self.current),
            assign: Arc::clone(&self.assign),
            emitter: self.emitter.clone(),
            receiver: self.receiver.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Variable<T> {
    pub fn new(value: T) -> Self {
        let (emitter, receiver) = BehaviorSubject::emitter_receiver(value.clone());
        Variable {
            current: Arc::new(Mutex::new(value)),
            assign: Arc::new(Mutex::new(())),
            emitter,
            receiver,
        }
    }

    pub fn value(&self) -> T {
        lock(&self.current).clone()
    }

    /// Stores `value` and emits it to every observer.
    pub fn set_value(&mut self, value: T) {
        let _assign = lock(&self.assign);
        *lock(&self.current) = value.clone();
        self.emitter.next(value);
    }

    pub fn as_observable(&self) -> Observable<T> {
        self.receiver.clone().into()
    }

    /// Completes the stream. Subscribers arriving later only get the completion.
    pub fn complete(&mut self) {
        let _assign = lock(&self.assign);
        self.emitter.complete();
    }
}
