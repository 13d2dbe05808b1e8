use std::marker::PhantomData;

use super::{
    state::{ReplayPolicy, SubjectCore},
    SubjectEmitter, SubjectReceiver,
};

/// Multicasts values to the observers registered at the time of emission.
///
/// Nothing is stored: observers only see values emitted after they subscribed.
/// Once terminated, later observers receive just the terminal event.
///
/// # Example
///
/// ```no_run
/// use rxcore::{subjects::PublishSubject, subscribe::Subscriber, Observer, Subscribeable};
///
/// let (mut emitter, receiver) = PublishSubject::emitter_receiver();
///
/// emitter.next(1); // No observers yet, dropped.
/// receiver.subscribe(Subscriber::on_next(|v| println!("got {}", v)));
/// emitter.next(2); // Prints "got 2".
/// emitter.complete();
/// ```
pub struct PublishSubject<T>(PhantomData<T>);

impl<T: Clone + Send + 'static> PublishSubject<T> {
    /// Creates a new pair of `SubjectEmitter` for emitting values and
    /// `SubjectReceiver` for subscribing to values.
    pub fn emitter_receiver() -> (SubjectEmitter<T>, SubjectReceiver<T>) {
        let core = SubjectCore::new(
            "publish",
            ReplayPolicy {
                limit: Some(0),
                window: None,
                after_terminal: false,
            },
            None,
        );
        (SubjectEmitter(core.clone()), SubjectReceiver(core))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        errors::ObservableError,
        event::Event,
        observer::Observer,
        subscription::subscribe::{Subscribeable, Subscriber, Unsubscribeable},
    };

    fn recording() -> (Subscriber<i32>, Arc<Mutex<Vec<Event<i32>>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (en, ee, ec) = (events.clone(), events.clone(), events.clone());
        let s = Subscriber::new(
            move |v| en.lock().unwrap().push(Event::Next(v)),
            move |e| ee.lock().unwrap().push(Event::Error(e)),
            move || ec.lock().unwrap().push(Event::Completed),
        );
        (s, events)
    }

    #[test]
    fn late_observer_only_sees_later_values() {
        let (mut tx, rx) = PublishSubject::emitter_receiver();
        let (early, early_events) = recording();
        let (late, late_events) = recording();

        rx.subscribe(early);
        tx.next(1);
        rx.subscribe(late);
        tx.next(2);
        tx.complete();

        assert_eq!(
            *early_events.lock().unwrap(),
            vec![Event::Next(1), Event::Next(2), Event::Completed]
        );
        assert_eq!(
            *late_events.lock().unwrap(),
            vec![Event::Next(2), Event::Completed]
        );
    }

    #[test]
    fn terminated_subject_replays_error_only() {
        let (mut tx, rx) = PublishSubject::emitter_receiver();
        tx.next(1);
        tx.error(ObservableError::Message("down".into()).shared());
        tx.next(2);

        let (s, events) = recording();
        rx.subscribe(s);
        assert_eq!(
            *events.lock().unwrap(),
            vec![Event::Error(ObservableError::Message("down".into()).shared())]
        );
        assert!(tx.is_terminated());
        assert!(rx.is_empty());
    }

    #[test]
    fn disposing_removes_observer() {
        let (mut tx, rx) = PublishSubject::emitter_receiver();
        let (s, events) = recording();
        let subscription = rx.subscribe(s);
        assert_eq!(rx.len(), 1);

        subscription.unsubscribe();
        assert_eq!(rx.len(), 0);
        tx.next(1);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn observer_may_subscribe_from_callback() {
        let (mut tx, rx) = PublishSubject::emitter_receiver();
        let (inner, inner_events) = recording();
        let inner = Arc::new(Mutex::new(Some(inner)));
        let rx_c = rx.clone();

        rx.subscribe(Subscriber::on_next(move |_: i32| {
            if let Some(s) = inner.lock().unwrap().take() {
                rx_c.subscribe(s);
            }
        }));

        tx.next(1);
        tx.next(2);
        assert_eq!(*inner_events.lock().unwrap(), vec![Event::Next(2)]);
    }
}
