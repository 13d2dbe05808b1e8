use std::marker::PhantomData;

use super::{
    state::{ReplayPolicy, SubjectCore},
    SubjectEmitter, SubjectReceiver,
};

/// Subject holding a current value.
///
/// Seeded at construction, the current value is delivered synchronously to every new
/// observer before `subscribe` returns; each `next` replaces it. After termination
/// new observers receive only the terminal event.
///
/// The current value can be read with [`SubjectReceiver::latest`].
pub struct BehaviorSubject<T>(PhantomData<T>);

impl<T: Clone + Send + 'static> BehaviorSubject<T> {
    /// Creates a new pair of `SubjectEmitter` for emitting values and
    /// `SubjectReceiver` for subscribing to values, seeded with `value`.
    pub fn emitter_receiver(value: T) -> (SubjectEmitter<T>, SubjectReceiver<T>) {
        let core = SubjectCore::new(
            "behavior",
            ReplayPolicy {
                limit: Some(1),
                window: None,
                after_terminal: false,
            },
            Some(value),
        );
        (SubjectEmitter(core.clone()), SubjectReceiver(core))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        observer::Observer,
        subscription::subscribe::{Subscribeable, Subscriber},
    };

    fn collect(rx: &SubjectReceiver<&'static str>) -> Arc<Mutex<Vec<&'static str>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_c = seen.clone();
        rx.subscribe(Subscriber::on_next(move |v| seen_c.lock().unwrap().push(v)));
        seen
    }

    #[test]
    fn seed_is_delivered_on_subscribe() {
        let (_tx, rx) = BehaviorSubject::emitter_receiver("initial");
        let seen = collect(&rx);
        assert_eq!(*seen.lock().unwrap(), vec!["initial"]);
        assert_eq!(rx.latest(), Some("initial"));
    }

    #[test]
    fn latest_value_replaces_seed() {
        let (mut tx, rx) = BehaviorSubject::emitter_receiver("initial");
        tx.next("1");
        tx.next("2");
        let seen = collect(&rx);
        tx.next("3");
        assert_eq!(*seen.lock().unwrap(), vec!["2", "3"]);
        assert_eq!(rx.latest(), Some("3"));
    }

    #[test]
    fn no_value_replayed_after_completion() {
        let (mut tx, rx) = BehaviorSubject::emitter_receiver("initial");
        tx.next("1");
        tx.complete();

        let completed = Arc::new(Mutex::new(false));
        let completed_c = completed.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_c = seen.clone();
        rx.subscribe(Subscriber::new(
            move |v| seen_c.lock().unwrap().push(v),
            |_| {},
            move || *completed_c.lock().unwrap() = true,
        ));
        assert!(seen.lock().unwrap().is_empty());
        assert!(*completed.lock().unwrap());
    }
}
