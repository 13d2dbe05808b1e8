use std::sync::{Arc, Mutex};

use rxcore::{subscribe::Subscriber, Event};

/// One log shared by several named observers of the same subject.
///
/// Every notification is stored as an `Event` together with the name of the observer
/// it reached, in delivery order, so tests can check both what each observer saw and
/// how deliveries interleaved.
pub struct Emissions<T>(Arc<Mutex<Vec<(&'static str, Event<T>)>>>);

impl<T> Clone for Emissions<T> {
    fn clone(&self) -> Self {
        Emissions(Arc::clone(&self.0))
    }
}

impl<T: Clone + Send + 'static> Emissions<T> {
    pub fn new() -> Self {
        Emissions(Arc::new(Mutex::new(Vec::new())))
    }

    /// Subscriber recording into this log under `name`.
    pub fn observer(&self, name: &'static str) -> Subscriber<T> {
        let (ln, le, lc) = (self.clone(), self.clone(), self.clone());
        Subscriber::new(
            move |v| ln.push(name, Event::Next(v)),
            move |e| le.push(name, Event::Error(e)),
            move || lc.push(name, Event::Completed),
        )
    }

    pub fn push(&self, name: &'static str, event: Event<T>) {
        self.0.lock().unwrap().push((name, event));
    }

    /// Everything `name` received.
    pub fn of(&self, name: &str) -> Vec<Event<T>> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| *n == name)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Values `name` received, without terminal events.
    pub fn values(&self, name: &str) -> Vec<T> {
        self.of(name).into_iter().filter_map(Event::value).collect()
    }

    /// Observer names in delivery order.
    pub fn order(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().iter().map(|(n, _)| *n).collect()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

pub fn completed<T>(values: impl IntoIterator<Item = T>) -> Vec<Event<T>> {
    let mut events: Vec<Event<T>> = values.into_iter().map(Event::Next).collect();
    events.push(Event::Completed);
    events
}
