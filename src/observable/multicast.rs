//! Module for handling observables with multicast capabilities.
//!
//! A [`Connectable`] routes one subscription to its source through a subject, so
//! every subscriber shares the same emissions instead of running the source again.
//! Nothing flows until [`Connectable::connect`] is called.

use std::sync::{Arc, Mutex};

use super::{Observable, ObservableExt};
use crate::{
    subjects::{BufSize, PublishSubject, ReplaySubject, SubjectEmitter, SubjectReceiver},
    subscription::subscribe::{
        lock, Subscribeable, Subscriber, Subscription, UnsubscribeLogic,
    },
};

#[derive(Default)]
struct Connection {
    connected: bool,
    generation: u64,
    upstream: Option<Subscription>,
}

/// Multicasting observable with a `connect()` method for creating the subscription
/// to the underlying source.
///
/// Subscribers register with the inner subject; once connected, the source emits into
/// that subject. Created by [`ObservableExt::publish`] and [`ObservableExt::replay`].
pub struct Connectable<T> {
    source: Observable<T>,
    emitter: SubjectEmitter<T>,
    receiver: SubjectReceiver<T>,
    connection: Arc<Mutex<Connection>>,
}

impl<T> Clone for Connectable<T> {
    fn clone(&self) -> Self {
        Connectable {
            source: self.source.clone(),
            emitter: self.emitter.clone(),
            receiver: self.receiver.clone(),
            connection: Arc::clone(&self.connection),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Connectable<T> {
    pub(crate) fn publish(source: Observable<T>) -> Self {
        let (emitter, receiver) = PublishSubject::emitter_receiver();
        Self::with_subject(source, emitter, receiver)
    }

    pub(crate) fn replay(source: Observable<T>, buf_size: BufSize) -> Self {
        let (emitter, receiver) = ReplaySubject::emitter_receiver(buf_size);
        Self::with_subject(source, emitter, receiver)
    }

    fn with_subject(
        source: Observable<T>,
        emitter: SubjectEmitter<T>,
        receiver: SubjectReceiver<T>,
    ) -> Self {
        Connectable {
            source,
            emitter,
            receiver,
            connection: Arc::new(Mutex::new(Connection::default())),
        }
    }

    /// Subscribes the shared subject to the source.
    ///
    /// The returned subscription disconnects the source; subscribers stay registered
    /// but receive nothing more until the next `connect`. Connecting while already
    /// connected does not subscribe again and returns a handle to the existing
    /// connection. A handle only ever disconnects the connection it was issued for.
    #[must_use]
    pub fn connect(&self) -> Subscription {
        let (first, generation) = {
            let mut connection = lock(&self.connection);
            let first = !std::mem::replace(&mut connection.connected, true);
            if first {
                connection.generation += 1;
            }
            (first, connection.generation)
        };
        let connection = Arc::clone(&self.connection);
        let disconnect = move || {
            let upstream = {
                let mut connection = lock(&connection);
                if connection.generation != generation || !connection.connected {
                    return;
                }
                connection.connected = false;
                connection.upstream.take()
            };
            tracing::debug!("connectable disconnected");
            if let Some(mut upstream) = upstream {
                upstream.dispose();
            }
        };
        if !first {
            return Subscription::from_logic(disconnect);
        }

        tracing::debug!("connectable connected");
        let mut upstream = self
            .source
            .subscribe(Subscriber::from(self.emitter.clone()));
        let handle = upstream.take_handle();
        {
            let mut connection = lock(&self.connection);
            if connection.generation == generation && connection.connected {
                connection.upstream = Some(upstream);
            } else {
                drop(connection);
                upstream.dispose();
            }
        }
        Subscription::new(UnsubscribeLogic::Logic(Box::new(disconnect)), handle)
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.connection).connected
    }
}

impl<T: Clone + Send + 'static> Subscribeable for Connectable<T> {
    type ObsType = T;

    fn subscribe(&self, s: Subscriber<Self::ObsType>) -> Subscription {
        self.receiver.subscribe(s)
    }
}

impl<T: Clone + Send + 'static> ObservableExt<T> for Connectable<T> {}

impl<T: Clone + Send + 'static> From<Connectable<T>> for Observable<T> {
    fn from(value: Connectable<T>) -> Self {
        Observable::new(move |subscriber| value.subscribe(subscriber))
    }
}

pub(super) fn share_replay<T: Clone + Send + Sync + 'static>(
    source: Observable<T>,
    buf_size: BufSize,
) -> Observable<T> {
    let connectable = Connectable::replay(source, buf_size);
    Observable::new(move |subscriber| {
        let subscription = connectable.subscribe(subscriber);
        if !connectable.is_connected() {
            // Stays connected for the lifetime of the shared buffer.
            let _connection = connectable.connect();
        }
        subscription
    })
}
