mod generate_observable;

use std::sync::{Arc, Mutex};

use generate_observable::generate_u32_observable;

use rxcore::{
    subjects::{BufSize, PublishSubject},
    subscribe::Subscriber,
    Observable, ObservableExt, Observer, Subscribeable, Unsubscribeable,
};

#[test]
fn connectable_observable() {
    let emitted = Arc::new(Mutex::new(Vec::with_capacity(27)));
    let emitted_cl1 = Arc::clone(&emitted);
    let emitted_cl2 = Arc::clone(&emitted);
    let emitted_cl3 = Arc::clone(&emitted);

    let observer1 = Subscriber::on_next(move |v| {
        emitted_cl1.lock().unwrap().push(v);
    });
    let observer2 = Subscriber::on_next(move |v| {
        emitted_cl2.lock().unwrap().push(v);
    });
    let observer3 = Subscriber::on_next(move |v| {
        emitted_cl3.lock().unwrap().push(v);
    });

    let observable = generate_u32_observable(8, |_| {});

    let connectable = observable.publish();

    connectable.subscribe(observer1);
    connectable.subscribe(observer2);
    connectable.subscribe(observer3);

    assert_eq!(
        emitted.lock().unwrap().len(),
        0,
        "connectable observable emitted values before calling `connect()`"
    );

    let s = connectable.connect();
    s.join().unwrap();

    let emitted_guard = emitted.lock().unwrap();
    let emitted_ref: &[u32] = emitted_guard.as_ref();

    assert_eq!(
        emitted_ref.len(),
        27,
        "connectable observable emitted wrong number of values"
    );
}

#[test]
fn connect_twice_shares_connection() {
    let subscriptions = Arc::new(Mutex::new(0));
    let subscriptions_c = Arc::clone(&subscriptions);
    let source = Observable::deferred(move || {
        *subscriptions_c.lock().unwrap() += 1;
        Observable::of(vec![1, 2, 3])
    });

    let connectable = source.publish();
    let _first = connectable.connect();
    let _second = connectable.connect();

    assert!(connectable.is_connected());
    assert_eq!(*subscriptions.lock().unwrap(), 1);
}

#[test]
fn disconnect_stops_threaded_source() {
    let emitted = Arc::new(Mutex::new(Vec::new()));
    let emitted_c = Arc::clone(&emitted);

    let connectable = generate_u32_observable(10_000, |last| {
        assert!(last < 10_000, "source kept running after disconnect");
    })
    .publish();
    connectable.subscribe(Subscriber::on_next(move |v| emitted_c.lock().unwrap().push(v)));

    let mut connection = connectable.connect();
    std::thread::sleep(std::time::Duration::from_millis(20));
    connection.dispose();
    if let Err(e) = connection.join() {
        std::panic::resume_unwind(e);
    }

    let count = emitted.lock().unwrap().len();
    assert!(count > 0 && count < 10_001);
}

#[test]
fn reconnect_after_disconnect_resubscribes_source() {
    let (mut source_tx, source_rx) = PublishSubject::emitter_receiver();
    let connectable = source_rx.clone().publish();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_c = Arc::clone(&seen);
    connectable.subscribe(Subscriber::on_next(move |v| seen_c.lock().unwrap().push(v)));

    let mut first = connectable.connect();
    let mut stale = connectable.connect();
    source_tx.next(1);
    first.dispose();
    assert!(!connectable.is_connected());
    assert!(source_rx.is_empty());
    source_tx.next(2);

    let mut second = connectable.connect();
    assert!(connectable.is_connected());
    source_tx.next(3);

    // A handle from an earlier connection leaves the current one alone.
    stale.dispose();
    source_tx.next(4);
    assert!(connectable.is_connected());

    second.dispose();
    source_tx.next(5);

    assert_eq!(*seen.lock().unwrap(), vec![1, 3, 4]);
}

#[test]
fn replay_connectable_feeds_late_subscribers() {
    let connectable = Observable::of(vec![1, 2, 3, 4]).replay(BufSize::Bounded(2));
    let _connection = connectable.connect();

    let late = Arc::new(Mutex::new(Vec::new()));
    let late_c = Arc::clone(&late);
    connectable.subscribe(Subscriber::on_next(move |v| late_c.lock().unwrap().push(v)));

    assert_eq!(*late.lock().unwrap(), vec![3, 4]);
}

#[test]
fn share_replay_runs_source_once() {
    let subscriptions = Arc::new(Mutex::new(0));
    let subscriptions_c = Arc::clone(&subscriptions);
    let shared = Observable::deferred(move || {
        *subscriptions_c.lock().unwrap() += 1;
        Observable::of(vec!["a", "b", "c"])
    })
    .share_replay(BufSize::Unbounded);

    let seen = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..3 {
        let seen = Arc::clone(&seen);
        shared
            .subscribe(Subscriber::on_next(move |v| seen.lock().unwrap().push(v)))
            .unsubscribe();
    }

    assert_eq!(*subscriptions.lock().unwrap(), 1);
    assert_eq!(seen.lock().unwrap().len(), 9);
}
