mod custom_error;
mod register_emissions;

use std::{sync::Arc, time::Duration};

use custom_error::CustomError;
use register_emissions::{completed, Emissions};
use rxcore::{
    subjects::{BufSize, ReplaySubject},
    Event, ObservableExt, Observer, Subscribeable, TestScheduler,
};

#[test]
fn bounded_replay_serves_latest_values_to_each_newcomer() {
    let log = Emissions::new();
    let (mut stx, srx) = ReplaySubject::emitter_receiver(BufSize::Bounded(2));

    stx.next(1);
    stx.next(2);
    stx.next(3);
    srx.subscribe(log.observer("first"));
    stx.next(4);
    srx.subscribe(log.observer("second"));

    assert_eq!(log.values("first"), vec![2, 3, 4]);
    assert_eq!(log.values("second"), vec![3, 4]);
    assert_eq!(srx.latest(), Some(4));
}

#[test]
fn replay_runs_before_subscribe_returns_and_before_live_values() {
    let log = Emissions::new();
    let (mut stx, srx) = ReplaySubject::emitter_receiver(BufSize::Unbounded);
    stx.next("a");
    stx.next("b");

    srx.subscribe(log.observer("late"));
    assert_eq!(log.values("late"), vec!["a", "b"]);

    stx.next("c");
    assert_eq!(log.values("late"), vec!["a", "b", "c"]);
}

#[test]
fn completed_replay_subject_replays_buffer_then_completion() {
    let log = Emissions::new();
    let (mut stx, srx) = ReplaySubject::emitter_receiver(BufSize::Bounded(3));
    for v in 1..=5 {
        stx.next(v);
    }
    stx.complete();
    stx.next(6);

    srx.subscribe(log.observer("after"));

    assert_eq!(log.of("after"), completed([3, 4, 5]));
    assert!(srx.is_empty());
}

#[test]
fn failed_replay_subject_replays_buffer_then_error() {
    let log = Emissions::new();
    let (mut stx, srx) = ReplaySubject::emitter_receiver(BufSize::Unbounded);
    srx.subscribe(log.observer("live"));
    stx.next(1);
    stx.next(2);
    stx.error(Arc::new(CustomError));

    srx.subscribe(log.observer("after"));

    for name in ["live", "after"] {
        let events = log.of(name);
        assert_eq!(events.len(), 3, "{name}");
        assert_eq!(events[..2], [Event::Next(1), Event::Next(2)]);
        assert!(matches!(&events[2], Event::Error(e) if e.downcast_ref::<CustomError>().is_some()));
    }
}

#[test]
fn bounded_zero_replays_nothing() {
    let log = Emissions::new();
    let (mut stx, srx) = ReplaySubject::emitter_receiver(BufSize::Bounded(0));

    stx.next(1);
    srx.subscribe(log.observer("early"));
    stx.next(2);
    stx.complete();
    srx.subscribe(log.observer("late"));

    assert_eq!(log.of("early"), completed([2]));
    assert_eq!(log.of("late"), vec![Event::Completed]);
    assert_eq!(srx.latest(), None);
}

#[test]
fn time_aware_replay_drops_expired_values() {
    let log = Emissions::new();
    let scheduler = TestScheduler::new();
    let (mut stx, srx) = ReplaySubject::emitter_receiver_time_aware(
        BufSize::Bounded(10),
        Duration::from_millis(500),
        scheduler.clone(),
    );

    stx.next(1);
    scheduler.advance_by(Duration::from_millis(300));
    stx.next(2);
    srx.subscribe(log.observer("fresh"));

    // Value 1 is now 600ms old, value 2 only 300ms.
    scheduler.advance_by(Duration::from_millis(300));
    srx.subscribe(log.observer("half"));
    assert_eq!(srx.latest(), Some(2));

    scheduler.advance_by(Duration::from_millis(300));
    srx.subscribe(log.observer("stale"));
    assert_eq!(srx.latest(), None);

    stx.next(3);

    assert_eq!(log.values("fresh"), vec![1, 2, 3]);
    assert_eq!(log.values("half"), vec![2, 3]);
    assert_eq!(log.values("stale"), vec![3]);
}

#[test]
fn time_aware_window_applies_after_completion() {
    let log = Emissions::new();
    let scheduler = TestScheduler::new();
    let (mut stx, srx) = ReplaySubject::emitter_receiver_time_aware(
        BufSize::Unbounded,
        Duration::from_millis(100),
        scheduler.clone(),
    );

    stx.next("old");
    scheduler.advance_by(Duration::from_millis(150));
    stx.next("new");
    stx.complete();

    srx.subscribe(log.observer("soon"));
    scheduler.advance_by(Duration::from_millis(150));
    srx.subscribe(log.observer("later"));

    assert_eq!(log.of("soon"), completed(["new"]));
    assert_eq!(log.of("later"), vec![Event::Completed]);
}

#[test]
fn replay_subject_feeds_operator_chain() {
    let log = Emissions::new();
    let (mut stx, srx) = ReplaySubject::emitter_receiver(BufSize::Bounded(4));
    for v in 1..=6 {
        stx.next(v);
    }

    srx.clone()
        .filter(|v| v % 2 == 1)
        .take(2)
        .subscribe(log.observer("odd"));

    // `take` finished during the replay and released the subject.
    assert_eq!(log.of("odd"), completed([3, 5]));
    assert!(srx.is_empty());
}
