//! `PublishSubject` example
//!
//! Two publish subjects play the left and right side of a city picker. `amb` follows
//! whichever side speaks first and drops the other one. A third subject shows what a
//! late observer of a failed subject gets, and how closing the receiver differs from
//! completing the emitter.
//!
//! Set `RUST_LOG=rxcore=trace` to watch subscribe, dispose and terminal transitions.
//!
//! To run this example, execute `cargo run --example subject`.

use tracing_subscriber::EnvFilter;

use rxcore::{
    subjects::PublishSubject, subscribe::Subscriber, ObservableError, ObservableExt, Observer,
    Subscribeable, Unsubscribeable,
};

fn printer(label: &'static str) -> Subscriber<String> {
    Subscriber::new(
        move |v| println!("[{}] {}", label, v),
        move |e| eprintln!("[{}] error: {}", label, e),
        move || println!("[{}] completed", label),
    )
}

pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let (mut left, left_rx) = PublishSubject::<String>::emitter_receiver();
    let (mut right, right_rx) = PublishSubject::<String>::emitter_receiver();

    let _picked = left_rx.clone().amb(right_rx.clone()).subscribe(printer("amb"));
    println!("observers before anyone spoke: left {}, right {}", left_rx.len(), right_rx.len());

    // Right speaks first, so `amb` sticks with it and lets go of the left subject.
    right.next("Copenhagen".to_string());
    left.next("Lisbon".to_string());
    left.next("London".to_string());
    left.next("Madrid".to_string());
    right.next("Vienna".to_string());
    println!("observers after the race: left {}, right {}", left_rx.len(), right_rx.len());
    right.complete();

    // A failed subject hands the same cached error to everyone who shows up later.
    let (mut alerts, alerts_rx) = PublishSubject::<String>::emitter_receiver();
    alerts_rx.subscribe(printer("alerts live"));
    alerts.next("storm warning".to_string());
    alerts.error(ObservableError::Message("sensor offline".into()).shared());
    alerts.next("ignored".to_string());
    alerts_rx
        .clone()
        .map(|v| v.to_uppercase())
        .subscribe(printer("alerts late"));

    // Closing the receiver drops every observer without a terminal event.
    let (mut feed, feed_rx) = PublishSubject::<String>::emitter_receiver();
    feed_rx.subscribe(printer("feed"));
    feed.next("first headline".to_string());
    feed_rx.clone().unsubscribe();
    feed.next("never delivered".to_string());
    feed.complete();
    println!("feed closed: terminated = {}, observers = {}", feed.is_terminated(), feed_rx.len());
}
