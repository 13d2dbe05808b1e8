//! `ReplaySubject` example
//!
//! A bounded replay subject keeps the last few chat messages so that whoever joins
//! the room catches up before seeing live traffic. Once the room is closed with an
//! error, newcomers still get the kept messages followed by that same error. The
//! time-aware variant runs on a `TestScheduler`, so expiry is driven by hand.
//!
//! Set `RUST_LOG=rxcore=trace` to watch subscribe, dispose and terminal transitions.
//!
//! To run this example, execute `cargo run --example replay_subject`.

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use rxcore::{
    subjects::{BufSize, ReplaySubject},
    subscribe::Subscriber,
    ObservableError, ObservableExt, Observer, Subscribeable, TestScheduler,
};

fn member(name: &'static str) -> Subscriber<String> {
    Subscriber::new(
        move |v| println!("{} sees: {}", name, v),
        move |e| eprintln!("{} sees the room fail: {}", name, e),
        move || println!("{} sees the room close", name),
    )
}

pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let (mut room, room_rx) = ReplaySubject::emitter_receiver(BufSize::Bounded(2));

    room.next("ana: hi".to_string());
    room.next("ben: hello".to_string());
    room.next("ana: anyone up for lunch?".to_string());

    // Joins late and catches up on the last two messages only.
    room_rx.subscribe(member("cleo"));
    room.next("ben: sure".to_string());

    // Operators apply to the replay as well as to live traffic.
    room_rx
        .clone()
        .filter(|m| m.starts_with("ana"))
        .subscribe(member("ana's echo"));
    println!("newest message: {:?}", room_rx.latest());

    room.error(ObservableError::Message("server restarted".into()).shared());
    room.next("ana: lost?".to_string());

    // Still gets the kept messages, then the cached error.
    room_rx.subscribe(member("dan"));

    let scheduler = TestScheduler::new();
    let (mut board, board_rx) = ReplaySubject::emitter_receiver_time_aware(
        BufSize::Unbounded,
        Duration::from_secs(60),
        scheduler.clone(),
    );
    board.next("gate 4 open".to_string());
    scheduler.advance_by(Duration::from_secs(45));
    board.next("gate 7 open".to_string());
    scheduler.advance_by(Duration::from_secs(30));

    // "gate 4 open" is 75s old by now and is no longer replayed.
    board_rx.subscribe(member("eve"));
    board.complete();
}
