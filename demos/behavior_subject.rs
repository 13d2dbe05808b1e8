//! `BehaviorSubject` example
//!
//! A behavior subject stands in for a text field that always has a current value,
//! and a publish subject for the button that submits it. `sample` only forwards the
//! text when the button is pressed and something new was typed since the last
//! press. A `Variable` keeps the chosen city as plain get/set state.
//!
//! Set `RUST_LOG=rxcore=trace` to watch subscribe, dispose and terminal transitions.
//!
//! To run this example, execute `cargo run --example behavior_subject`.

use std::fmt::Display;

use tracing_subscriber::EnvFilter;

use rxcore::{
    subjects::{BehaviorSubject, PublishSubject, Variable},
    subscribe::Subscriber,
    ObservableExt, Observer, Subscribeable,
};

fn printer<T: Display>(label: &'static str) -> Subscriber<T> {
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

    let (mut text_field, text_rx) = BehaviorSubject::emitter_receiver(String::new());
    let (mut button, button_rx) = PublishSubject::<()>::emitter_receiver();

    // The empty seed counts as the first value, so the first press submits "".
    let _submitted = text_rx
        .clone()
        .sample(button_rx.clone())
        .map(|city| format!("search for {:?}", city))
        .subscribe(printer("submit"));

    button.next(());
    text_field.next("Par".to_string());
    text_field.next("Pari".to_string());
    text_field.next("Paris".to_string());
    button.next(());
    // Nothing new was typed: the second press is ignored.
    button.next(());
    println!("text field holds {:?}", text_rx.latest());

    // The field is closed with "Berlin" still unsent; the next press submits it and
    // ends the search stream.
    text_field.next("Berlin".to_string());
    text_field.complete();
    button.next(());
    println!("button observers left: {}", button_rx.len());

    // A late observer of a completed behavior subject only sees the completion.
    text_rx.subscribe(printer::<String>("late"));

    let mut city = Variable::new("Lisbon");
    let _visits = city
        .as_observable()
        .scan(0, |count, _| count + 1)
        .map(|count| format!("visit #{}", count))
        .subscribe(printer("visits"));
    city.set_value("Copenhagen");
    city.set_value("Vienna");
    println!("current city: {}", city.value());
    city.complete();
}
