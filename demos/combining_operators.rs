//! Combining operators example
//!
//! Two subjects stand in for independent event sources: a stream of prices and a
//! stream of quantities. `combine_latest` recomputes the order value whenever either
//! side changes, `zip` pairs them strictly by position and `with_latest_from` only
//! reacts to the price stream.
//!
//! Set `RUST_LOG=rxcore=trace` to watch subscribe, dispose and terminal transitions.
//!
//! To run this example, execute `cargo run --example combining_operators`.

use rxcore::{
    subjects::PublishSubject, subscribe::Subscriber, DisposeBag, Observable, ObservableExt,
    Observer, Subscribeable,
};
use tracing_subscriber::EnvFilter;

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

    let bag = DisposeBag::new();
    let (mut prices, prices_rx) = PublishSubject::<u32>::emitter_receiver();
    let (mut quantities, quantities_rx) = PublishSubject::<u32>::emitter_receiver();

    prices_rx
        .clone()
        .combine_latest(quantities_rx.clone(), |p: u32, q: u32| format!("{} x {} = {}", p, q, p * q))
        .subscribe(printer("combine_latest"))
        .disposed_by(&bag);

    prices_rx
        .clone()
        .zip(quantities_rx.clone(), |p: u32, q: u32| format!("pair ({}, {})", p, q))
        .subscribe(printer("zip"))
        .disposed_by(&bag);

    prices_rx
        .clone()
        .with_latest_from(quantities_rx.clone(), |p: u32, q: u32| format!("price {} at qty {}", p, q))
        .subscribe(printer("with_latest_from"))
        .disposed_by(&bag);

    // Merge the raw streams and keep a running total of every number seen.
    prices_rx
        .clone()
        .merge(quantities_rx.clone())
        .scan(0, |acc, v| acc + v)
        .map(|total| format!("running total {}", total))
        .subscribe(printer("merge + scan"))
        .disposed_by(&bag);

    prices.next(10);
    quantities.next(2);
    prices.next(11);
    quantities.next(3);
    quantities.next(4);
    prices.complete();
    quantities.complete();

    // `concat` and `start_with` on cold sources.
    Observable::of(vec![3, 4])
        .start_with([1, 2])
        .concat(Observable::just(5))
        .map(|v| v.to_string())
        .subscribe(printer("concat"))
        .disposed_by(&bag);

    bag.dispose();
}
