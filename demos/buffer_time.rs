//! Time based operators example
//!
//! An `interval` driven by the tokio runtime produces a tick every 40 milliseconds.
//! `buffer` groups the ticks into batches of at most three values or whatever
//! arrived within 100 milliseconds, and `take_until` stops everything once a timer
//! fires.
//!
//! Set `RUST_LOG=rxcore=trace` to watch subscribe, dispose and terminal transitions.
//!
//! To run this example, execute `cargo run --example buffer_time`.

use std::time::Duration;

use rxcore::{subscribe::Subscriber, Observable, ObservableExt, Subscribeable, TokioScheduler};
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let scheduler = TokioScheduler::current()?;
    let (done_tx, done_rx) = oneshot::channel();
    let mut done_tx = Some(done_tx);

    let stop = Observable::timer(Duration::from_millis(650), scheduler.clone());
    let mut subscription = Observable::interval(Duration::from_millis(40), scheduler.clone())
        .buffer(Duration::from_millis(100), 3, scheduler.clone())
        .take_until(stop)
        .subscribe(Subscriber::new(
            |batch| println!("batch {:?}", batch),
            |e| eprintln!("error: {}", e),
            move || {
                println!("stopped");
                if let Some(tx) = done_tx.take() {
                    let _ = tx.send(());
                }
            },
        ));

    done_rx.await?;
    subscription.dispose();
    Ok(())
}
