//! Example demonstrating retry and exception callbacks.
//!
//! A flaky operation fails a few times before succeeding. The `on_retry`
//! callback counts retries, and a second run that never succeeds shows the
//! exception consumer receiving the terminal error.
//!
//! # Running
//!
//! ```bash
//! cargo run --example retry_callbacks
//! ```

use retry_engine::Retry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Track calls and retries across the run
    let calls = Arc::new(AtomicU32::new(0));
    let retries = Arc::new(AtomicU32::new(0));

    let calls_clone = Arc::clone(&calls);
    let flaky = move || match calls_clone.fetch_add(1, Ordering::SeqCst) {
        0 | 1 => Err("connection refused".to_string()),
        _ => Ok("DONE"),
    };

    let retries_clone = Arc::clone(&retries);
    let status = Retry::new(flaky)
        .with_attempts(3)?
        .with_delay(Duration::from_millis(100))
        .on_retry(move || {
            let count = retries_clone.fetch_add(1, Ordering::SeqCst) + 1;
            println!("[RETRY #{count}] trying again");
        })
        .resolve_or_throw()?;

    println!(
        "Got {:?} after {} calls and {} retries",
        status,
        calls.load(Ordering::SeqCst),
        retries.load(Ordering::SeqCst)
    );

    // A run that never succeeds: the consumer sees the last error once
    let missing = Retry::new(|| Err::<(), _>("service down"))
        .with_attempts(2)?
        .on_exception(|err| println!("Giving up: {err}"))
        .resolve_optional();

    println!("Result of hopeless run: {missing:?}");

    Ok(())
}
