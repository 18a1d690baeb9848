//! Example demonstrating cancellation of an unbounded retry.
//!
//! The operation never succeeds, so the run would retry forever. Another task
//! cancels it after a second.
//!
//! # Running
//!
//! ```bash
//! cargo run --example with_cancellation
//! ```

use retry_engine::{HandleError, UnboundedRetry};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let mut handle = UnboundedRetry::new(|| Err::<u32, _>("still offline"))
        .with_delay(Duration::from_millis(250))
        .on_exception(|err| println!("Attempt failed: {err}"))
        .resolve_async();

    // Cancel from another task after one second
    let token = handle.cancellation_token();
    let cancel_task = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        println!("Cancelling retry run...");
        token.cancel();
    });

    // A short wait times out without stopping the run
    if let Err(HandleError::Timeout { timeout }) = handle.wait_timeout(Duration::from_millis(100)).await {
        println!("Still running after {timeout:?}");
    }

    match handle.await {
        Ok(Some(value)) => println!("Succeeded with {value}"),
        Ok(None) => println!("Finished without a value"),
        Err(HandleError::Cancelled) => println!("Retry run was cancelled"),
        Err(e) => println!("Error: {e}"),
    }

    let _ = cancel_task.await;
}
