//! # Retry Engine
//!
//! Fixed-delay retry execution for fallible operations, with a fluent builder
//! and several ways of delivering the result.
//!
//! An operation is any `Fn() -> Result<T, E>`. It is invoked until it
//! succeeds or the attempt bound is reached, pausing for a fixed delay between
//! attempts and notifying an optional callback before each retry.
//!
//! ## Delivery Strategies
//!
//! | Method | Runs on | Terminal failure |
//! |--------|---------|------------------|
//! | [`Retry::resolve_or_throw`] | caller | last error returned unchanged |
//! | [`Retry::resolve_or_throw_with`] | caller | replaced by a caller-built error |
//! | [`Retry::resolve_optional`] | caller | handed to `on_exception`, `None` returned |
//! | [`Retry::resolve_async`] | tokio task | handed to `on_exception`, handle yields `None` |
//! | [`UnboundedRetry::resolve_async`] | tokio task | none, retries until success or cancel |
//!
//! ## Quick Start
//!
//! ```rust
//! use retry_engine::Retry;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let calls = AtomicU32::new(0);
//! let status = Retry::new(|| match calls.fetch_add(1, Ordering::SeqCst) {
//!     0 | 1 => Err("service unavailable"),
//!     _ => Ok("DONE"),
//! })
//! .with_attempts(3)?
//! .with_delay(Duration::from_millis(10))
//! .on_retry(|| println!("retrying"))
//! .resolve_or_throw()?;
//!
//! assert_eq!(status, Some("DONE"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Retry<F, E> ──into_unbounded──▶ UnboundedRetry<F, E>
//!     │                                  │
//!     │ resolve_*                        │ resolve_async
//!     ▼                                  ▼
//! engine (blocking loop)          RetryHandle<T> ─▶ engine (async loop)
//!     │                                  │
//!     └──────────▶ RetryOutcome ◀────────┘
//! ```
//!
//! ## Features
//!
//! - `tracing` - tracing instrumentation with OpenTelemetry span status (enabled by default)

pub mod engine;
pub mod errors;
pub mod retry;
pub(crate) mod utils;

// Re-export commonly used types at the crate root
pub use engine::{RetryOutcome, run_with_retry};
pub use errors::{ConfigError, HandleError};
pub use retry::{Retry, RetryHandle, UnboundedRetry};
pub use utils::retry::{Attempts, OnExceptionCallback, OnRetryCallback, RetryOptions};

// Re-export for handle integration
pub use tokio_util::sync::CancellationToken;
