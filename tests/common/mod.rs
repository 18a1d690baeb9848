//! Shared fixtures for retry integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Status produced by a [`Wizard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicStatus {
    Done,
    Failed,
}

/// Error raised when the wizard's magic fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MagicError {
    #[error("magic failed on attempt {attempt}")]
    Failed { attempt: usize },
    #[error("the wizard gave up")]
    GaveUp,
}

/// Scripted operation that records how often, and when, it was invoked.
///
/// Statuses are consumed in order; once the script runs out the last status
/// repeats.
#[derive(Debug, Clone)]
pub struct Wizard {
    script: Arc<Mutex<VecDeque<MagicStatus>>>,
    last: MagicStatus,
    calls: Arc<AtomicUsize>,
    excuses: Arc<AtomicUsize>,
    calls_at: Arc<Mutex<Vec<Instant>>>,
    excuses_at: Arc<Mutex<Vec<Instant>>>,
}

impl Wizard {
    pub fn new(script: &[MagicStatus]) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.iter().copied().collect())),
            last: script.last().copied().unwrap_or(MagicStatus::Failed),
            calls: Arc::new(AtomicUsize::new(0)),
            excuses: Arc::new(AtomicUsize::new(0)),
            calls_at: Arc::new(Mutex::new(Vec::new())),
            excuses_at: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fails `failures` times, then succeeds forever.
    pub fn failing(failures: usize) -> Self {
        let mut script = vec![MagicStatus::Failed; failures];
        script.push(MagicStatus::Done);
        Self::new(&script)
    }

    /// Never succeeds.
    pub fn hopeless() -> Self {
        Self::new(&[MagicStatus::Failed])
    }

    pub fn do_magic(&self) -> MagicStatus {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.calls_at.lock().unwrap().push(Instant::now());
        self.script.lock().unwrap().pop_front().unwrap_or(self.last)
    }

    pub fn do_magic_or_fail(&self) -> Result<MagicStatus, MagicError> {
        match self.do_magic() {
            MagicStatus::Done => Ok(MagicStatus::Done),
            MagicStatus::Failed => Err(MagicError::Failed {
                attempt: self.calls(),
            }),
        }
    }

    /// Operation closure suitable for `Retry::new`.
    pub fn operation(&self) -> impl Fn() -> Result<MagicStatus, MagicError> + Send + Sync + use<> {
        let wizard = self.clone();
        move || wizard.do_magic_or_fail()
    }

    /// Retry callback that counts excuses and records when each was made.
    pub fn excuse(&self) -> impl Fn() + Send + Sync + use<> {
        let excuses = Arc::clone(&self.excuses);
        let excuses_at = Arc::clone(&self.excuses_at);
        move || {
            excuses_at.lock().unwrap().push(Instant::now());
            excuses.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn excuses(&self) -> usize {
        self.excuses.load(Ordering::SeqCst)
    }

    pub fn calls_at(&self) -> Vec<Instant> {
        self.calls_at.lock().unwrap().clone()
    }

    pub fn excuses_at(&self) -> Vec<Instant> {
        self.excuses_at.lock().unwrap().clone()
    }

    /// Assert the retry callback fired only after a full `delay` following
    /// each failed attempt, and attempts were at least `delay` apart.
    pub fn assert_paced(&self, started: Instant, delay: Duration) {
        let calls_at = self.calls_at();
        let excuses_at = self.excuses_at();
        assert!(!excuses_at.is_empty(), "no retry was made");
        assert!(
            excuses_at[0] - started >= delay,
            "first retry callback after {:?}, expected at least {delay:?}",
            excuses_at[0] - started
        );
        for (failed_at, excused_at) in calls_at.iter().zip(&excuses_at) {
            assert!(
                *excused_at - *failed_at >= delay,
                "retry callback {:?} after the failed attempt",
                *excused_at - *failed_at
            );
        }
        for pair in calls_at.windows(2) {
            assert!(pair[1] - pair[0] >= delay, "gap {:?} shorter than delay", pair[1] - pair[0]);
        }
    }
}

/// Exception consumer that records every error it receives.
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    seen: Arc<Mutex<Vec<MagicError>>>,
}

impl ErrorLog {
    pub fn consumer(&self) -> impl Fn(&MagicError) + Send + Sync + use<> {
        let seen = Arc::clone(&self.seen);
        move |err| seen.lock().unwrap().push(err.clone())
    }

    pub fn seen(&self) -> Vec<MagicError> {
        self.seen.lock().unwrap().clone()
    }
}
