//! Process-wide round counters.
//! Cheap atomics; a host bot can log or export a [`Snapshot`] periodically.
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::game::Outcome;

static ROUNDS_STARTED: AtomicU64 = AtomicU64::new(0);
static ROUNDS_WON: AtomicU64 = AtomicU64::new(0);
static ROUNDS_LOST: AtomicU64 = AtomicU64::new(0);
static ROUNDS_TIMED_OUT: AtomicU64 = AtomicU64::new(0);
static START_FAILURES: AtomicU64 = AtomicU64::new(0);
static WRONG_GUESSES: AtomicU64 = AtomicU64::new(0);
static ROUND_MS_SUM: AtomicU64 = AtomicU64::new(0);
static ROUND_MS_COUNT: AtomicU64 = AtomicU64::new(0);

pub fn inc_rounds_started() { ROUNDS_STARTED.fetch_add(1, Ordering::Relaxed); }
pub fn inc_start_failures() { START_FAILURES.fetch_add(1, Ordering::Relaxed); }
pub fn inc_wrong_guesses() { WRONG_GUESSES.fetch_add(1, Ordering::Relaxed); }

pub fn observe_outcome(outcome: Outcome, elapsed: Duration) {
    let counter = match outcome {
        Outcome::Won => &ROUNDS_WON,
        Outcome::Lost => &ROUNDS_LOST,
        Outcome::TimedOut => &ROUNDS_TIMED_OUT,
    };
    counter.fetch_add(1, Ordering::Relaxed);
    ROUND_MS_SUM.fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    ROUND_MS_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub rounds_started: u64,
    pub rounds_won: u64,
    pub rounds_lost: u64,
    pub rounds_timed_out: u64,
    pub start_failures: u64,
    pub wrong_guesses: u64,
    pub round_avg_ms: Option<u64>,
}

pub fn snapshot() -> Snapshot {
    let sum = ROUND_MS_SUM.load(Ordering::Relaxed);
    let count = ROUND_MS_COUNT.load(Ordering::Relaxed);
    Snapshot {
        rounds_started: ROUNDS_STARTED.load(Ordering::Relaxed),
        rounds_won: ROUNDS_WON.load(Ordering::Relaxed),
        rounds_lost: ROUNDS_LOST.load(Ordering::Relaxed),
        rounds_timed_out: ROUNDS_TIMED_OUT.load(Ordering::Relaxed),
        start_failures: START_FAILURES.load(Ordering::Relaxed),
        wrong_guesses: WRONG_GUESSES.load(Ordering::Relaxed),
        round_avg_ms: if count > 0 { Some(sum / count) } else { None },
    }
}
