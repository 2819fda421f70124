//! Clock and randomness seams handed to game rules.
//!
//! Rules never read the wall clock or a global RNG directly. They ask the
//! [`GameContext`] they were given, so tests can pin the secret number, the
//! drawn word, and the elapsed round time.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::instrument;

/// Source of wall-clock time, in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time in milliseconds.
    fn now_millis(&self) -> i64;
}

/// Source of uniformly distributed indices.
pub trait RandomSource: Send + Sync + fmt::Debug {
    /// Returns a value in `0..bound`. Callers never pass a zero bound.
    fn below(&self, bound: usize) -> usize;
}

/// Real time, via chrono.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `start_millis`.
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(start_millis),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let step = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(step, Ordering::SeqCst);
    }

    /// Jumps to an absolute time.
    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Thread-local RNG from `rand`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn below(&self, bound: usize) -> usize {
        rand::thread_rng().gen_range(0..bound.max(1))
    }
}

/// Replays a scripted list of draws, then keeps returning zero.
///
/// Each draw is reduced modulo the requested bound.
#[derive(Debug, Default)]
pub struct SequenceRandom {
    draws: Mutex<VecDeque<usize>>,
}

impl SequenceRandom {
    /// Creates a source that yields `draws` in order.
    pub fn new(draws: impl IntoIterator<Item = usize>) -> Self {
        Self {
            draws: Mutex::new(draws.into_iter().collect()),
        }
    }
}

impl RandomSource for SequenceRandom {
    fn below(&self, bound: usize) -> usize {
        let next = self
            .draws
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(0);
        next % bound.max(1)
    }
}

/// Everything a rules variant may consult besides its own state.
#[derive(Debug, Clone)]
pub struct GameContext {
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl GameContext {
    /// Builds a context from explicit seams.
    #[instrument(skip_all)]
    pub fn new(clock: Arc<dyn Clock>, random: Arc<dyn RandomSource>) -> Self {
        Self { clock, random }
    }

    /// Real clock and thread RNG.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(ThreadRandom))
    }

    /// Current time in milliseconds since the epoch.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Draws an index in `0..bound`.
    pub fn draw(&self, bound: usize) -> usize {
        self.random.below(bound)
    }
}

impl Default for GameContext {
    fn default() -> Self {
        Self::system()
    }
}
