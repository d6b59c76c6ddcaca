use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::telemetry::LogContext;

// ─── Constants ───────────────────────────────────────────────────

/// Draws are uniform over `1..=MAX_DRAW`.
pub const MAX_DRAW: u32 = 100;

/// Draws at or below this fail (~25 % of the time).
pub const FAILURE_THRESHOLD: u32 = 25;

// ─── Outcome ─────────────────────────────────────────────────────

pub type WorkOutcome = Result<(), WorkFailure>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("simulated work failed (drew {drawn})")]
pub struct WorkFailure {
    pub drawn: u32,
}

// ─── Abstractions ────────────────────────────────────────────────

/// The business operation being instrumented. Implementations know nothing
/// about timing or counters; the layers around them do.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn run(&self, log: &LogContext) -> WorkOutcome;
}

/// Source of the values the simulated work draws.
pub trait Draw: Send + Sync {
    /// Returns a value in `1..=MAX_DRAW`.
    fn draw(&self) -> u32;
}

/// `StdRng`-backed draws; pass a seed for a reproducible sequence.
pub struct SeededDraws {
    rng: Mutex<StdRng>,
}

impl SeededDraws {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl Draw for SeededDraws {
    fn draw(&self) -> u32 {
        self.rng.lock().gen_range(1..=MAX_DRAW)
    }
}

// ─── Simulated work ──────────────────────────────────────────────

/// Pretend work: sleeps `drawn × unit`, fails when the draw is
/// `<= FAILURE_THRESHOLD`.
pub struct SimulatedWork<D = SeededDraws> {
    draws: D,
    unit: Duration,
}

impl<D: Draw> SimulatedWork<D> {
    pub fn new(draws: D, unit: Duration) -> Self {
        Self { draws, unit }
    }
}

#[async_trait]
impl<D: Draw> UnitOfWork for SimulatedWork<D> {
    async fn run(&self, log: &LogContext) -> WorkOutcome {
        let log = log.for_func("work");
        let start = Instant::now();

        // Draw before the await so the rng lock is never held across it.
        let drawn = self.draws.draw();
        tokio::time::sleep(self.unit * drawn).await;

        log.in_scope(|| {
            tracing::info!(
                work_seconds = start.elapsed().as_secs_f64(),
                "Work complete"
            );
        });

        if drawn <= FAILURE_THRESHOLD {
            Err(WorkFailure { drawn })
        } else {
            Ok(())
        }
    }
}

/// Replays a fixed list of draws, cycling when it runs out.
#[cfg(test)]
pub struct ScriptedDraws {
    values: Vec<u32>,
    next: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl ScriptedDraws {
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            next: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
impl Draw for ScriptedDraws {
    fn draw(&self) -> u32 {
        let i = self
            .next
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.values[i % self.values.len()]
    }
}
