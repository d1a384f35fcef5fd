//! Trickle-refill rate limiter.
//!
//! A [`RateLimiter`] allows `limit` tasks to start per `interval`. Permits are
//! returned one at a time every `interval / limit` by a background ticker,
//! never all at once, and independently of whether the tasks that took them
//! succeeded. The ticker is started on first use and stops by itself once
//! every permit is back and a full interval has passed without a release.

use crate::{SourceError, SourceResult};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

struct TickerState {
    running: bool,
    last_release: Instant,
}

struct Inner {
    permits: Semaphore,
    limit: usize,
    interval: Duration,
    tick: Duration,
    /// Guards ticker start/stop together with each release.
    state: Mutex<TickerState>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, TickerState> {
        // Only plain data lives behind this lock, so a poisoned guard is
        // still consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Limits how many tasks may start per interval.
///
/// Cloning is cheap and shares the permits.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

impl RateLimiter {
    /// Creates a limiter allowing `permits` task starts per `interval`.
    pub fn new(permits: usize, interval: Duration) -> SourceResult<Self> {
        if permits == 0 {
            return Err(SourceError::Config("rate limit must allow at least one permit".into()));
        }
        if permits > Semaphore::MAX_PERMITS {
            return Err(SourceError::Config(format!("rate limit {permits} is too large")));
        }
        if interval.is_zero() {
            return Err(SourceError::Config("rate limit interval must be non-zero".into()));
        }

        let tick_nanos = interval.as_nanos().div_ceil(permits as u128);
        let tick = Duration::from_nanos(u64::try_from(tick_nanos).unwrap_or(u64::MAX));

        Ok(Self {
            inner: Arc::new(Inner {
                permits: Semaphore::new(permits),
                limit: permits,
                interval,
                tick,
                state: Mutex::new(TickerState {
                    running: false,
                    last_release: Instant::now(),
                }),
            }),
        })
    }

    /// Waits for a permit, then drives `task` to completion.
    ///
    /// The permit is consumed when the task starts; it comes back through
    /// the ticker only, whatever the task's outcome.
    pub async fn run<F: Future>(&self, task: F) -> F::Output {
        // The semaphore is never closed, so acquire cannot fail.
        if let Ok(permit) = self.inner.permits.acquire().await {
            permit.forget();
        }
        self.ensure_ticker();
        task.await
    }

    /// Permits currently available without waiting.
    pub fn available_permits(&self) -> usize {
        self.inner.permits.available_permits()
    }

    /// Whether the background ticker is running.
    pub fn is_ticking(&self) -> bool {
        self.inner.state().running
    }

    /// Time between two permit releases.
    pub fn tick(&self) -> Duration {
        self.inner.tick
    }

    fn ensure_ticker(&self) {
        let mut state = self.inner.state();
        if state.running {
            return;
        }
        state.running = true;
        drop(state);

        debug!("Starting rate limiter ticker (every {:?})", self.inner.tick);
        tokio::spawn(run_ticker(Arc::clone(&self.inner)));
    }
}

async fn run_ticker(inner: Arc<Inner>) {
    let mut ticks = time::interval_at(Instant::now() + inner.tick, inner.tick);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticks.tick().await;

        let mut state = inner.state();
        let now = Instant::now();
        if inner.permits.available_permits() < inner.limit {
            inner.permits.add_permits(1);
            state.last_release = now;
        } else if now.duration_since(state.last_release) > inner.interval {
            state.running = false;
            debug!("Rate limiter idle, stopping ticker");
            return;
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limit", &self.inner.limit)
            .field("interval", &self.inner.interval)
            .field("available", &self.available_permits())
            .finish()
    }
}
