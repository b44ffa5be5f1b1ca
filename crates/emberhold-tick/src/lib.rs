//! Dispatch pacing for Emberhold.
//!
//! Every active character runs its own input loop, and that loop executes
//! at most one command per tick. Lines that arrive between ticks replace
//! each other, so a client that floods input gets its latest command run
//! once per period instead of a backlog.
//!
//! # Integration
//!
//! The scheduler sits inside the input loop's `tokio::select!`, racing the
//! session's inbound queue:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         biased;
//!         line = inbound.recv() => match line {
//!             Some(line) => pending = Some(line),
//!             None => break,
//!         },
//!         _ = scheduler.wait_for_tick() => {
//!             if let Some(line) = pending.take() { run(line).await; }
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

use std::time::{Duration, Instant};

use rand::Rng;
use serde::Deserialize;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when the loop comes back to the scheduler later than the
/// next deadline (a command handler blocked on a busy room lock, say).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickPolicy {
    /// Forget the missed ticks and schedule the next one a full period
    /// from now. A slow command never buys the player a burst of fast ones.
    #[default]
    Skip,
    /// Keep the original cadence: the next tick fires at its originally
    /// scheduled time, which may already be in the past.
    Drop,
}

/// Configuration for one character's dispatch tick.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Time between dispatch opportunities.
    #[serde(with = "millis")]
    pub period: Duration,
    /// Overrun handling policy.
    pub policy: TickPolicy,
    /// Random delay (0–max) added to the *first* tick so characters that
    /// log in together don't all dispatch on the same instant.
    #[serde(with = "millis")]
    pub initial_jitter: Duration,
    /// Warn when a single command takes longer than this fraction of the
    /// period. Default: 1.0.
    pub handler_warn_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Self::DEFAULT_PERIOD,
            policy: TickPolicy::default(),
            initial_jitter: Duration::from_millis(50),
            handler_warn_threshold: 1.0,
        }
    }
}

impl TickConfig {
    /// One command per second.
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

    /// Shortest period accepted; anything faster defeats flood control.
    pub const MIN_PERIOD: Duration = Duration::from_millis(10);

    /// A config with the given period and no jitter.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            initial_jitter: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(
                period_ms = self.period.as_millis() as u64,
                min_ms = Self::MIN_PERIOD.as_millis() as u64,
                "dispatch period below minimum, clamping"
            );
            self.period = Self::MIN_PERIOD;
        }
        if self.initial_jitter > self.period {
            self.initial_jitter = self.period;
        }
        self.handler_warn_threshold = self.handler_warn_threshold.max(0.0);
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if this tick fired noticeably late.
    pub overrun: bool,
    /// How many whole periods were skipped because of the overrun.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters kept per scheduler.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Longest time between a tick firing and [`TickScheduler::record_tick_end`].
    pub max_handler_time: Duration,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-period tick for one character's input loop.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    /// When the next tick should fire (Tokio instant for `sleep_until`).
    next_tick: TokioInstant,
    /// Wall-clock start of the command run after the last tick.
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Create a new scheduler from config. The first tick fires one period
    /// (plus jitter) from now.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();

        let jitter = if config.initial_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max = config.initial_jitter.as_micros() as u64;
            Duration::from_micros(rand::rng().random_range(0..max))
        };

        debug!(
            period_ms = config.period.as_millis() as u64,
            policy = ?config.policy,
            "dispatch tick created"
        );

        Self {
            next_tick: TokioInstant::now() + config.period + jitter,
            config,
            tick_count: 0,
            tick_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// A scheduler with the given period and default settings otherwise.
    pub fn with_period(period: Duration) -> Self {
        Self::new(TickConfig::with_period(period))
    }

    /// Wait until the next tick is due.
    ///
    /// Cancel-safe: if the future is dropped (another `select!` branch
    /// won), the deadline is unchanged and the next call waits for the
    /// same instant.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let next = self.next_tick;
        let period = self.config.period;

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > period / 10;
        let mut ticks_skipped = 0u64;

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped = (late_by.as_nanos() / period.as_nanos()) as u64;
                    if ticks_skipped > 0 {
                        debug!(
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_secs_f64() * 1000.0,
                            "dispatch tick late, skipping ahead"
                        );
                    }
                }
                now + period
            }
            TickPolicy::Drop => next + period,
        };

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick_count, overrun, "dispatch tick");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Record that whatever ran on this tick has finished.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();

        let utilization = elapsed.as_secs_f64() / self.config.period.as_secs_f64();
        if utilization >= self.config.handler_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                period_ms = self.config.period.as_secs_f64() * 1000.0,
                "command ran longer than a dispatch period"
            );
        }
        if elapsed > self.metrics.max_handler_time {
            self.metrics.max_handler_time = elapsed;
        }
    }

    /// Current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// The configured period.
    pub fn period(&self) -> Duration {
        self.config.period
    }
}
