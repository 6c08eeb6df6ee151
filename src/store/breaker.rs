//! Circuit Breaker Module
//!
//! Three-state breaker guarding the remote store.
//!
//! - `Closed`: operations pass. Outcomes are counted in a rolling window;
//!   once the window holds at least `min_samples` outcomes and the failure
//!   share reaches `failure_threshold` percent, the circuit opens.
//! - `Open`: operations are refused with `CircuitOpen`. After
//!   `reset_timeout` the next caller becomes the half-open trial.
//! - `HalfOpen`: exactly one trial is in flight, everybody else is refused.
//!   Trial success closes the circuit with a fresh window, failure reopens it.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::{CacheError, Result};

/// Number of buckets the rolling window is split into
const WINDOW_BUCKETS: u32 = 10;

// == Breaker Config ==
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Failure percentage (1..=100) at which the circuit opens
    pub failure_threshold: u32,
    /// Outcomes the window must hold before the threshold is evaluated
    pub min_samples: u32,
    /// Span of the rolling outcome window
    pub window: Duration,
    /// Time spent open before a trial is let through
    pub reset_timeout: Duration,
    /// Per-operation deadline applied by the gateway
    pub operation_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 50,
            min_samples: 5,
            window: Duration::from_secs(10),
            reset_timeout: Duration::from_secs(30),
            operation_timeout: Duration::from_secs(3),
        }
    }
}

// == Circuit State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        })
    }
}

// == Permit ==
/// Admission ticket returned by [`CircuitBreaker::acquire`]; hand it back
/// with the operation's outcome.
#[derive(Debug)]
#[must_use = "report the outcome of the admitted operation"]
pub struct Permit {
    trial: bool,
}

impl Permit {
    /// True when this operation is the half-open probe.
    pub fn is_trial(&self) -> bool {
        self.trial
    }
}

// == Rolling Window ==
#[derive(Debug, Clone, Copy)]
struct Bucket {
    started: Instant,
    successes: u32,
    failures: u32,
}

#[derive(Debug)]
struct RollingWindow {
    buckets: VecDeque<Bucket>,
    span: Duration,
    bucket_span: Duration,
}

impl RollingWindow {
    fn new(span: Duration) -> Self {
        Self {
            buckets: VecDeque::with_capacity(WINDOW_BUCKETS as usize + 1),
            span,
            bucket_span: (span / WINDOW_BUCKETS).max(Duration::from_millis(1)),
        }
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Drops buckets that fell out of the window.
    fn expire(&mut self, now: Instant) {
        while let Some(front) = self.buckets.front() {
            if now.duration_since(front.started) >= self.span {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }

    fn record(&mut self, now: Instant, success: bool) {
        self.expire(now);
        let needs_bucket = match self.buckets.back() {
            Some(last) => now.duration_since(last.started) >= self.bucket_span,
            None => true,
        };
        if needs_bucket {
            self.buckets.push_back(Bucket {
                started: now,
                successes: 0,
                failures: 0,
            });
        }
        if let Some(current) = self.buckets.back_mut() {
            if success {
                current.successes += 1;
            } else {
                current.failures += 1;
            }
        }
    }

    /// `(total, failures)` inside the window
    fn totals(&mut self, now: Instant) -> (u32, u32) {
        self.expire(now);
        self.buckets.iter().fold((0, 0), |(total, failures), b| {
            (total + b.successes + b.failures, failures + b.failures)
        })
    }
}

// == Breaker Internals ==
#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed,
    Open { retry_at: Instant },
    HalfOpen { trial_started: Instant },
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    window: RollingWindow,
}

// == Circuit Breaker ==
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    // == Constructor ==
    pub fn new(config: BreakerConfig) -> Self {
        let window = RollingWindow::new(config.window);
        Self {
            config,
            inner: Mutex::new(Inner {
                phase: Phase::Closed,
                window,
            }),
        }
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    // == State ==
    pub async fn state(&self) -> CircuitState {
        match self.inner.lock().await.phase {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    // == Acquire ==
    /// Admits an operation or refuses it with `CircuitOpen`.
    pub async fn acquire(&self) -> Result<Permit> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        match inner.phase {
            Phase::Closed => Ok(Permit { trial: false }),
            Phase::Open { retry_at } if now >= retry_at => {
                info!("Circuit half-open: admitting trial operation");
                inner.phase = Phase::HalfOpen { trial_started: now };
                Ok(Permit { trial: true })
            }
            // A trial whose outcome never came back (caller dropped) is
            // replaced once it has been out for a full reset timeout
            Phase::HalfOpen { trial_started }
                if now.duration_since(trial_started) >= self.config.reset_timeout =>
            {
                inner.phase = Phase::HalfOpen { trial_started: now };
                Ok(Permit { trial: true })
            }
            Phase::Open { .. } | Phase::HalfOpen { .. } => Err(CacheError::CircuitOpen),
        }
    }

    // == Record Success ==
    pub async fn record_success(&self, permit: Permit) {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        match inner.phase {
            Phase::HalfOpen { .. } if permit.trial => {
                info!("Circuit closed: trial operation succeeded");
                inner.phase = Phase::Closed;
                inner.window.clear();
            }
            Phase::Closed => inner.window.record(now, true),
            // Outcome of an operation admitted before the circuit opened
            _ => {}
        }
    }

    // == Record Failure ==
    pub async fn record_failure(&self, permit: Permit) {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        match inner.phase {
            Phase::HalfOpen { .. } if permit.trial => {
                warn!("Circuit re-opened: trial operation failed");
                inner.phase = Phase::Open {
                    retry_at: now + self.config.reset_timeout,
                };
            }
            Phase::Closed => {
                inner.window.record(now, false);
                let (total, failures) = inner.window.totals(now);
                if total >= self.config.min_samples
                    && u64::from(failures) * 100
                        >= u64::from(self.config.failure_threshold) * u64::from(total)
                {
                    warn!(
                        "Circuit opened: {} of {} store operations failed",
                        failures, total
                    );
                    inner.phase = Phase::Open {
                        retry_at: now + self.config.reset_timeout,
                    };
                    inner.window.clear();
                }
            }
            _ => {}
        }
    }

    // == Release ==
    /// Returns a permit whose operation failed for reasons unrelated to store
    /// health. A trial permit reopens the probe slot without changing state.
    pub async fn release(&self, permit: Permit) {
        if !permit.trial {
            return;
        }
        let mut inner = self.inner.lock().await;
        if matches!(inner.phase, Phase::HalfOpen { .. }) {
            inner.phase = Phase::Open {
                retry_at: Instant::now(),
            };
        }
    }

    // == Manual Control ==
    /// Opens the circuit immediately, restarting the reset timeout.
    pub async fn force_open(&self) {
        let mut inner = self.inner.lock().await;
        warn!("Circuit forced open");
        inner.phase = Phase::Open {
            retry_at: Instant::now() + self.config.reset_timeout,
        };
        inner.window.clear();
    }

    /// Closes the circuit and forgets recorded outcomes.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        info!("Circuit reset to closed");
        inner.phase = Phase::Closed;
        inner.window.clear();
    }
}
