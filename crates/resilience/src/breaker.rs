use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Current state of a [`CircuitBreaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation; requests pass through.
    Closed,
    /// Failing fast; requests are rejected until `reset_timeout` elapses.
    Open,
    /// Probing recovery; a bounded number of requests are let through.
    HalfOpen,
}

/// Tunables for a [`CircuitBreaker`].
///
/// Defaults match the pipeline's documented baseline: 5 consecutive
/// failures open the circuit, a minute is given before the next probe,
/// and 3 consecutive half-open successes are required to close again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures (in `Closed`) before the breaker opens.
    pub failure_threshold: u32,
    /// Time to wait in `Open` before allowing a half-open probe.
    pub reset_timeout: Duration,
    /// Consecutive successes in `HalfOpen` required to close the circuit.
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            half_open_max_calls: 3,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    pub fn with_half_open_max_calls(mut self, calls: u32) -> Self {
        self.half_open_max_calls = calls;
        self
    }
}

/// Point-in-time snapshot of a breaker's counters, returned by `stats()`
/// without blocking ongoing calls beyond the short lock it takes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerStats {
    pub state: CircuitState,
    pub failure_count: u64,
    pub success_count: u64,
    pub last_failure_time: Option<Duration>,
    pub config: CircuitBreakerConfig,
}

/// Three-state guard in front of a single external-model call site.
///
/// All transitions are serialized behind one `Mutex<Inner>`; the critical
/// section only ever touches the state enum plus two counters, so it stays
/// short even under contention from many concurrent callers.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
    failure_count: AtomicU64,
    success_count: AtomicU32,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    last_state_change: Instant,
    last_failure_time: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                last_state_change: Instant::now(),
                last_failure_time: None,
            }),
            failure_count: AtomicU64::new(0),
            success_count: AtomicU32::new(0),
        }
    }

    /// Check (and, if appropriate, advance) the breaker, returning whether a
    /// call is allowed to proceed right now.
    ///
    /// `Open -> HalfOpen` is evaluated lazily here: the caller pays for the
    /// check only when it actually tries to go through.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                if inner.last_state_change.elapsed() >= self.config.reset_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.last_state_change = Instant::now();
                    self.success_count.store(0, Ordering::SeqCst);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful guarded call.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::SeqCst);
            }
            CircuitState::HalfOpen => {
                let successes = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.half_open_max_calls {
                    inner.state = CircuitState::Closed;
                    inner.last_state_change = Instant::now();
                    self.failure_count.store(0, Ordering::SeqCst);
                    self.success_count.store(0, Ordering::SeqCst);
                    tracing::info!("circuit_breaker: closed after half-open recovery");
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed guarded call.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.last_failure_time = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.config.failure_threshold as u64 {
                    inner.state = CircuitState::Open;
                    inner.last_state_change = Instant::now();
                    tracing::warn!(failures, "circuit_breaker: opened after consecutive failures");
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.last_state_change = Instant::now();
                self.success_count.store(0, Ordering::SeqCst);
                tracing::warn!("circuit_breaker: half-open probe failed, reopening");
            }
            CircuitState::Open => {}
        }
    }

    /// Run `op` under the breaker: fails fast with `None` when the circuit
    /// is open, otherwise runs `op` and records the outcome.
    pub fn guard<T, E>(&self, op: impl FnOnce() -> Result<T, E>) -> Option<Result<T, E>> {
        if !self.allow_request() {
            return None;
        }
        let result = op();
        match &result {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
        Some(result)
    }

    pub fn current_state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::SeqCst)
    }

    /// Current counters, state and config without blocking ongoing callers
    /// beyond the short lock acquisition.
    pub fn stats(&self) -> BreakerStats {
        let inner = self.inner.lock().unwrap();
        BreakerStats {
            state: inner.state,
            failure_count: self.failure_count.load(Ordering::SeqCst),
            success_count: self.success_count.load(Ordering::SeqCst) as u64,
            last_failure_time: inner.last_failure_time.map(|t| t.elapsed()),
            config: self.config,
        }
    }

    /// Force the breaker back to `Closed` with counters reset.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = CircuitState::Closed;
        inner.last_state_change = Instant::now();
        inner.last_failure_time = None;
        self.failure_count.store(0, Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
    }
}
