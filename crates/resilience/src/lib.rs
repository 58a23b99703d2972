//! Circuit breaker guarding every external-model call in the pipeline.
//!
//! Every enrichment step (embedding, summarization, keyword extraction, tag
//! extraction, proposition extraction) and every retrieval channel that
//! leaves the process goes through a [`CircuitBreaker`]. Breakers are
//! per-service: a flaky summarizer should not fail fast the embedding
//! client, so callers keep one breaker per service name via
//! [`CircuitBreakerRegistry`].
//!
//! ## States
//!
//! - `Closed` — normal operation. Failures accumulate; once
//!   `failure_threshold` consecutive failures are recorded, the breaker
//!   opens.
//! - `Open` — fails fast (`allow_request` returns `false`) until
//!   `reset_timeout` has elapsed since the last state change, at which
//!   point the next `allow_request` call flips the breaker to `HalfOpen`.
//! - `HalfOpen` — a limited number of probe calls are allowed through. Any
//!   failure reopens the circuit immediately; `half_open_max_calls`
//!   consecutive successes close it.
//!
//! ## Quick start
//!
//! ```
//! use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//!
//! let cb = CircuitBreaker::new(CircuitBreakerConfig::default().with_failure_threshold(3));
//! for _ in 0..3 {
//!     cb.record_failure();
//! }
//! assert_eq!(cb.current_state(), CircuitState::Open);
//! assert!(!cb.allow_request());
//! ```

mod breaker;
mod registry;

pub use breaker::{BreakerStats, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use registry::CircuitBreakerRegistry;

/// Error returned by [`CircuitBreaker::guard`] when the circuit is open.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("circuit breaker open for service {service}")]
pub struct BreakerOpen {
    pub service: String,
}
