//! # Circuit Breaker Implementation
//!
//! Failure-rate circuit breaker with three states: Closed (normal operation),
//! Open (failing fast to a fallback) and Half-Open (admitting a limited number
//! of trial calls).
//!
//! Outcomes are kept in a fixed-size ring buffer. Once the window holds at
//! least `minimum_number_of_calls` outcomes and the failure rate reaches
//! `failure_rate_threshold`, the circuit opens. After
//! `wait_duration_in_open_state` the next call is admitted as a trial; the
//! circuit closes once `permitted_calls_in_half_open_state` trials succeed and
//! reopens on the first trial failure.

use crate::backend::BackendError;
use crate::error::GovernorError;
use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - limited calls allowed to test backend health
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open, // Default to safest state
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Decides whether an error says something about backend health.
///
/// Errors that return `false` still route the caller to the fallback but are
/// not recorded as failures in the sliding window.
pub trait FailureClassification {
    fn counts_as_failure(&self) -> bool {
        true
    }
}

impl FailureClassification for BackendError {
    fn counts_as_failure(&self) -> bool {
        self.is_transient()
    }
}

impl FailureClassification for GovernorError {
    fn counts_as_failure(&self) -> bool {
        self.is_backend_unavailable()
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, rejecting all calls
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation failed and was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

/// Fixed-size ring buffer of call outcomes
#[derive(Debug)]
struct SlidingWindow {
    /// `true` marks a failure
    outcomes: Vec<bool>,
    next: usize,
    filled: usize,
    failures: usize,
}

impl SlidingWindow {
    fn new(size: usize) -> Self {
        Self {
            outcomes: vec![false; size.max(1)],
            next: 0,
            filled: 0,
            failures: 0,
        }
    }

    fn record(&mut self, failed: bool) {
        let capacity = self.outcomes.len();
        if self.filled == capacity && self.outcomes[self.next] {
            self.failures -= 1;
        }

        self.outcomes[self.next] = failed;
        if failed {
            self.failures += 1;
        }

        self.next = (self.next + 1) % capacity;
        self.filled = (self.filled + 1).min(capacity);
    }

    /// Failure rate in percent; 0.0 for an empty window
    fn failure_rate(&self) -> f64 {
        if self.filled == 0 {
            0.0
        } else {
            self.failures as f64 * 100.0 / self.filled as f64
        }
    }

    fn reset(&mut self) {
        self.outcomes.iter_mut().for_each(|o| *o = false);
        self.next = 0;
        self.filled = 0;
        self.failures = 0;
    }
}

/// Lock-free counters, independent of the window
#[derive(Debug, Default)]
struct CallCounters {
    total_calls: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    ignored_failure_count: AtomicU64,
    not_permitted_count: AtomicU64,
}

/// Core circuit breaker implementation
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging and metrics
    name: String,

    /// Current circuit state (atomic for lock-free reads)
    state: AtomicU8,

    config: CircuitBreakerConfig,

    /// Outcome window; state transitions happen while holding this lock
    window: Mutex<SlidingWindow>,

    counters: CallCounters,

    /// Trial calls admitted since entering half-open
    half_open_admitted: AtomicU32,

    /// Trial calls that succeeded since entering half-open
    half_open_successes: AtomicU32,

    /// Time when circuit was opened (for cool-down calculations)
    opened_at: Mutex<Option<Instant>>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: String, config: CircuitBreakerConfig) -> Self {
        info!(
            component = %name,
            failure_rate_threshold = config.failure_rate_threshold,
            sliding_window_size = config.sliding_window_size,
            wait_seconds = config.wait_duration_in_open_state.as_secs(),
            permitted_half_open_calls = config.permitted_calls_in_half_open_state,
            "Circuit breaker initialized"
        );

        Self {
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            window: Mutex::new(SlidingWindow::new(config.sliding_window_size)),
            config,
            counters: CallCounters::default(),
            half_open_admitted: AtomicU32::new(0),
            half_open_successes: AtomicU32::new(0),
            opened_at: Mutex::new(None),
        }
    }

    /// Get current circuit state
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Execute an operation with circuit breaker protection
    pub async fn call<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: FailureClassification,
    {
        if !self.should_allow_call() {
            self.counters
                .not_permitted_count
                .fetch_add(1, Ordering::Relaxed);
            return Err(CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
            });
        }

        let result = operation().await;
        self.counters.total_calls.fetch_add(1, Ordering::Relaxed);

        match &result {
            Ok(_) => self.record_success(),
            Err(e) if e.counts_as_failure() => self.record_failure(),
            Err(_) => self.record_ignored_failure(),
        }

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Run `operation` unless the circuit is open; on failure or when open,
    /// return `fallback()` instead of the error.
    pub async fn execute<F, FB, T, E, Fut>(&self, operation: F, fallback: FB) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce() -> T,
        E: FailureClassification + fmt::Display,
    {
        match self.call(operation).await {
            Ok(value) => value,
            Err(CircuitBreakerError::CircuitOpen { .. }) => {
                debug!(component = %self.name, "Circuit open, using fallback");
                fallback()
            }
            Err(CircuitBreakerError::OperationFailed(e)) => {
                warn!(component = %self.name, error = %e, "Backend operation failed, using fallback");
                fallback()
            }
        }
    }

    /// Like [`execute`](Self::execute) with `None` as the fallback
    pub async fn execute_optional<F, T, E, Fut>(&self, operation: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: FailureClassification + fmt::Display,
    {
        self.execute(|| async move { operation().await.map(Some) }, || None)
            .await
    }

    /// Check if a call should be allowed based on current state
    fn should_allow_call(&self) -> bool {
        match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled_down = self
                    .opened_at
                    .lock()
                    .map_or(true, |at| at.elapsed() >= self.config.wait_duration_in_open_state);

                if cooled_down {
                    self.transition_to_half_open();
                    self.admit_trial()
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => self.admit_trial(),
        }
    }

    fn admit_trial(&self) -> bool {
        let admitted = self.half_open_admitted.fetch_add(1, Ordering::AcqRel);
        admitted < self.config.permitted_calls_in_half_open_state
    }

    fn record_success(&self) {
        self.counters.success_count.fetch_add(1, Ordering::Relaxed);

        let mut window = self.window.lock();
        match self.state() {
            CircuitState::Closed => window.record(false),
            CircuitState::HalfOpen => {
                let successes = self.half_open_successes.fetch_add(1, Ordering::AcqRel) + 1;
                if successes >= self.config.permitted_calls_in_half_open_state {
                    self.transition_to(&mut window, CircuitState::Closed);
                }
            }
            CircuitState::Open => {
                // A trial that finished after another trial reopened the circuit
                debug!(component = %self.name, "Success recorded while circuit is open");
            }
        }
    }

    fn record_failure(&self) {
        self.counters.failure_count.fetch_add(1, Ordering::Relaxed);

        let mut window = self.window.lock();
        match self.state() {
            CircuitState::Closed => {
                window.record(true);
                let rate = window.failure_rate();
                if window.filled >= self.config.minimum_number_of_calls
                    && rate >= self.config.failure_rate_threshold
                {
                    warn!(
                        component = %self.name,
                        failure_rate = rate,
                        threshold = self.config.failure_rate_threshold,
                        window_calls = window.filled,
                        "Failure rate threshold exceeded"
                    );
                    self.transition_to(&mut window, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                // Any failure in half-open state immediately reopens the circuit
                self.transition_to(&mut window, CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    fn record_ignored_failure(&self) {
        self.counters
            .ignored_failure_count
            .fetch_add(1, Ordering::Relaxed);
        debug!(component = %self.name, "Non-transient failure not counted");

        // The trial told us nothing about recovery, give its slot back
        if self.state() == CircuitState::HalfOpen {
            let _ = self
                .half_open_admitted
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                    Some(n.saturating_sub(1))
                });
        }
    }

    fn transition_to_half_open(&self) {
        let mut window = self.window.lock();
        if self.state() == CircuitState::Open {
            self.transition_to(&mut window, CircuitState::HalfOpen);
        }
    }

    /// Apply a state change. Callers hold the window lock.
    fn transition_to(&self, window: &mut SlidingWindow, to: CircuitState) {
        let from = self.state();
        if from == to {
            return;
        }

        match to {
            CircuitState::Open => {
                *self.opened_at.lock() = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                self.half_open_admitted.store(0, Ordering::Release);
                self.half_open_successes.store(0, Ordering::Release);
            }
            CircuitState::Closed => {
                window.reset();
                *self.opened_at.lock() = None;
            }
        }

        self.state.store(to as u8, Ordering::Release);

        warn!(
            component = %self.name,
            from = %from,
            to = %to,
            "Circuit breaker state changed"
        );
    }

    /// Force circuit to open state (for emergency situations)
    pub fn force_open(&self) {
        warn!(component = %self.name, "Circuit breaker forced open");
        let mut window = self.window.lock();
        self.transition_to(&mut window, CircuitState::Open);
    }

    /// Force circuit to closed state (for emergency recovery)
    pub fn force_closed(&self) {
        warn!(component = %self.name, "Circuit breaker forced closed");
        let mut window = self.window.lock();
        self.transition_to(&mut window, CircuitState::Closed);
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let window = self.window.lock();
        CircuitBreakerMetrics {
            total_calls: self.counters.total_calls.load(Ordering::Relaxed),
            success_count: self.counters.success_count.load(Ordering::Relaxed),
            failure_count: self.counters.failure_count.load(Ordering::Relaxed),
            ignored_failure_count: self.counters.ignored_failure_count.load(Ordering::Relaxed),
            not_permitted_count: self.counters.not_permitted_count.load(Ordering::Relaxed),
            window_calls: window.filled,
            window_failure_rate: window.failure_rate(),
            current_state: self.state(),
        }
    }
}
