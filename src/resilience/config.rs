//! # Circuit Breaker Configuration
//!
//! Runtime configuration for the failure-rate circuit breaker. The
//! deserializable, file-facing form lives in
//! [`crate::config::CircuitBreakerSettings`] and converts into this struct.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Failure rate (percent, 0-100) over the sliding window that opens the circuit
    pub failure_rate_threshold: f64,

    /// Number of most recent call outcomes considered
    pub sliding_window_size: usize,

    /// Outcomes required in the window before the failure rate is evaluated
    pub minimum_number_of_calls: usize,

    /// Time to wait in open state before attempting recovery
    pub wait_duration_in_open_state: Duration,

    /// Trial calls admitted in half-open state; all must succeed to close
    pub permitted_calls_in_half_open_state: u32,
}

impl CircuitBreakerConfig {
    /// Configuration tuned for a shared remote cache
    pub fn for_cache() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if !(self.failure_rate_threshold > 0.0 && self.failure_rate_threshold <= 100.0) {
            return Err("failure_rate_threshold must be within (0, 100]".to_string());
        }

        if self.sliding_window_size == 0 {
            return Err("sliding_window_size must be greater than 0".to_string());
        }

        if self.minimum_number_of_calls == 0 {
            return Err("minimum_number_of_calls must be greater than 0".to_string());
        }

        if self.minimum_number_of_calls > self.sliding_window_size {
            return Err("minimum_number_of_calls must not exceed sliding_window_size".to_string());
        }

        if self.wait_duration_in_open_state.is_zero() {
            return Err("wait_duration_in_open_state must be greater than 0".to_string());
        }

        if self.permitted_calls_in_half_open_state == 0 {
            return Err("permitted_calls_in_half_open_state must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 50.0,
            sliding_window_size: 100,
            minimum_number_of_calls: 100,
            wait_duration_in_open_state: Duration::from_secs(30),
            permitted_calls_in_half_open_state: 10,
        }
    }
}
