//! # Circuit Breaker Metrics
//!
//! Point-in-time view of a circuit breaker, suitable for logging and health
//! reporting.

use crate::resilience::CircuitState;
use serde::{Deserialize, Serialize};

/// Metrics for a single circuit breaker instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Calls that reached the protected operation
    pub total_calls: u64,

    pub success_count: u64,

    /// Failures counted against the backend
    pub failure_count: u64,

    /// Failures that were not attributed to backend health
    pub ignored_failure_count: u64,

    /// Calls short-circuited without reaching the operation
    pub not_permitted_count: u64,

    /// Outcomes currently held in the sliding window
    pub window_calls: usize,

    /// Failure rate over the sliding window (percent, 0-100)
    pub window_failure_rate: f64,

    pub current_state: CircuitState,
}

impl CircuitBreakerMetrics {
    /// Check if metrics indicate healthy operation
    pub fn is_healthy(&self) -> bool {
        match self.current_state {
            CircuitState::Closed => self.window_failure_rate < 10.0,
            CircuitState::Open => false,
            CircuitState::HalfOpen => true,
        }
    }

    /// Get human-readable state description
    pub fn state_description(&self) -> &'static str {
        match self.current_state {
            CircuitState::Closed => "Healthy - Normal operation",
            CircuitState::Open => "Failing - Rejecting all calls",
            CircuitState::HalfOpen => "Recovering - Testing backend health",
        }
    }

    /// Format metrics for logging
    pub fn format_summary(&self) -> String {
        format!(
            "State: {} | Calls: {} | Failures: {} | Window failure rate: {:.1}% | Short-circuited: {}",
            self.state_description(),
            self.total_calls,
            self.failure_count,
            self.window_failure_rate,
            self.not_permitted_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(state: CircuitState, rate: f64) -> CircuitBreakerMetrics {
        CircuitBreakerMetrics {
            total_calls: 20,
            success_count: 18,
            failure_count: 2,
            ignored_failure_count: 0,
            not_permitted_count: 0,
            window_calls: 20,
            window_failure_rate: rate,
            current_state: state,
        }
    }

    #[test]
    fn test_health_by_state() {
        assert!(metrics(CircuitState::Closed, 5.0).is_healthy());
        assert!(!metrics(CircuitState::Closed, 25.0).is_healthy());
        assert!(!metrics(CircuitState::Open, 0.0).is_healthy());
        assert!(metrics(CircuitState::HalfOpen, 0.0).is_healthy());
    }

    #[test]
    fn test_format_summary() {
        let summary = metrics(CircuitState::Closed, 10.0).format_summary();
        assert!(summary.contains("Healthy"));
        assert!(summary.contains("10.0%"));
    }
}
