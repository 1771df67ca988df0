//! # Error Types
//!
//! Crate-level error taxonomy. Backend failures are classified so the circuit
//! breaker only counts the ones that say something about backend health.

use crate::backend::BackendError;
use crate::config::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GovernorError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Policy error: {0}")]
    Policy(String),
    #[error("Snapshot error: {0}")]
    Snapshot(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GovernorError {
    /// Whether the error originated from an unreachable or struggling backend
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, GovernorError::Backend(e) if e.is_transient())
    }
}

pub type GovernorResult<T> = std::result::Result<T, GovernorError>;
