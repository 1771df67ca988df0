//! # Cache Governor
//!
//! Holds the active [`CachePolicy`] and applies it to the backend. This is
//! the only place policy changes take effect: nothing else mutates the
//! backend except through a policy's `apply`.

use crate::backend::CacheBackend;
use crate::error::GovernorResult;
use crate::monitor::AccessCounts;
use crate::policy::{CachePolicy, PolicyOutcome, StrategyName};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug)]
pub struct CacheGovernor {
    backend: Arc<dyn CacheBackend>,
    access: AccessCounts,
    active: RwLock<Option<CachePolicy>>,
    /// Serializes policy changes and applications
    apply_lock: Mutex<()>,
}

impl CacheGovernor {
    pub fn new(backend: Arc<dyn CacheBackend>, access: AccessCounts) -> Self {
        Self {
            backend,
            access,
            active: RwLock::new(None),
            apply_lock: Mutex::new(()),
        }
    }

    /// Make `policy` the active policy and apply it immediately
    pub async fn set_policy(&self, policy: CachePolicy) -> GovernorResult<PolicyOutcome> {
        let _guard = self.apply_lock.lock().await;

        let previous = self
            .active
            .write()
            .replace(policy.clone())
            .map(|p| p.name());
        info!(
            from = ?previous,
            to = %policy.name(),
            expiration_seconds = policy.expiration_time().as_secs(),
            "Active cache policy changed"
        );

        policy.apply(self.backend.as_ref(), &self.access).await
    }

    /// Re-apply the active policy; no-op when none is set
    pub async fn apply_policy(&self) -> GovernorResult<PolicyOutcome> {
        let _guard = self.apply_lock.lock().await;

        let Some(policy) = self.active.read().clone() else {
            debug!("No active cache policy, nothing to apply");
            return Ok(PolicyOutcome::default());
        };

        policy.apply(self.backend.as_ref(), &self.access).await
    }

    pub fn active_strategy(&self) -> Option<StrategyName> {
        self.active.read().as_ref().map(CachePolicy::name)
    }

    /// Nominal expiration of the active policy
    pub fn active_expiration(&self) -> Option<Duration> {
        self.active.read().as_ref().map(CachePolicy::expiration_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::monitor::{InMemoryMeterRegistry, KeyTagMapper};
    use crate::policy::PolicyRegistry;

    fn governor(backend: Arc<InMemoryBackend>) -> CacheGovernor {
        let access = AccessCounts::new(
            Arc::new(InMemoryMeterRegistry::new()),
            Arc::new(KeyTagMapper::default()),
        );
        CacheGovernor::new(backend, access)
    }

    #[tokio::test]
    async fn test_apply_without_policy_is_noop() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.insert_persistent("a", "1");
        let governor = governor(backend.clone());

        let outcome = governor.apply_policy().await.unwrap();
        assert_eq!(outcome, PolicyOutcome::default());
        assert_eq!(governor.active_strategy(), None);
        assert_eq!(governor.active_expiration(), None);
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_set_policy_stores_then_applies() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.insert_persistent("a", "1");
        let governor = governor(backend.clone());
        let registry = PolicyRegistry::default();

        let outcome = governor
            .set_policy(registry.lookup(StrategyName::Grow))
            .await
            .unwrap();
        assert_eq!(outcome.ttl_adjusted, 1);
        assert_eq!(outcome.keys_preloaded, 3);
        assert_eq!(governor.active_strategy(), Some(StrategyName::Grow));
        assert_eq!(
            governor.active_expiration(),
            Some(Duration::from_secs(7200))
        );

        // Re-applying the active policy finds the preloaded keys already present
        let outcome = governor.apply_policy().await.unwrap();
        assert_eq!(outcome.ttl_adjusted, 4);
        assert_eq!(outcome.keys_preloaded, 0);
    }
}
