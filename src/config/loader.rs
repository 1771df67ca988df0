//! Configuration Loader
//!
//! Environment-aware configuration loading built on the `config` crate.
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. `<dir>/cache-governor.{toml,yaml,json}` (optional)
//! 2. `<dir>/cache-governor.<environment>.{toml,yaml,json}` (optional)
//! 3. `CACHE_GOVERNOR__<SECTION>__<FIELD>` environment variables

use super::error::ConfigResult;
use super::GovernorConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_BASENAME: &str = "cache-governor";
const ENV_PREFIX: &str = "CACHE_GOVERNOR";
const ENV_SEPARATOR: &str = "__";

/// Loaded, validated configuration together with where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: GovernorConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);
        let overrides = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true);

        let config = Self::load_layered(&config_directory, environment, overrides)?;

        info!(
            environment = %environment,
            config_directory = %config_directory.display(),
            backend = ?config.backend.kind,
            stability_threshold = config.adaptive_strategy.stability_threshold,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Create a ConfigManager from an existing configuration
    pub fn from_config(config: GovernorConfig, environment: String) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            environment,
            config_directory: Self::default_config_directory(),
        })
    }

    fn load_layered(
        config_directory: &Path,
        environment: &str,
        overrides: Environment,
    ) -> ConfigResult<GovernorConfig> {
        let base = config_directory.join(CONFIG_BASENAME);
        let overlay = config_directory.join(format!("{CONFIG_BASENAME}.{environment}"));

        debug!(
            base = %base.display(),
            overlay = %overlay.display(),
            "Resolving configuration sources"
        );

        let merged = Config::builder()
            .add_source(File::with_name(&base.to_string_lossy()).required(false))
            .add_source(File::with_name(&overlay.to_string_lossy()).required(false))
            .add_source(overrides)
            .build()?;

        let config: GovernorConfig = merged.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Serialized configuration for diagnostics, with the backend URL masked
    pub fn debug_config(&self) -> serde_json::Value {
        let mut value = serde_json::json!(self.config);
        if let Some(url) = value
            .get_mut("backend")
            .and_then(|backend| backend.get_mut("redis_url"))
        {
            if !url.is_null() {
                *url = serde_json::Value::String("[MASKED]".to_string());
            }
        }
        value
    }

    /// Detect current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("CACHE_GOVERNOR_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        env::var("CACHE_GOVERNOR_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }
}

impl From<ConfigManager> for GovernorConfig {
    fn from(manager: ConfigManager) -> Self {
        manager.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendKind, ConfigurationError};
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn no_env_overrides() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(Some(HashMap::new()))
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigManager::load_layered(dir.path(), "test", no_env_overrides()).unwrap();
        assert_eq!(config, GovernorConfig::default());
    }

    #[test]
    fn test_environment_overlay_overrides_base() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("cache-governor.toml"),
            r#"
[adaptive_strategy]
stability_threshold = 4
interval_ms = 300000

[policies]
protected_key_prefix = "pinned:"
"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("cache-governor.production.toml"),
            r#"
[adaptive_strategy]
stability_threshold = 6
"#,
        )
        .unwrap();

        let config =
            ConfigManager::load_layered(dir.path(), "production", no_env_overrides()).unwrap();
        assert_eq!(config.adaptive_strategy.stability_threshold, 6);
        assert_eq!(config.adaptive_strategy.interval_ms, 300_000);
        assert_eq!(config.policies.protected_key_prefix, "pinned:");
    }

    #[test]
    fn test_environment_variables_override_files() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("cache-governor.toml"),
            "[circuit_breaker]\nsliding_window_size = 20\nminimum_number_of_calls = 5\n",
        )
        .unwrap();

        let vars = HashMap::from([
            (
                "CACHE_GOVERNOR__CIRCUIT_BREAKER__SLIDING_WINDOW_SIZE".to_string(),
                "40".to_string(),
            ),
            (
                "CACHE_GOVERNOR__BACKEND__KIND".to_string(),
                "memory".to_string(),
            ),
        ]);
        let overrides = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(Some(vars));

        let config = ConfigManager::load_layered(dir.path(), "test", overrides).unwrap();
        assert_eq!(config.circuit_breaker.sliding_window_size, 40);
        assert_eq!(config.circuit_breaker.minimum_number_of_calls, 5);
        assert_eq!(config.backend.kind, BackendKind::Memory);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("cache-governor.toml"),
            "[policies]\nshrink_reduction_fraction = 0.0\n",
        )
        .unwrap();

        let result = ConfigManager::load_layered(dir.path(), "test", no_env_overrides());
        assert!(matches!(
            result,
            Err(ConfigurationError::InvalidValue { ref field, .. })
                if field == "policies.shrink_reduction_fraction"
        ));
    }

    #[test]
    fn test_debug_config_masks_redis_url() {
        let mut config = GovernorConfig::default();
        config.backend.kind = BackendKind::Redis;
        config.backend.redis_url = Some("redis://:secret@cache:6379".to_string());
        let manager = ConfigManager::from_config(config, "test".to_string()).unwrap();

        let value = manager.debug_config();
        assert_eq!(value["backend"]["redis_url"], "[MASKED]");
    }
}
