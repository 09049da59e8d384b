//! Configuration Loader
//!
//! Layers built-in defaults, an optional configuration file and `BOOKING__*`
//! environment variables using the `config` crate.

use super::BookingConfig;
use crate::error::{BookingError, BookingResult};
use config::{Config, Environment, File};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "BOOKING_CONFIG_PATH";

/// Prefix for environment overrides, e.g. `BOOKING__SCAN__COMPLETION_LENGTH`
pub const ENV_PREFIX: &str = "BOOKING";

const DEFAULT_CONFIG_FILE: &str = "config/booking-config.yaml";

/// Loaded, validated configuration
#[derive(Debug)]
pub struct ConfigManager {
    config: BookingConfig,
    source_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with file discovery and environment overrides
    pub fn load() -> BookingResult<Arc<ConfigManager>> {
        let path = Self::discover_config_file();
        Self::load_from_sources(path.as_deref(), Some(ENV_PREFIX))
    }

    /// Load from an explicit file (if any) and environment prefix (if any).
    ///
    /// Precedence, highest first: environment, file, defaults.
    pub fn load_from_sources(
        path: Option<&Path>,
        env_prefix: Option<&str>,
    ) -> BookingResult<Arc<ConfigManager>> {
        let defaults = Config::try_from(&BookingConfig::default())
            .map_err(|e| BookingError::Configuration(format!("Invalid defaults: {e}")))?;

        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading booking configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }

        if let Some(prefix) = env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config: BookingConfig = builder
            .build()
            .map_err(|e| BookingError::Configuration(format!("Failed to build configuration: {e}")))?
            .try_deserialize()
            .map_err(|e| {
                BookingError::Configuration(format!("Failed to deserialize configuration: {e}"))
            })?;

        config.validate()?;

        let manager = ConfigManager {
            config,
            source_file: path.map(Path::to_path_buf),
        };

        info!(
            source_file = ?manager.source_file,
            dms_base_url = %manager.config.endpoints.dms_base_url,
            request_timeout_ms = manager.config.endpoints.request_timeout_ms,
            "Booking configuration loaded"
        );
        debug!(config = %manager.debug_config(), "Effective booking configuration");

        Ok(Arc::new(manager))
    }

    /// Wrap an already-built configuration, validating it
    pub fn from_config(config: BookingConfig) -> BookingResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            source_file: None,
        }))
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Configuration as JSON with credentials masked, for logging
    pub fn debug_config(&self) -> Value {
        let mut value = serde_json::to_value(&self.config).unwrap_or(Value::Null);

        if let Some(password) = value.pointer_mut("/allocation/pool_password") {
            if password.as_str().is_some_and(|p| !p.is_empty()) {
                *password = Value::String("***".to_string());
            }
        }
        if let Some(token) = value.pointer_mut("/endpoints/bearer_token") {
            if !token.is_null() {
                *token = Value::String("***".to_string());
            }
        }

        value
    }

    fn discover_config_file() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }

        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_only() {
        let manager = ConfigManager::load_from_sources(None, None).unwrap();
        assert_eq!(manager.config().scan.completion_length, 13);
        assert!(manager.source_file().is_none());
    }

    #[test]
    fn test_yaml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "allocation:\n  pool_password: secret\nscan:\n  completion_length: 12\nendpoints:\n  request_timeout_ms: 5000"
        )
        .unwrap();

        let manager = ConfigManager::load_from_sources(Some(file.path()), None).unwrap();
        let config = manager.config();
        assert_eq!(config.scan.completion_length, 12);
        assert_eq!(config.endpoints.request_timeout_ms, 5000);
        assert_eq!(config.allocation.pool_password, "secret");
        assert_eq!(config.allocation.pool_user_id, "BTD001");
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "notifications:\n  success_dismiss_ms: 1000").unwrap();

        std::env::set_var("BOOKINGLOADERTEST__NOTIFICATIONS__SUCCESS_DISMISS_MS", "2500");
        let manager =
            ConfigManager::load_from_sources(Some(file.path()), Some("BOOKINGLOADERTEST")).unwrap();
        std::env::remove_var("BOOKINGLOADERTEST__NOTIFICATIONS__SUCCESS_DISMISS_MS");

        assert_eq!(manager.config().notifications.success_dismiss_ms, 2500);
    }

    #[test]
    fn test_invalid_file_values_fail_validation() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "scan:\n  completion_length: 0").unwrap();

        let result = ConfigManager::load_from_sources(Some(file.path()), None);
        assert!(matches!(result, Err(BookingError::Configuration(_))));
    }

    #[test]
    fn test_debug_config_masks_credentials() {
        let mut config = BookingConfig::default();
        config.allocation.pool_password = "hunter2".to_string();
        config.endpoints.bearer_token = Some("token-abc".to_string());

        let manager = ConfigManager::from_config(config).unwrap();
        let rendered = manager.debug_config().to_string();
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("token-abc"));
    }
}
