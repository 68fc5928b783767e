//! Configuration management for flowpick
//!
//! Parses TOML configuration files and provides typed access to settings.

use crate::backend::Backend;
use crate::error::{AppError, AppResult};
use crate::flow::{DEFAULT_SEED, SeededFlowHasher};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Upper bound on the sum of positive weights
///
/// The selector allocates one slot per unit of weight, so this caps the
/// memory a single configuration can make it allocate.
pub const MAX_TOTAL_WEIGHT: u64 = 1 << 20;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Ordered backend list; order determines block order in the sequence
    #[serde(default)]
    pub backends: Vec<Backend>,
    #[serde(default)]
    pub hashing: HashingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Flow hashing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HashingConfig {
    /// Seed for [`SeededFlowHasher`]; changing it remaps flows
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
        }
    }
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads, parses, then validates. Each phase has its own error variant so
    /// the caller can tell a missing file from a typo from a bad value.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        tracing::debug!(
            backends = config.backends.len(),
            total_weight = config.total_weight(),
            "Loaded configuration"
        );

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Zero and negative weights are accepted: they disable a backend
    /// without removing it. Duplicate names are accepted too.
    pub fn validate(&self) -> AppResult<()> {
        let mut total: u64 = 0;

        for (position, backend) in self.backends.iter().enumerate() {
            if backend.name().trim().is_empty() {
                return Err(AppError::Config(format!(
                    "Backend at position {} has an empty name. \
                    Every backend needs a non-empty name.",
                    position
                )));
            }

            if backend.is_enabled() {
                total = total.saturating_add(backend.weight().unsigned_abs());
            }
        }

        if total > MAX_TOTAL_WEIGHT {
            return Err(AppError::Config(format!(
                "Sum of positive backend weights is {}, which exceeds the maximum of {}. \
                Scale the weights down while keeping their ratios.",
                total, MAX_TOTAL_WEIGHT
            )));
        }

        let level = self.observability.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(AppError::Config(format!(
                "Invalid log_level '{}'. Expected one of: {}",
                self.observability.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Backends as shared references, in configured order
    pub fn backends(&self) -> Vec<Arc<Backend>> {
        self.backends.iter().cloned().map(Arc::new).collect()
    }

    /// Sum of positive weights
    pub fn total_weight(&self) -> u64 {
        self.backends
            .iter()
            .filter(|b| b.is_enabled())
            .map(|b| b.weight().unsigned_abs())
            .fold(0u64, u64::saturating_add)
    }

    /// Flow hasher seeded from `[hashing]`
    pub fn flow_hasher(&self) -> SeededFlowHasher {
        SeededFlowHasher::new(self.hashing.seed)
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CONFIG: &str = r#"
[[backends]]
name = "backend1"
weight = 1

[[backends]]
name = "backend2"
weight = 2

[[backends]]
name = "backend3"
weight = 3

[hashing]
seed = 42

[observability]
log_level = "debug"
"#;

    #[test]
    fn test_config_from_str_parses_successfully() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert_eq!(config.backends.len(), 3);
        assert_eq!(config.backends[0].name(), "backend1");
        assert_eq!(config.backends[2].weight(), 3);
        assert_eq!(config.hashing.seed, 42);
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_config_preserves_backend_order() {
        let config = Config::from_str(TEST_CONFIG).unwrap();
        let names: Vec<_> = config.backends().iter().map(|b| b.name().to_string()).collect();
        assert_eq!(names, vec!["backend1", "backend2", "backend3"]);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_str("").expect("empty config is valid");
        assert!(config.backends.is_empty());
        assert_eq!(config.hashing.seed, DEFAULT_SEED);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.total_weight(), 0);
    }

    #[test]
    fn test_config_weight_defaults_to_one() {
        let config = Config::from_str(
            r#"
[[backends]]
name = "only"
"#,
        )
        .unwrap();
        assert_eq!(config.backends[0].weight(), 1);
    }

    #[test]
    fn test_config_accepts_zero_and_negative_weights() {
        let config = Config::from_str(
            r#"
[[backends]]
name = "drained"
weight = 0

[[backends]]
name = "disabled"
weight = -5

[[backends]]
name = "live"
weight = 4
"#,
        )
        .expect("non-positive weights disable, they do not fail validation");
        assert_eq!(config.total_weight(), 4);
    }

    #[test]
    fn test_config_validation_empty_name_fails() {
        let result = Config::from_str(
            r#"
[[backends]]
name = "   "
weight = 1
"#,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("empty name"), "got: {}", err);
    }

    #[test]
    fn test_config_validation_excessive_total_weight_fails() {
        let config = Config {
            backends: vec![
                Backend::new("a", MAX_TOTAL_WEIGHT as i64),
                Backend::new("b", 1),
            ],
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds the maximum"), "got: {}", err);
    }

    #[test]
    fn test_config_validation_total_weight_at_limit_succeeds() {
        let config = Config {
            backends: vec![Backend::new("a", MAX_TOTAL_WEIGHT as i64), Backend::new("b", -7)],
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_saturates_huge_weights() {
        let config = Config {
            backends: vec![Backend::new("a", i64::MAX), Backend::new("b", i64::MAX)],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_log_level_fails() {
        let result = Config::from_str(
            r#"
[observability]
log_level = "loud"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_config_parse_error_is_typed() {
        let err = Config::from_str("[[backends]]\nweight = 1\n").unwrap_err();
        assert!(matches!(err, AppError::ConfigParseFailed { .. }));
    }

    #[test]
    fn test_flow_hasher_uses_configured_seed() {
        let config = Config::from_str(TEST_CONFIG).unwrap();
        assert_eq!(config.flow_hasher().seed(), 42);
    }
}
