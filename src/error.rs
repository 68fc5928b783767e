//! Error types for flowpick
//!
//! Selection itself is infallible: an empty selector answers `None`.
//! These errors cover the boundary layers (configuration and flow parsing).

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config file {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Invalid flow: {0}")]
    InvalidFlow(String),
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
