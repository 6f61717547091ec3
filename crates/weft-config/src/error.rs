//! Configuration error types

use std::fmt;
use std::path::PathBuf;

/// Configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The file extension does not name a supported format
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// The content could not be parsed
    #[error("Failed to parse {format}: {message}")]
    Parse {
        /// Format name
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// A referenced environment variable is not set
    #[error("Environment variable '{0}' not set and no default provided")]
    MissingEnvVar(String),

    /// The configuration is not valid
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// Create a new validation error
    pub fn invalid(msg: impl fmt::Display) -> Self {
        Self::Invalid(msg.to_string())
    }

    /// Create a new parse error
    pub fn parse(format: &'static str, msg: impl fmt::Display) -> Self {
        Self::Parse {
            format,
            message: msg.to_string(),
        }
    }
}
