//! Error taxonomy of the plugin lifecycle

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::container::ContainerState;

/// Boxed error returned by plugin factories
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// A language service could not be initialized.
///
/// Fatal to that service for the current run; other services proceed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Language service '{service}' failed to initialize: {message}")]
pub struct ServiceInitializationError {
    /// Dialect name of the failing service
    pub service: String,

    /// Failure description
    pub message: String,
}

impl ServiceInitializationError {
    /// Create a new initialization error
    pub fn new(service: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            service: service.into(),
            message: message.to_string(),
        }
    }
}

/// A language service could not read any of its search roots.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Discovery failed for language service '{service}': {message}")]
pub struct DiscoveryError {
    /// Dialect name of the failing service
    pub service: String,

    /// Failure description
    pub message: String,
}

impl DiscoveryError {
    /// Create a new discovery error
    pub fn new(service: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            service: service.into(),
            message: message.to_string(),
        }
    }
}

/// A single candidate was dropped. Reported, never fatal to the pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Candidate '{candidate}' from '{service}' rejected: {reason}")]
pub struct CandidateRejected {
    /// Dialect name of the service that produced the candidate
    pub service: String,

    /// Candidate identity
    pub candidate: String,

    /// Why the candidate was dropped
    pub reason: String,
}

impl CandidateRejected {
    /// Create a new rejection
    pub fn new(
        service: impl Into<String>,
        candidate: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        Self {
            service: service.into(),
            candidate: candidate.into(),
            reason: reason.to_string(),
        }
    }
}

/// A loader could not resolve an entry point inside its isolation boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Entry point '{entry_point}' could not be resolved: {reason}")]
pub struct ResolutionError {
    /// Requested entry point name
    pub entry_point: String,

    /// Why resolution failed
    pub reason: String,
}

impl ResolutionError {
    /// Create a new resolution error
    pub fn new(entry_point: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            entry_point: entry_point.into(),
            reason: reason.to_string(),
        }
    }

    /// The entry point is not known to the loader
    pub fn not_found(entry_point: impl Into<String>) -> Self {
        Self::new(entry_point, "not found")
    }
}

/// A plugin could not be instantiated.
///
/// Cloneable so the failed container keeps the cause after the error has
/// been handed back to the host.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvalidPluginError {
    /// The entry point could not be resolved through the loader
    #[error("Plugin '{plugin}' has no resolvable entry point")]
    MissingEntryPoint {
        /// Plugin identity
        plugin: String,

        /// Loader failure
        #[source]
        source: ResolutionError,
    },

    /// The declared entry point is not usable
    #[error("Plugin '{plugin}' declares a malformed entry point: {message}")]
    MalformedEntryPoint {
        /// Plugin identity
        plugin: String,

        /// What is wrong with it
        message: String,
    },

    /// The entry point failed while constructing the instance
    #[error("Plugin '{plugin}' failed during construction")]
    ConstructionFailed {
        /// Plugin identity
        plugin: String,

        /// Error raised by the plugin
        #[source]
        source: Arc<dyn StdError + Send + Sync>,
    },

    /// The container already left the `Created` state
    #[error("Container for plugin '{plugin}' is already {state}")]
    InvalidState {
        /// Plugin identity
        plugin: String,

        /// State the container is in
        state: ContainerState,
    },

    /// The language service reported success without attaching an instance
    #[error("Language service '{service}' did not attach an instance for plugin '{plugin}'")]
    NotAttached {
        /// Plugin identity
        plugin: String,

        /// Dialect of the misbehaving service
        service: String,
    },

    /// The host gave up waiting for the load to finish
    #[error("Loading plugin '{plugin}' timed out after {after:?}")]
    TimedOut {
        /// Plugin identity
        plugin: String,

        /// Configured timeout
        after: Duration,
    },
}

impl InvalidPluginError {
    /// Create a missing entry point error
    pub fn missing_entry_point(plugin: impl Into<String>, source: ResolutionError) -> Self {
        Self::MissingEntryPoint {
            plugin: plugin.into(),
            source,
        }
    }

    /// Create a malformed entry point error
    pub fn malformed(plugin: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::MalformedEntryPoint {
            plugin: plugin.into(),
            message: message.to_string(),
        }
    }

    /// Create a construction failure from the plugin's own error
    pub fn construction(plugin: impl Into<String>, source: BoxError) -> Self {
        Self::ConstructionFailed {
            plugin: plugin.into(),
            source: Arc::from(source),
        }
    }

    /// Identity of the plugin this error refers to
    pub fn plugin(&self) -> &str {
        match self {
            Self::MissingEntryPoint { plugin, .. }
            | Self::MalformedEntryPoint { plugin, .. }
            | Self::ConstructionFailed { plugin, .. }
            | Self::InvalidState { plugin, .. }
            | Self::NotAttached { plugin, .. }
            | Self::TimedOut { plugin, .. } => plugin,
        }
    }
}

/// Render an error and its full `source()` chain on one line.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        current = cause.source();
    }
    rendered
}
