//! Plugin host error types

use crate::host::LoadSummary;
use crate::phase::HostPhase;
use std::fmt;
use weft_spi::{ContainerState, InvalidPluginError};

/// Plugin host error type
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A lifecycle operation was called out of order
    #[error("Cannot {operation} while the host is {actual} (expected {expected})")]
    PhaseOrder {
        /// Operation that was attempted
        operation: &'static str,
        /// Phase the operation requires
        expected: HostPhase,
        /// Phase the host is in
        actual: HostPhase,
    },

    /// A language service for this dialect is already registered
    #[error("Language service already registered for dialect '{0}'")]
    ServiceAlreadyRegistered(String),

    /// No container exists for this plugin identity
    #[error("No container for plugin '{0}'")]
    UnknownContainer(String),

    /// The container already left the `Created` state
    #[error("Container for plugin '{plugin}' is {state} and cannot be loaded")]
    ContainerNotLoadable {
        /// Plugin identity
        plugin: String,
        /// State the container is in
        state: ContainerState,
    },

    /// A single load failed
    #[error(transparent)]
    LoadFailed(#[from] InvalidPluginError),

    /// The abort policy stopped the load phase
    #[error("Loading stopped after plugin '{plugin}' failed")]
    RunAborted {
        /// Plugin whose failure stopped the run
        plugin: String,
        /// Why it failed
        #[source]
        source: InvalidPluginError,
        /// Loads finished before the run stopped
        summary: LoadSummary,
    },
}

/// Result type for plugin host operations
pub type Result<T> = std::result::Result<T, HostError>;

impl HostError {
    /// Create a new phase order error
    pub fn phase_order(operation: &'static str, expected: HostPhase, actual: HostPhase) -> Self {
        Self::PhaseOrder {
            operation,
            expected,
            actual,
        }
    }

    /// Create a new duplicate service error
    pub fn already_registered(dialect: impl fmt::Display) -> Self {
        Self::ServiceAlreadyRegistered(dialect.to_string())
    }

    /// Create a new unknown container error
    pub fn unknown_container(plugin: impl fmt::Display) -> Self {
        Self::UnknownContainer(plugin.to_string())
    }
}
