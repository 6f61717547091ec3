//! Host lifecycle phases

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the host is in its lifecycle.
///
/// Phases only move forward, one step at a time. Loading happens in
/// `ContainersCreated` and does not advance the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostPhase {
    /// Accepting language service registrations
    Registering,

    /// Services initialized
    Initialized,

    /// Resources discovered and candidates created
    Discovered,

    /// Cross-service conflicts resolved
    Resolved,

    /// Containers created, ready to load
    ContainersCreated,
}

impl fmt::Display for HostPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostPhase::Registering => "registering",
            HostPhase::Initialized => "initialized",
            HostPhase::Discovered => "discovered",
            HostPhase::Resolved => "resolved",
            HostPhase::ContainersCreated => "containers created",
        };
        f.write_str(name)
    }
}
