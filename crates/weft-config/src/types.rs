//! Configuration types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Environment handed to language services
    #[serde(default)]
    pub host: HostConfig,

    /// Language service selection
    #[serde(default)]
    pub services: ServicesConfig,

    /// Load phase policy
    #[serde(default)]
    pub loading: LoadingConfig,
}

/// Environment handed to every language service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    /// Root search locations, searched in order
    #[serde(default)]
    pub search_roots: Vec<PathBuf>,

    /// Free-form host properties, read-only for language services
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

/// Language service selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServicesConfig {
    /// Dialects the host refuses to register
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl ServicesConfig {
    /// Whether a dialect is enabled
    pub fn is_enabled(&self, dialect: &str) -> bool {
        !self.disabled.iter().any(|name| name == dialect)
    }
}

/// What the host does after a plugin fails to load
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep loading the remaining containers
    #[default]
    Continue,

    /// Stop at the first failure, leaving the rest unloaded
    Abort,
}

/// Load phase policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadingConfig {
    /// Containers loaded at the same time
    #[serde(default = "default_max_concurrent_loads")]
    pub max_concurrent_loads: usize,

    /// Give up on a single load after this long
    #[serde(default, with = "humantime_serde")]
    pub load_timeout: Option<Duration>,

    /// Behaviour after a failed load
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_max_concurrent_loads() -> usize {
    4
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            max_concurrent_loads: default_max_concurrent_loads(),
            load_timeout: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}
