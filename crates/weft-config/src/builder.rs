//! Configuration builder

use crate::error::Result;
use crate::types::{Config, FailurePolicy};
use crate::validator::validate_config;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Builder for constructing configuration programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a search root
    pub fn search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.host.search_roots.push(root.into());
        self
    }

    /// Set a host property
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.host.properties.insert(key.into(), value.into());
        self
    }

    /// Refuse to register the service with this dialect tag
    pub fn disable_service(mut self, dialect: impl Into<String>) -> Self {
        self.config.services.disabled.push(dialect.into());
        self
    }

    /// Set how many containers load at once
    pub fn max_concurrent_loads(mut self, max: usize) -> Self {
        self.config.loading.max_concurrent_loads = max;
        self
    }

    /// Set the per-plugin load timeout
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.config.loading.load_timeout = Some(timeout);
        self
    }

    /// Set the failure policy
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.loading.failure_policy = policy;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        validate_config(&self.config)?;
        Ok(self.config)
    }
}
