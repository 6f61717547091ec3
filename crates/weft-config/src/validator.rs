//! Configuration validation

use crate::error::{ConfigError, Result};
use crate::Config;
use std::collections::HashSet;
use std::time::Duration;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_host(config)?;
    validate_services(config)?;
    validate_loading(config)?;
    Ok(())
}

fn validate_host(config: &Config) -> Result<()> {
    if config.host.search_roots.is_empty() {
        tracing::warn!("No search roots configured, discovery will find nothing");
    }

    let mut seen = HashSet::new();
    for root in &config.host.search_roots {
        if root.as_os_str().is_empty() {
            return Err(ConfigError::invalid("search root cannot be empty"));
        }
        if !seen.insert(root) {
            tracing::warn!(root = %root.display(), "Search root listed more than once");
        }
    }

    if config.host.properties.keys().any(|key| key.is_empty()) {
        return Err(ConfigError::invalid("property name cannot be empty"));
    }

    Ok(())
}

fn validate_services(config: &Config) -> Result<()> {
    if config.services.disabled.iter().any(|name| name.trim().is_empty()) {
        return Err(ConfigError::invalid("disabled service name cannot be empty"));
    }
    Ok(())
}

fn validate_loading(config: &Config) -> Result<()> {
    if config.loading.max_concurrent_loads == 0 {
        return Err(ConfigError::invalid("max_concurrent_loads must be > 0"));
    }

    if let Some(timeout) = config.loading.load_timeout {
        if timeout.is_zero() {
            return Err(ConfigError::invalid("load_timeout must be > 0"));
        }
        if timeout > Duration::from_secs(600) {
            tracing::warn!("load_timeout is very high (>10 minutes)");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn minimal_config() -> Config {
        let mut config = Config::default();
        config.host.search_roots.push(PathBuf::from("/plugins"));
        config
    }

    #[test]
    fn test_valid_minimal_config() {
        assert!(validate_config(&minimal_config()).is_ok());
    }

    #[test]
    fn test_no_roots_is_allowed() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_root() {
        let mut config = minimal_config();
        config.host.search_roots.push(PathBuf::new());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_concurrency() {
        let mut config = minimal_config();
        config.loading.max_concurrent_loads = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = minimal_config();
        config.loading.load_timeout = Some(Duration::ZERO);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_blank_disabled_service() {
        let mut config = minimal_config();
        config.services.disabled.push("  ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_property_name() {
        let mut config = minimal_config();
        config.host.properties.insert(String::new(), true.into());
        assert!(validate_config(&config).is_err());
    }
}
