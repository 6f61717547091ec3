//! Configuration file merging
//!
//! Later files override earlier files, allowing layered configuration:
//! - a system-wide file with the shared plugin roots
//! - a per-user file adding roots and overriding properties

use crate::error::{ConfigError, Result};
use crate::types::{Config, HostConfig, LoadingConfig, ServicesConfig};

/// Merge multiple configurations together
///
/// Later configs override earlier configs. Search roots are concatenated
/// without duplicates, keeping the first occurrence.
pub fn merge_configs(configs: Vec<Config>) -> Result<Config> {
    let mut configs = configs.into_iter();
    let first = configs
        .next()
        .ok_or_else(|| ConfigError::invalid("No configurations to merge"))?;

    Ok(configs.fold(first, merge_two_configs))
}

fn merge_two_configs(base: Config, overlay: Config) -> Config {
    Config {
        host: merge_host(base.host, overlay.host),
        services: merge_services(base.services, overlay.services),
        loading: merge_loading(base.loading, overlay.loading),
    }
}

fn merge_host(mut base: HostConfig, overlay: HostConfig) -> HostConfig {
    for root in overlay.search_roots {
        if !base.search_roots.contains(&root) {
            base.search_roots.push(root);
        }
    }
    base.properties.extend(overlay.properties);
    base
}

fn merge_services(mut base: ServicesConfig, overlay: ServicesConfig) -> ServicesConfig {
    for name in overlay.disabled {
        if !base.disabled.contains(&name) {
            base.disabled.push(name);
        }
    }
    base
}

/// Only values that differ from the defaults override the base
fn merge_loading(base: LoadingConfig, overlay: LoadingConfig) -> LoadingConfig {
    let defaults = LoadingConfig::default();
    LoadingConfig {
        max_concurrent_loads: if overlay.max_concurrent_loads != defaults.max_concurrent_loads {
            overlay.max_concurrent_loads
        } else {
            base.max_concurrent_loads
        },
        load_timeout: overlay.load_timeout.or(base.load_timeout),
        failure_policy: if overlay.failure_policy != defaults.failure_policy {
            overlay.failure_policy
        } else {
            base.failure_policy
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailurePolicy;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config_with_roots(roots: &[&str]) -> Config {
        Config {
            host: HostConfig {
                search_roots: roots.iter().map(PathBuf::from).collect(),
                ..HostConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_merge_requires_input() {
        assert!(merge_configs(Vec::new()).is_err());
    }

    #[test]
    fn test_single_config_unchanged() {
        let config = config_with_roots(&["/a"]);
        assert_eq!(merge_configs(vec![config.clone()]).unwrap(), config);
    }

    #[test]
    fn test_roots_concatenate_without_duplicates() {
        let merged = merge_configs(vec![
            config_with_roots(&["/a", "/b"]),
            config_with_roots(&["/b", "/c"]),
        ])
        .unwrap();

        assert_eq!(
            merged.host.search_roots,
            vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")]
        );
    }

    #[test]
    fn test_properties_overlay_wins() {
        let mut base = Config::default();
        base.host.properties.insert("platform".into(), "linux".into());
        base.host.properties.insert("api_level".into(), 6.into());
        let mut overlay = Config::default();
        overlay.host.properties.insert("api_level".into(), 7.into());

        let merged = merge_configs(vec![base, overlay]).unwrap();
        assert_eq!(merged.host.properties["platform"], "linux");
        assert_eq!(merged.host.properties["api_level"], 7);
    }

    #[test]
    fn test_loading_defaults_do_not_override() {
        let mut base = Config::default();
        base.loading.max_concurrent_loads = 1;
        base.loading.failure_policy = FailurePolicy::Abort;
        base.loading.load_timeout = Some(Duration::from_secs(5));
        base.services.disabled.push("legacy".into());

        let mut overlay = Config::default();
        overlay.services.disabled.push("legacy".into());
        overlay.services.disabled.push("scripted".into());

        let merged = merge_configs(vec![base, overlay]).unwrap();
        assert_eq!(merged.loading.max_concurrent_loads, 1);
        assert_eq!(merged.loading.failure_policy, FailurePolicy::Abort);
        assert_eq!(merged.loading.load_timeout, Some(Duration::from_secs(5)));
        assert_eq!(merged.services.disabled, vec!["legacy", "scripted"]);
    }
}
