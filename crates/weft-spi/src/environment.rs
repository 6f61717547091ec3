//! Immutable execution context handed to every lifecycle phase

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::report::{Reporter, TracingReporter};

/// Execution context for one host run.
///
/// Created once by the host and shared read-only with every language
/// service. Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvironmentInner>,
}

struct EnvironmentInner {
    search_roots: Vec<PathBuf>,
    config: BTreeMap<String, Value>,
    reporter: Arc<dyn Reporter>,
}

impl Environment {
    /// Start building an environment
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder::default()
    }

    /// Root search locations, in the order the host supplied them
    pub fn search_roots(&self) -> &[PathBuf] {
        &self.inner.search_roots
    }

    /// Host configuration
    pub fn config(&self) -> &BTreeMap<String, Value> {
        &self.inner.config
    }

    /// Look up one configuration value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.config.get(key)
    }

    /// Look up one configuration value as a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Reporting channel
    pub fn reporter(&self) -> &dyn Reporter {
        self.inner.reporter.as_ref()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("search_roots", &self.inner.search_roots)
            .field("config", &self.inner.config)
            .field("reporter", &self.inner.reporter)
            .finish()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`Environment`]
#[derive(Debug, Default)]
pub struct EnvironmentBuilder {
    search_roots: Vec<PathBuf>,
    config: BTreeMap<String, Value>,
    reporter: Option<Arc<dyn Reporter>>,
}

impl EnvironmentBuilder {
    /// Append a search root
    pub fn search_root(mut self, root: impl AsRef<Path>) -> Self {
        self.search_roots.push(root.as_ref().to_path_buf());
        self
    }

    /// Append several search roots
    pub fn search_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.search_roots
            .extend(roots.into_iter().map(|root| root.as_ref().to_path_buf()));
        self
    }

    /// Set a configuration value
    pub fn config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Merge a whole configuration map, later keys win
    pub fn config_map(mut self, config: BTreeMap<String, Value>) -> Self {
        self.config.extend(config);
        self
    }

    /// Set the reporting sink (defaults to [`TracingReporter`])
    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Build the environment
    pub fn build(self) -> Environment {
        Environment {
            inner: Arc::new(EnvironmentInner {
                search_roots: self.search_roots,
                config: self.config,
                reporter: self
                    .reporter
                    .unwrap_or_else(|| Arc::new(TracingReporter)),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_root_order() {
        let env = Environment::builder()
            .search_root("/opt/plugins")
            .search_roots(["/usr/share/plugins", "/home/me/.plugins"])
            .build();

        assert_eq!(
            env.search_roots(),
            &[
                PathBuf::from("/opt/plugins"),
                PathBuf::from("/usr/share/plugins"),
                PathBuf::from("/home/me/.plugins"),
            ]
        );
    }

    #[test]
    fn test_config_lookup() {
        let env = Environment::builder()
            .config("platform", "linux")
            .config("threads", 4)
            .build();

        assert_eq!(env.get_str("platform"), Some("linux"));
        assert_eq!(env.get("threads"), Some(&Value::from(4)));
        assert_eq!(env.get_str("threads"), None);
        assert!(env.get("missing").is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let env = Environment::builder().search_root("/a").build();
        let copy = env.clone();
        assert!(Arc::ptr_eq(&env.inner, &copy.inner));
    }

    #[test]
    fn test_environment_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Environment>();
    }
}
