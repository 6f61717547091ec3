//! Loader policies: which entry points a container may reach

use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use weft_spi::{Container, EntryPoint, EntryPointLoader, ResolutionError};

/// Reason given for names outside a [`ScopedLoader`]'s whitelist
pub const OUTSIDE_BOUNDARY: &str = "outside the plugin's isolation boundary";

/// Loader exposing only a whitelisted set of an inner loader's entry points
#[derive(Clone)]
pub struct ScopedLoader {
    inner: Arc<dyn EntryPointLoader>,
    allowed: BTreeSet<String>,
}

impl ScopedLoader {
    /// Restrict `inner` to `names`
    pub fn new<I, S>(inner: Arc<dyn EntryPointLoader>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner,
            allowed: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `name` is inside the boundary
    pub fn allows(&self, name: &str) -> bool {
        self.allowed.contains(name)
    }
}

impl fmt::Debug for ScopedLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedLoader")
            .field("allowed", &self.allowed)
            .finish_non_exhaustive()
    }
}

impl EntryPointLoader for ScopedLoader {
    fn resolve_entry_point(&self, name: &str) -> Result<EntryPoint, ResolutionError> {
        if !self.allows(name) {
            tracing::debug!(entry_point = %name, "Entry point outside boundary refused");
            return Err(ResolutionError::new(name, OUTSIDE_BOUNDARY));
        }
        self.inner.resolve_entry_point(name)
    }
}

/// Host policy choosing the loader handed to one container's load
pub trait LoaderFactory: Send + Sync + fmt::Debug {
    /// Loader for `container`
    fn loader_for(&self, container: &Container) -> Box<dyn EntryPointLoader>;
}

/// Hands the same loader to every container
#[derive(Debug, Clone)]
pub struct SharedLoaderFactory {
    loader: Arc<dyn EntryPointLoader>,
}

impl SharedLoaderFactory {
    /// Share `loader` between all containers
    pub fn new(loader: impl EntryPointLoader + 'static) -> Self {
        Self {
            loader: Arc::new(loader),
        }
    }

    /// Share an already shared loader
    pub fn from_arc(loader: Arc<dyn EntryPointLoader>) -> Self {
        Self { loader }
    }
}

impl LoaderFactory for SharedLoaderFactory {
    fn loader_for(&self, _container: &Container) -> Box<dyn EntryPointLoader> {
        Box::new(Arc::clone(&self.loader))
    }
}

/// Gives each container a [`ScopedLoader`] limited to its declared entry
/// points
#[derive(Debug, Clone)]
pub struct ScopedLoaderFactory {
    inner: Arc<dyn EntryPointLoader>,
}

impl ScopedLoaderFactory {
    /// Scope `inner` per container
    pub fn new(inner: impl EntryPointLoader + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl LoaderFactory for ScopedLoaderFactory {
    fn loader_for(&self, container: &Container) -> Box<dyn EntryPointLoader> {
        Box::new(ScopedLoader::new(
            Arc::clone(&self.inner),
            declared_entry_points(container),
        ))
    }
}

/// Entry points a container declares in its metadata.
///
/// Reads the `entry_point` string and the `entry_points` array. A container
/// declaring neither is allowed its own identity.
pub fn declared_entry_points(container: &Container) -> BTreeSet<String> {
    let metadata = container.metadata();
    let mut names: BTreeSet<String> = metadata["entry_points"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    if let Some(name) = metadata["entry_point"].as_str() {
        names.insert(name.to_string());
    }

    if names.is_empty() {
        names.insert(container.id().to_string());
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weft_spi::{Candidate, SourceLocation, StaticLoader};

    #[derive(Debug)]
    struct Sample;

    fn loader() -> Arc<dyn EntryPointLoader> {
        Arc::new(
            StaticLoader::new()
                .with("sample", |_: &Value| Ok(Sample))
                .with("other", |_: &Value| Ok(Sample)),
        )
    }

    fn container(metadata: Value) -> Container {
        let candidate = Candidate::new("sample", "memory", SourceLocation::path("/p/sample"))
            .with_metadata(metadata);
        Container::from_candidate(&candidate)
    }

    #[test]
    fn test_scoped_loader_refuses_outside_names() {
        let scoped = ScopedLoader::new(loader(), ["sample"]);

        assert!(scoped.resolve_entry_point("sample").is_ok());

        let err = scoped.resolve_entry_point("other").unwrap_err();
        assert_eq!(err.entry_point, "other");
        assert_eq!(err.reason, OUTSIDE_BOUNDARY);
    }

    #[test]
    fn test_scoped_loader_keeps_inner_failures() {
        let scoped = ScopedLoader::new(loader(), ["missing"]);
        let err = scoped.resolve_entry_point("missing").unwrap_err();
        assert_eq!(err.reason, "not found");
    }

    #[test]
    fn test_declared_entry_points() {
        let names = declared_entry_points(&container(json!({
            "entry_point": "sample",
            "entry_points": ["helper", 7],
        })));
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["helper", "sample"]);

        let names = declared_entry_points(&container(Value::Null));
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["sample"]);
    }

    #[test]
    fn test_scoped_factory_uses_container_boundary() {
        let factory = ScopedLoaderFactory {
            inner: loader(),
        };
        let scoped = factory.loader_for(&container(json!({ "entry_point": "sample" })));

        assert!(scoped.resolve_entry_point("sample").is_ok());
        assert!(scoped.resolve_entry_point("other").is_err());
    }

    #[test]
    fn test_shared_factory_exposes_everything() {
        let factory = SharedLoaderFactory::from_arc(loader());
        let shared = factory.loader_for(&container(json!({ "entry_point": "sample" })));

        assert!(shared.resolve_entry_point("other").is_ok());
    }
}
