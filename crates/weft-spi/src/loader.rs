//! Dynamic-code loader capability handed to `load_plugin`

use serde_json::Value;
use std::any::{self, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, ResolutionError};

/// An instantiated plugin object.
///
/// Implemented for every `Any + Send + Sync + Debug` type. The host reads
/// instances through [`downcast_ref`](trait.PluginInstance.html#method.downcast_ref).
pub trait PluginInstance: Any + Send + Sync + fmt::Debug {
    /// Upcast for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Name of the concrete type
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync + fmt::Debug> PluginInstance for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }
}

impl dyn PluginInstance {
    /// Borrow the instance as its concrete type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Check the concrete type of the instance
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Constructs plugin instances. Running it executes plugin-authored code.
pub trait PluginFactory: Send + Sync {
    /// Build an instance from the plugin's configuration
    fn construct(&self, config: &Value) -> Result<Box<dyn PluginInstance>, BoxError>;
}

struct FnFactory<F>(F);

impl<F, T> PluginFactory for FnFactory<F>
where
    F: Fn(&Value) -> Result<T, BoxError> + Send + Sync,
    T: PluginInstance,
{
    fn construct(&self, config: &Value) -> Result<Box<dyn PluginInstance>, BoxError> {
        let instance = (self.0)(config)?;
        Ok(Box::new(instance))
    }
}

/// Wrap a constructor function as a [`PluginFactory`]
pub fn factory_fn<F, T>(constructor: F) -> Arc<dyn PluginFactory>
where
    F: Fn(&Value) -> Result<T, BoxError> + Send + Sync + 'static,
    T: PluginInstance,
{
    Arc::new(FnFactory(constructor))
}

/// A resolved entry point: a constructible handle.
#[derive(Clone)]
pub struct EntryPoint {
    name: String,
    factory: Arc<dyn PluginFactory>,
}

impl EntryPoint {
    /// Create a handle for a factory
    pub fn new(name: impl Into<String>, factory: Arc<dyn PluginFactory>) -> Self {
        Self {
            name: name.into(),
            factory,
        }
    }

    /// Name the handle was resolved from
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Construct a plugin instance
    pub fn construct(&self, config: &Value) -> Result<Box<dyn PluginInstance>, BoxError> {
        self.factory.construct(config)
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("name", &self.name)
            .field("factory", &"<opaque>")
            .finish()
    }
}

/// Host-supplied capability resolving entry point names inside an isolation
/// boundary chosen by the host.
pub trait EntryPointLoader: Send + Sync + fmt::Debug {
    /// Resolve a named entry point
    fn resolve_entry_point(&self, name: &str) -> Result<EntryPoint, ResolutionError>;
}

impl<L: EntryPointLoader + ?Sized> EntryPointLoader for Arc<L> {
    fn resolve_entry_point(&self, name: &str) -> Result<EntryPoint, ResolutionError> {
        (**self).resolve_entry_point(name)
    }
}

/// Loader backed by a table of compiled-in entry points
#[derive(Clone, Default)]
pub struct StaticLoader {
    entries: BTreeMap<String, Arc<dyn PluginFactory>>,
}

impl StaticLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a name, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, factory: Arc<dyn PluginFactory>) {
        self.entries.insert(name.into(), factory);
    }

    /// Register a constructor function (builder style)
    pub fn with<F, T>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&Value) -> Result<T, BoxError> + Send + Sync + 'static,
        T: PluginInstance,
    {
        self.register(name, factory_fn(constructor));
        self
    }

    /// Registered entry point names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl fmt::Debug for StaticLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticLoader")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EntryPointLoader for StaticLoader {
    fn resolve_entry_point(&self, name: &str) -> Result<EntryPoint, ResolutionError> {
        self.entries
            .get(name)
            .map(|factory| EntryPoint::new(name, Arc::clone(factory)))
            .ok_or_else(|| ResolutionError::not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Greeter {
        greeting: String,
    }

    fn loader() -> StaticLoader {
        StaticLoader::new().with("greeter", |config: &Value| {
            let greeting = config["greeting"].as_str().unwrap_or("hello").to_string();
            Ok(Greeter { greeting })
        })
    }

    #[test]
    fn test_resolve_and_construct() {
        let entry = loader().resolve_entry_point("greeter").unwrap();
        assert_eq!(entry.name(), "greeter");

        let instance = entry.construct(&json!({ "greeting": "hi" })).unwrap();
        assert!(instance.is::<Greeter>());
        assert_eq!(instance.downcast_ref::<Greeter>().unwrap().greeting, "hi");
        assert!(instance.as_ref().type_name().ends_with("Greeter"));
    }

    #[test]
    fn test_unknown_entry_point() {
        let err = loader().resolve_entry_point("missing").unwrap_err();
        assert_eq!(err, ResolutionError::not_found("missing"));
    }

    #[test]
    fn test_constructor_error_is_returned() {
        let loader = StaticLoader::new().with("broken", |_: &Value| -> Result<Greeter, BoxError> {
            Err("no greeting configured".into())
        });

        let entry = loader.resolve_entry_point("broken").unwrap();
        let err = entry.construct(&Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "no greeting configured");
    }

    #[test]
    fn test_names_are_sorted() {
        let loader = loader().with("alpha", |_: &Value| Ok(()));
        assert_eq!(loader.names().collect::<Vec<_>>(), vec!["alpha", "greeter"]);
        assert!(loader.contains("alpha"));
    }
}
