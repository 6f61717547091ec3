//! Shared fixtures for host integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use weft_runtime::PluginHost;
use weft_spi::testing::{CollectingReporter, InMemoryLanguageService};
use weft_spi::{
    Candidate, Container, DiscoveryError, EntryPointLoader, Environment, InvalidPluginError,
    LanguageService, ServiceInitializationError, SourceLocation, StaticLoader,
};

/// Plugin type constructed by every test entry point
#[derive(Debug)]
pub struct Sample {
    pub config: Value,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn static_loader(names: &[&str]) -> StaticLoader {
    names.iter().fold(StaticLoader::new(), |loader, name| {
        loader.with(*name, |config: &Value| {
            Ok(Sample {
                config: config.clone(),
            })
        })
    })
}

pub fn host_with(reporter: Arc<CollectingReporter>) -> PluginHost {
    init_tracing();
    let env = Environment::builder()
        .search_root("/plugins")
        .reporter(reporter)
        .build();
    PluginHost::new(env)
}

/// Delegates to an in-memory service but sleeps before every load
#[derive(Debug)]
pub struct SlowService {
    inner: InMemoryLanguageService,
    delay: Duration,
}

impl SlowService {
    pub fn new(inner: InMemoryLanguageService, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl LanguageService for SlowService {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn initialize(&mut self, env: &Environment) -> Result<(), ServiceInitializationError> {
        self.inner.initialize(env).await
    }

    async fn discover_plugin_resources(
        &mut self,
        env: &Environment,
    ) -> Result<Vec<PathBuf>, DiscoveryError> {
        self.inner.discover_plugin_resources(env).await
    }

    async fn create_plugin_candidates(&mut self, env: &Environment) -> Vec<Candidate> {
        self.inner.create_plugin_candidates(env).await
    }

    async fn create_plugin_container(
        &self,
        candidate: &Candidate,
        env: &Environment,
    ) -> Option<Container> {
        self.inner.create_plugin_container(candidate, env).await
    }

    async fn load_plugin(
        &self,
        env: &Environment,
        container: &mut Container,
        loader: &dyn EntryPointLoader,
    ) -> Result<(), InvalidPluginError> {
        tokio::time::sleep(self.delay).await;
        self.inner.load_plugin(env, container, loader).await
    }
}

/// How a [`ScriptedService`] behaves when asked to load
#[derive(Debug, Clone)]
pub enum LoadBehaviour {
    /// Resolve this name instead of the declared entry point
    Resolve(String),

    /// Claim success without attaching anything
    SucceedWithoutAttaching,

    /// Return an error without touching the container
    FailWithoutRecording,
}

/// Service yielding one fixed candidate and loading it as scripted
#[derive(Debug)]
pub struct ScriptedService {
    name: String,
    plugin: String,
    dialect: String,
    behaviour: LoadBehaviour,
}

impl ScriptedService {
    pub fn new(name: &str, plugin: &str, behaviour: LoadBehaviour) -> Self {
        Self {
            name: name.to_string(),
            plugin: plugin.to_string(),
            dialect: name.to_string(),
            behaviour,
        }
    }

    /// Tag the candidate with another dialect than this service's name
    pub fn tagged_as(mut self, dialect: &str) -> Self {
        self.dialect = dialect.to_string();
        self
    }
}

#[async_trait]
impl LanguageService for ScriptedService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&mut self, _env: &Environment) -> Result<(), ServiceInitializationError> {
        Ok(())
    }

    async fn discover_plugin_resources(
        &mut self,
        _env: &Environment,
    ) -> Result<Vec<PathBuf>, DiscoveryError> {
        Ok(vec![PathBuf::from("/scripted").join(&self.plugin)])
    }

    async fn create_plugin_candidates(&mut self, _env: &Environment) -> Vec<Candidate> {
        let source = SourceLocation::path(PathBuf::from("/scripted").join(&self.plugin));
        vec![Candidate::new(&self.plugin, &self.dialect, source)
            .with_metadata(serde_json::json!({ "entry_point": self.plugin }))]
    }

    async fn create_plugin_container(
        &self,
        candidate: &Candidate,
        _env: &Environment,
    ) -> Option<Container> {
        Some(Container::from_candidate(candidate))
    }

    async fn load_plugin(
        &self,
        env: &Environment,
        container: &mut Container,
        loader: &dyn EntryPointLoader,
    ) -> Result<(), InvalidPluginError> {
        let id = container.id().to_string();
        match &self.behaviour {
            LoadBehaviour::Resolve(name) => {
                let entry = loader
                    .resolve_entry_point(name)
                    .map_err(|err| container.fail(InvalidPluginError::missing_entry_point(&id, err), env))?;
                let instance = entry
                    .construct(container.metadata())
                    .map_err(|err| container.fail(InvalidPluginError::construction(&id, err), env))?;
                container.attach(instance)
            }
            LoadBehaviour::SucceedWithoutAttaching => Ok(()),
            LoadBehaviour::FailWithoutRecording => {
                Err(InvalidPluginError::malformed(&id, "scripted failure"))
            }
        }
    }
}
