//! Reference language service over an in-memory resource tree

use async_trait::async_trait;
use serde_json::{json, Value};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use crate::candidate::{Candidate, SourceLocation};
use crate::container::{Container, ContainerState};
use crate::environment::Environment;
use crate::error::{
    CandidateRejected, DiscoveryError, InvalidPluginError, ServiceInitializationError,
};
use crate::loader::EntryPointLoader;
use crate::report::Severity;
use crate::service::LanguageService;

/// Environment key holding the host platform name
pub const PLATFORM_KEY: &str = "platform";

/// A plugin resource stored in memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryResource {
    /// Declared identity; `None` makes the resource unparseable
    pub id: Option<String>,

    /// Entry point name, defaults to the identity
    pub entry_point: Option<String>,

    /// Required host platform
    pub platform: Option<String>,

    /// Configuration handed to the entry point on construction
    pub config: Value,

    /// Extra dialect metadata carried on the candidate
    pub metadata: Value,

    /// Reading the resource fails
    pub unreadable: bool,

    /// Parsing the resource fails with this message
    pub malformed: Option<String>,
}

impl MemoryResource {
    /// A well-formed plugin resource
    pub fn plugin(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// A resource that declares no identity
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Set the entry point
    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = Some(entry_point.into());
        self
    }

    /// Require a host platform
    pub fn requires_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Set the construction config
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// Set extra metadata
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Make reading the resource fail
    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }

    /// Make parsing the resource fail
    pub fn malformed(mut self, message: impl Into<String>) -> Self {
        self.malformed = Some(message.into());
        self
    }
}

#[derive(Debug, Clone)]
struct MemoryLoadState {
    entry_point: String,
    config: Value,
}

/// Language service over an in-memory tree of directories and resources.
///
/// Search roots are readable when they were registered as directories.
/// Resources are discovered in path order under each root, roots in the
/// order the environment lists them.
#[derive(Debug)]
pub struct InMemoryLanguageService {
    name: String,
    directories: BTreeSet<PathBuf>,
    resources: BTreeMap<PathBuf, MemoryResource>,
    init_failure: Option<String>,
    initialized: bool,
    discovered: Option<Vec<PathBuf>>,
}

impl InMemoryLanguageService {
    /// Create an empty service for a dialect
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directories: BTreeSet::new(),
            resources: BTreeMap::new(),
            init_failure: None,
            initialized: false,
            discovered: None,
        }
    }

    /// Register a readable directory
    pub fn with_directory(mut self, path: impl AsRef<Path>) -> Self {
        self.directories.insert(path.as_ref().to_path_buf());
        self
    }

    /// Add a resource; every ancestor becomes a readable directory
    pub fn with_resource(mut self, path: impl AsRef<Path>, resource: MemoryResource) -> Self {
        let path = path.as_ref().to_path_buf();
        self.directories
            .extend(path.ancestors().skip(1).map(Path::to_path_buf));
        self.resources.insert(path, resource);
        self
    }

    /// Make `initialize` fail
    pub fn failing_initialization(mut self, message: impl Into<String>) -> Self {
        self.init_failure = Some(message.into());
        self
    }

    /// Resources found by the last discovery
    pub fn discovered(&self) -> Option<&[PathBuf]> {
        self.discovered.as_deref()
    }

    fn parse(&self, path: &Path, env: &Environment) -> Option<Candidate> {
        let resource = self.resources.get(path)?;

        if let Some(message) = &resource.malformed {
            env.reporter().warn(&format!(
                "Skipping malformed resource {}: {message}",
                path.display()
            ));
            return None;
        }

        let Some(id) = resource.id.clone() else {
            env.reporter().warn(&format!(
                "Skipping resource {}: no plugin identity declared",
                path.display()
            ));
            return None;
        };

        let entry_point = resource.entry_point.clone().unwrap_or_else(|| id.clone());
        let metadata = json!({
            "entry_point": entry_point,
            "platform": resource.platform,
            "config": resource.config,
            "extra": resource.metadata,
        });

        Some(Candidate::new(id, &self.name, SourceLocation::path(path)).with_metadata(metadata))
    }
}

#[async_trait]
impl LanguageService for InMemoryLanguageService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&mut self, env: &Environment) -> Result<(), ServiceInitializationError> {
        if let Some(message) = &self.init_failure {
            return Err(ServiceInitializationError::new(&self.name, message));
        }

        self.initialized = true;
        self.discovered = None;
        tracing::debug!(
            service = %self.name,
            roots = env.search_roots().len(),
            "Language service initialized"
        );
        Ok(())
    }

    async fn discover_plugin_resources(
        &mut self,
        env: &Environment,
    ) -> Result<Vec<PathBuf>, DiscoveryError> {
        if !self.initialized {
            return Err(DiscoveryError::new(&self.name, "service is not initialized"));
        }

        let roots = env.search_roots();
        let mut readable_roots = 0;
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for root in roots {
            if !self.directories.contains(root) {
                env.reporter().warn(&format!(
                    "Search root {} is not readable, skipping",
                    root.display()
                ));
                continue;
            }
            readable_roots += 1;

            for (path, resource) in &self.resources {
                if !path.starts_with(root) || !seen.insert(path.clone()) {
                    continue;
                }
                if resource.unreadable {
                    env.reporter()
                        .warn(&format!("Skipping unreadable resource {}", path.display()));
                    continue;
                }
                found.push(path.clone());
            }
        }

        if !roots.is_empty() && readable_roots == 0 {
            return Err(DiscoveryError::new(
                &self.name,
                format!("none of the {} search roots could be read", roots.len()),
            ));
        }

        self.discovered = Some(found.clone());
        Ok(found)
    }

    async fn create_plugin_candidates(&mut self, env: &Environment) -> Vec<Candidate> {
        let Some(discovered) = self.discovered.as_ref() else {
            env.reporter().warn(&format!(
                "Language service '{}' has no discovered resources",
                self.name
            ));
            return Vec::new();
        };

        let mut ids = HashSet::new();
        let mut candidates = Vec::new();

        for path in discovered {
            let Some(candidate) = self.parse(path, env) else {
                continue;
            };

            if !ids.insert(candidate.id().to_string()) {
                let rejection = CandidateRejected::new(
                    &self.name,
                    candidate.id(),
                    format!("duplicate identity declared by {}", candidate.source()),
                );
                env.reporter()
                    .report(Severity::Warning, &rejection.to_string(), Some(&rejection));
                continue;
            }

            candidates.push(candidate);
        }

        candidates
    }

    async fn create_plugin_container(
        &self,
        candidate: &Candidate,
        env: &Environment,
    ) -> Option<Container> {
        if candidate.dialect() != self.name {
            env.reporter().warn(&format!(
                "Candidate '{}' belongs to dialect '{}', not '{}'",
                candidate.id(),
                candidate.dialect(),
                self.name
            ));
            return None;
        }

        let metadata = candidate.metadata();
        if let Some(required) = metadata["platform"].as_str() {
            if env.get_str(PLATFORM_KEY) != Some(required) {
                env.reporter().warn(&format!(
                    "Plugin '{}' requires platform '{required}', skipping",
                    candidate.id()
                ));
                return None;
            }
        }

        let entry_point = metadata["entry_point"]
            .as_str()
            .unwrap_or(candidate.id())
            .to_string();

        let mut container = Container::from_candidate(candidate);
        container.set_dialect_state(MemoryLoadState {
            entry_point,
            config: metadata["config"].clone(),
        });
        Some(container)
    }

    async fn load_plugin(
        &self,
        env: &Environment,
        container: &mut Container,
        loader: &dyn EntryPointLoader,
    ) -> Result<(), InvalidPluginError> {
        if container.state() != ContainerState::Created {
            return Err(InvalidPluginError::InvalidState {
                plugin: container.id().to_string(),
                state: container.state(),
            });
        }

        let id = container.id().to_string();
        let Some(state) = container.dialect_state::<MemoryLoadState>().cloned() else {
            let err = InvalidPluginError::malformed(&id, "container was not created by this service");
            return Err(container.fail(err, env));
        };

        if state.entry_point.trim().is_empty() || state.entry_point.contains(char::is_whitespace) {
            let err = InvalidPluginError::malformed(
                &id,
                format!("entry point name '{}' is not valid", state.entry_point),
            );
            return Err(container.fail(err, env));
        }

        let entry = match loader.resolve_entry_point(&state.entry_point) {
            Ok(entry) => entry,
            Err(err) => {
                return Err(container.fail(InvalidPluginError::missing_entry_point(&id, err), env))
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(|| entry.construct(&state.config))) {
            Ok(Ok(instance)) => {
                container.attach(instance)?;
                tracing::info!(plugin = %id, dialect = %self.name, "Plugin loaded");
                Ok(())
            }
            Ok(Err(err)) => Err(container.fail(InvalidPluginError::construction(&id, err), env)),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                let err = InvalidPluginError::construction(&id, message.into());
                Err(container.fail(err, env))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("entry point panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("entry point panicked: {message}")
    } else {
        "entry point panicked".to_string()
    }
}
