//! Plugin host driving language services through the lifecycle

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use weft_config::{Config, FailurePolicy, LoadingConfig, ServicesConfig};
use weft_spi::{
    Candidate, CandidateRejected, Container, ContainerState, DiscoveryError, Environment,
    InvalidPluginError, LanguageService, Reporter, ServiceInitializationError, Severity,
};

use crate::error::{HostError, Result};
use crate::loader::LoaderFactory;
use crate::phase::HostPhase;
use crate::registry::{ServiceRegistry, ServiceState};

/// Why a language service was excluded from the run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceFailure {
    /// `initialize` failed
    #[error(transparent)]
    Initialization(#[from] ServiceInitializationError),

    /// `discover_plugin_resources` failed
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

impl ServiceFailure {
    /// Dialect name of the excluded service
    pub fn service(&self) -> &str {
        match self {
            ServiceFailure::Initialization(err) => &err.service,
            ServiceFailure::Discovery(err) => &err.service,
        }
    }
}

/// Host-side veto over candidates, applied during conflict resolution
pub trait CandidateFilter: Send + Sync {
    /// `Err(reason)` rejects the candidate
    fn check(&self, candidate: &Candidate) -> std::result::Result<(), String>;
}

impl<F> CandidateFilter for F
where
    F: Fn(&Candidate) -> std::result::Result<(), String> + Send + Sync,
{
    fn check(&self, candidate: &Candidate) -> std::result::Result<(), String> {
        self(candidate)
    }
}

/// A container that failed during the load phase
#[derive(Debug, Clone)]
pub struct LoadFailure {
    /// Plugin identity
    pub plugin: String,

    /// Why it failed
    pub error: InvalidPluginError,
}

/// Outcome of a load phase
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    /// Plugins loaded, in completion order
    pub loaded: Vec<String>,

    /// Plugins that failed, in completion order
    pub failed: Vec<LoadFailure>,
}

impl LoadSummary {
    /// Whether every attempted load succeeded
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of attempted loads
    pub fn total(&self) -> usize {
        self.loaded.len() + self.failed.len()
    }
}

/// Host statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStats {
    /// Registered language services
    pub services: usize,

    /// Services excluded after a failure
    pub failed_services: usize,

    /// Candidates accepted by conflict resolution
    pub candidates: usize,

    /// Containers created
    pub containers: usize,

    /// Containers waiting to be loaded
    pub created: usize,

    /// Containers holding a plugin instance
    pub loaded: usize,

    /// Containers that failed to load
    pub failed: usize,
}

#[derive(Debug)]
struct ContainerSlot {
    service: usize,
    container: Container,
}

/// Drives every registered language service through
/// initialize, discover, resolve, create containers and load.
///
/// Each phase runs once and in order. A second discovery pass needs a new
/// host with a new [`Environment`].
pub struct PluginHost {
    env: Environment,
    registry: ServiceRegistry,
    services: ServicesConfig,
    loading: LoadingConfig,
    filter: Option<Box<dyn CandidateFilter>>,
    phase: HostPhase,
    failures: Vec<ServiceFailure>,
    accepted: Vec<(usize, Candidate)>,
    rejections: Vec<CandidateRejected>,
    slots: Vec<ContainerSlot>,
}

impl PluginHost {
    /// Create a host for an environment with default loading settings
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            registry: ServiceRegistry::new(),
            services: ServicesConfig::default(),
            loading: LoadingConfig::default(),
            filter: None,
            phase: HostPhase::Registering,
            failures: Vec::new(),
            accepted: Vec::new(),
            rejections: Vec::new(),
            slots: Vec::new(),
        }
    }

    /// Create a host from configuration
    ///
    /// The environment gets the configured search roots and properties and
    /// reports through `reporter`.
    pub fn from_config(config: &Config, reporter: Arc<dyn Reporter>) -> Self {
        let env = Environment::builder()
            .search_roots(&config.host.search_roots)
            .config_map(config.host.properties.clone())
            .reporter(reporter)
            .build();

        Self::new(env)
            .with_services_config(config.services.clone())
            .with_loading(config.loading.clone())
    }

    /// Set the load phase policy
    pub fn with_loading(mut self, loading: LoadingConfig) -> Self {
        self.loading = loading;
        self
    }

    /// Set which services are disabled
    pub fn with_services_config(mut self, services: ServicesConfig) -> Self {
        self.services = services;
        self
    }

    /// Veto candidates during conflict resolution
    pub fn with_filter(mut self, filter: impl CandidateFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// The environment handed to every service
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    /// Registered language services
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Services excluded so far
    pub fn failures(&self) -> &[ServiceFailure] {
        &self.failures
    }

    /// Candidates rejected by the host
    pub fn rejections(&self) -> &[CandidateRejected] {
        &self.rejections
    }

    /// Candidates accepted by conflict resolution, in tie-break order
    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.accepted.iter().map(|(_, candidate)| candidate)
    }

    /// Resources each service discovered, in registration order
    pub fn discovered_resources(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.registry
            .iter()
            .map(|entry| (entry.name(), entry.resources()))
    }

    /// All containers, in creation order
    pub fn containers(&self) -> impl Iterator<Item = &Container> {
        self.slots.iter().map(|slot| &slot.container)
    }

    /// Container for a plugin identity
    pub fn container(&self, id: &str) -> Option<&Container> {
        self.containers().find(|container| container.id() == id)
    }

    /// Take ownership of the containers
    pub fn into_containers(self) -> Vec<Container> {
        self.slots.into_iter().map(|slot| slot.container).collect()
    }

    /// Register a language service
    pub fn register<S: LanguageService + 'static>(&mut self, service: S) -> Result<()> {
        self.register_boxed(Box::new(service))
    }

    /// Register a boxed language service
    ///
    /// Services disabled in configuration are skipped.
    pub fn register_boxed(&mut self, service: Box<dyn LanguageService>) -> Result<()> {
        self.ensure_phase("register a language service", HostPhase::Registering)?;

        if !self.services.is_enabled(service.name()) {
            info!(service = %service.name(), "Language service disabled by configuration, skipping");
            return Ok(());
        }

        self.registry.register(service)
    }

    /// Initialize every registered service
    ///
    /// A service that fails is recorded and excluded from the later phases.
    pub async fn initialize(&mut self) -> Result<()> {
        self.ensure_phase("initialize", HostPhase::Registering)?;

        let env = &self.env;
        let mut failures = Vec::new();
        for entry in self.registry.iter_mut() {
            match entry.service.initialize(env).await {
                Ok(()) => {
                    entry.state = ServiceState::Active;
                    debug!(service = %entry.name(), "Language service initialized");
                }
                Err(err) => {
                    entry.state = ServiceState::Failed;
                    failures.push(ServiceFailure::from(err));
                }
            }
        }

        for failure in failures {
            self.record_failure(failure);
        }

        self.phase = HostPhase::Initialized;
        info!(
            services = self.registry.active().count(),
            failed = self.failures.len(),
            "Language services initialized"
        );
        Ok(())
    }

    /// Discover resources and create candidates, all services concurrently
    pub async fn discover(&mut self) -> Result<()> {
        self.ensure_phase("discover", HostPhase::Initialized)?;

        let env = &self.env;
        let outcomes = join_all(self.registry.active_mut().map(|entry| async move {
            match entry.service.discover_plugin_resources(env).await {
                Ok(resources) => {
                    entry.resources = resources;
                    entry.candidates = entry.service.create_plugin_candidates(env).await;
                    debug!(
                        service = %entry.name(),
                        resources = entry.resources.len(),
                        candidates = entry.candidates.len(),
                        "Discovery finished"
                    );
                    None
                }
                Err(err) => {
                    entry.state = ServiceState::Failed;
                    Some(err)
                }
            }
        }))
        .await;

        for err in outcomes.into_iter().flatten() {
            self.record_failure(err.into());
        }

        self.phase = HostPhase::Discovered;
        info!(
            resources = self.registry.iter().map(|e| e.resources().len()).sum::<usize>(),
            "Plugin resources discovered"
        );
        Ok(())
    }

    /// Resolve identity conflicts across services
    ///
    /// The first candidate for an identity wins, in service registration
    /// order and then in each service's candidate order. Losers, candidates
    /// tagged with another service's dialect and candidates refused by the
    /// filter are reported as rejected.
    pub fn resolve(&mut self) -> Result<()> {
        self.ensure_phase("resolve", HostPhase::Discovered)?;

        let mut winners: HashMap<String, String> = HashMap::new();
        let mut accepted = Vec::new();
        let mut rejections = Vec::new();

        for (index, entry) in self.registry.iter_mut().enumerate() {
            if !entry.is_active() {
                continue;
            }
            let service = entry.name().to_string();

            for candidate in std::mem::take(&mut entry.candidates) {
                if candidate.dialect() != service {
                    rejections.push(CandidateRejected::new(
                        &service,
                        candidate.id(),
                        format!("tagged with dialect '{}'", candidate.dialect()),
                    ));
                    continue;
                }

                if let Some(winner) = winners.get(candidate.id()) {
                    rejections.push(CandidateRejected::new(
                        &service,
                        candidate.id(),
                        format!("identity already provided by '{winner}'"),
                    ));
                    continue;
                }

                if let Some(filter) = &self.filter {
                    if let Err(reason) = filter.check(&candidate) {
                        rejections.push(CandidateRejected::new(&service, candidate.id(), reason));
                        continue;
                    }
                }

                winners.insert(candidate.id().to_string(), service.clone());
                accepted.push((index, candidate));
            }
        }

        for rejection in rejections {
            self.reject(rejection);
        }

        self.accepted = accepted;
        self.phase = HostPhase::Resolved;
        info!(
            accepted = self.accepted.len(),
            rejected = self.rejections.len(),
            "Candidates resolved"
        );
        Ok(())
    }

    /// Create containers for the accepted candidates
    ///
    /// Each candidate goes back to the service that produced it. A service
    /// declining the candidate is recorded as a late rejection.
    pub async fn create_containers(&mut self) -> Result<()> {
        self.ensure_phase("create containers", HostPhase::Resolved)?;

        let mut slots = Vec::new();
        let mut rejections = Vec::new();

        for (producer, candidate) in &self.accepted {
            let service = self.registry.service_at(*producer);
            match service.create_plugin_container(candidate, &self.env).await {
                Some(container) => slots.push(ContainerSlot {
                    service: *producer,
                    container,
                }),
                None => rejections.push(CandidateRejected::new(
                    service.name(),
                    candidate.id(),
                    "declined when creating the container",
                )),
            }
        }

        for rejection in rejections {
            self.reject(rejection);
        }

        self.slots = slots;
        self.phase = HostPhase::ContainersCreated;
        info!(containers = self.slots.len(), "Containers created");
        Ok(())
    }

    /// Load one container
    ///
    /// Only containers still in state `Created` can be loaded.
    pub async fn load(&mut self, id: &str, factory: &dyn LoaderFactory) -> Result<()> {
        self.ensure_phase("load a plugin", HostPhase::ContainersCreated)?;

        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.container.id() == id)
            .ok_or_else(|| HostError::unknown_container(id))?;

        if slot.container.state() != ContainerState::Created {
            return Err(HostError::ContainerNotLoadable {
                plugin: id.to_string(),
                state: slot.container.state(),
            });
        }

        let service = self.registry.service_at(slot.service);
        load_container(
            service,
            &self.env,
            &mut slot.container,
            factory,
            self.loading.load_timeout,
        )
        .await?;
        Ok(())
    }

    /// Load every container still in state `Created`
    ///
    /// With [`FailurePolicy::Continue`] loads run concurrently up to the
    /// configured limit and every failure ends up in the summary. With
    /// [`FailurePolicy::Abort`] loads run one at a time and the first failure
    /// stops the phase; the remaining containers stay `Created` and the
    /// error carries the loads that finished.
    pub async fn load_all(&mut self, factory: &dyn LoaderFactory) -> Result<LoadSummary> {
        self.ensure_phase("load plugins", HostPhase::ContainersCreated)?;

        let registry = &self.registry;
        let env = &self.env;
        let timeout = self.loading.load_timeout;
        let limit = self.loading.max_concurrent_loads.max(1);
        let policy = self.loading.failure_policy;

        let pending = self
            .slots
            .iter_mut()
            .filter(|slot| slot.container.state() == ContainerState::Created);

        let mut summary = LoadSummary::default();
        info!(?policy, concurrency = limit, "Loading plugins");

        match policy {
            FailurePolicy::Continue => {
                let results: Vec<_> = stream::iter(pending)
                    .map(|slot| async move {
                        let id = slot.container.id().to_string();
                        let service = registry.service_at(slot.service);
                        let result =
                            load_container(service, env, &mut slot.container, factory, timeout)
                                .await;
                        (id, result)
                    })
                    .buffer_unordered(limit)
                    .collect()
                    .await;

                for (plugin, result) in results {
                    match result {
                        Ok(()) => summary.loaded.push(plugin),
                        Err(error) => summary.failed.push(LoadFailure { plugin, error }),
                    }
                }
            }
            FailurePolicy::Abort => {
                for slot in pending {
                    let plugin = slot.container.id().to_string();
                    let service = registry.service_at(slot.service);
                    match load_container(service, env, &mut slot.container, factory, timeout).await
                    {
                        Ok(()) => summary.loaded.push(plugin),
                        Err(source) => {
                            warn!(plugin = %plugin, "Aborting load phase, remaining plugins stay unloaded");
                            return Err(HostError::RunAborted {
                                plugin,
                                source,
                                summary,
                            });
                        }
                    }
                }
            }
        }

        info!(
            loaded = summary.loaded.len(),
            failed = summary.failed.len(),
            "Plugins loaded"
        );
        Ok(summary)
    }

    /// Run the whole lifecycle
    pub async fn run(&mut self, factory: &dyn LoaderFactory) -> Result<LoadSummary> {
        self.initialize().await?;
        self.discover().await?;
        self.resolve()?;
        self.create_containers().await?;
        self.load_all(factory).await
    }

    /// Get host statistics
    pub fn stats(&self) -> HostStats {
        let count = |state: ContainerState| {
            self.containers()
                .filter(|container| container.state() == state)
                .count()
        };

        HostStats {
            services: self.registry.len(),
            failed_services: self.failures.len(),
            candidates: self.accepted.len(),
            containers: self.slots.len(),
            created: count(ContainerState::Created),
            loaded: count(ContainerState::Loaded),
            failed: count(ContainerState::Failed),
        }
    }

    fn ensure_phase(&self, operation: &'static str, expected: HostPhase) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(HostError::phase_order(operation, expected, self.phase))
        }
    }

    fn record_failure(&mut self, failure: ServiceFailure) {
        warn!(service = %failure.service(), error = %failure, "Language service excluded");
        self.env.reporter().error(
            &format!("Language service '{}' excluded from this run", failure.service()),
            &failure,
        );
        self.failures.push(failure);
    }

    fn reject(&mut self, rejection: CandidateRejected) {
        self.env
            .reporter()
            .report(Severity::Warning, &rejection.to_string(), Some(&rejection));
        self.rejections.push(rejection);
    }
}

impl fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHost")
            .field("phase", &self.phase)
            .field("services", &self.registry.names())
            .field("failures", &self.failures)
            .field("containers", &self.slots.len())
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

/// Load one container and hold the service to the container state rules:
/// an error leaves the container `Failed`, success leaves it `Loaded`.
async fn load_container(
    service: &dyn LanguageService,
    env: &Environment,
    container: &mut Container,
    factory: &dyn LoaderFactory,
    timeout: Option<Duration>,
) -> std::result::Result<(), InvalidPluginError> {
    let id = container.id().to_string();
    let loader = factory.loader_for(container);
    debug!(plugin = %id, service = %service.name(), "Loading plugin");

    let outcome = match timeout {
        Some(after) => tokio::time::timeout(
            after,
            service.load_plugin(env, container, loader.as_ref()),
        )
        .await
        .unwrap_or_else(|_| {
            Err(InvalidPluginError::TimedOut {
                plugin: id.clone(),
                after,
            })
        }),
        None => service.load_plugin(env, container, loader.as_ref()).await,
    };

    let result = match (outcome, container.state()) {
        (Ok(()), ContainerState::Loaded) => Ok(()),
        (Ok(()), ContainerState::Created) => {
            let err = InvalidPluginError::NotAttached {
                plugin: id.clone(),
                service: service.name().to_string(),
            };
            Err(container.fail(err, env))
        }
        (Ok(()), ContainerState::Failed) => Err(container.failure().cloned().unwrap_or_else(|| {
            InvalidPluginError::NotAttached {
                plugin: id.clone(),
                service: service.name().to_string(),
            }
        })),
        (Err(err), ContainerState::Created) => Err(container.fail(err, env)),
        (Err(err), ContainerState::Loaded) => {
            warn!(plugin = %id, error = %err, "Plugin attached despite a reported error");
            Ok(())
        }
        (Err(err), ContainerState::Failed) => Err(err),
    };

    if let Err(err) = &result {
        warn!(plugin = %id, error = %err, "Plugin failed to load");
    }
    result
}
