//! The language service lifecycle contract

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

use crate::candidate::Candidate;
use crate::container::Container;
use crate::environment::Environment;
use crate::error::{DiscoveryError, InvalidPluginError, ServiceInitializationError};
use crate::loader::EntryPointLoader;

/// Discovery, candidate resolution and instantiation for one plugin dialect.
///
/// The host calls the operations in this order for every discovery pass:
///
/// 1. [`initialize`](LanguageService::initialize)
/// 2. [`discover_plugin_resources`](LanguageService::discover_plugin_resources)
/// 3. [`create_plugin_candidates`](LanguageService::create_plugin_candidates)
/// 4. [`create_plugin_container`](LanguageService::create_plugin_container),
///    once per candidate the host accepted
/// 5. [`load_plugin`](LanguageService::load_plugin), once per container
///
/// Steps 1 to 4 must never run plugin-authored code. Only `load_plugin` gets
/// a loader, and only after the host decided to proceed.
#[async_trait]
pub trait LanguageService: Send + Sync + fmt::Debug {
    /// Stable dialect identifier.
    ///
    /// Used as the candidate dialect tag and as the registry key; plugin
    /// authors use it to target this service.
    fn name(&self) -> &str;

    /// One-time setup for the run.
    ///
    /// A service that fails here is excluded from the remaining phases.
    async fn initialize(&mut self, env: &Environment) -> Result<(), ServiceInitializationError>;

    /// Locate every resource this dialect might contain a plugin in.
    ///
    /// Walks the environment's search roots. Unreadable entries are skipped
    /// with a warning; failing to read every root is a [`DiscoveryError`].
    /// The service keeps track of the returned resources for
    /// [`create_plugin_candidates`](LanguageService::create_plugin_candidates).
    async fn discover_plugin_resources(
        &mut self,
        env: &Environment,
    ) -> Result<Vec<PathBuf>, DiscoveryError>;

    /// Parse the discovered resources into candidates.
    ///
    /// Each resource yields zero or one candidate. Parse failures are
    /// reported and skipped. Identities are unique in the output: the first
    /// in discovery order wins and later duplicates are reported as
    /// [`CandidateRejected`](crate::CandidateRejected). The order of the
    /// result is the tie-break order the host uses for conflicts.
    async fn create_plugin_candidates(&mut self, env: &Environment) -> Vec<Candidate>;

    /// Create the container for a candidate the host accepted.
    ///
    /// Returns `None` when the candidate turns out to be ineligible only at
    /// this stage (e.g. an unmet platform requirement).
    async fn create_plugin_container(
        &self,
        candidate: &Candidate,
        env: &Environment,
    ) -> Option<Container>;

    /// Instantiate the plugin inside `container`.
    ///
    /// Resolves the entry point through `loader`, constructs the instance and
    /// attaches it (`Created -> Loaded`). On failure the container becomes
    /// `Failed`, keeps the cause, and the cause is reported once (see
    /// [`Container::fail`]). Containers not in state `Created` are rejected
    /// with [`InvalidPluginError::InvalidState`].
    async fn load_plugin(
        &self,
        env: &Environment,
        container: &mut Container,
        loader: &dyn EntryPointLoader,
    ) -> Result<(), InvalidPluginError>;
}
