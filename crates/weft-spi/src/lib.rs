//! # Weft SPI
//!
//! The contract between a plugin host and its language services. Each
//! language service handles exactly one plugin dialect (packaging, metadata
//! format and instantiation mechanics) and is driven through the same
//! lifecycle:
//!
//! 1. **initialize** the service for the run
//! 2. **discover** resources under the environment's search roots
//! 3. **create candidates**: parse resources into pure-data descriptors
//! 4. **create containers** for the candidates the host accepted
//! 5. **load** each container through a host-supplied [`EntryPointLoader`]
//!
//! No plugin code runs before step 5.
//!
//! ## Example
//!
//! ```rust,no_run
//! use weft_spi::*;
//! use async_trait::async_trait;
//! use std::path::PathBuf;
//!
//! #[derive(Debug)]
//! struct NullService;
//!
//! #[async_trait]
//! impl LanguageService for NullService {
//!     fn name(&self) -> &str { "null" }
//!
//!     async fn initialize(&mut self, _env: &Environment) -> Result<(), ServiceInitializationError> {
//!         Ok(())
//!     }
//!
//!     async fn discover_plugin_resources(
//!         &mut self,
//!         _env: &Environment,
//!     ) -> Result<Vec<PathBuf>, DiscoveryError> {
//!         Ok(Vec::new())
//!     }
//!
//!     async fn create_plugin_candidates(&mut self, _env: &Environment) -> Vec<Candidate> {
//!         Vec::new()
//!     }
//!
//!     async fn create_plugin_container(
//!         &self,
//!         candidate: &Candidate,
//!         _env: &Environment,
//!     ) -> Option<Container> {
//!         Some(Container::from_candidate(candidate))
//!     }
//!
//!     async fn load_plugin(
//!         &self,
//!         env: &Environment,
//!         container: &mut Container,
//!         loader: &dyn EntryPointLoader,
//!     ) -> Result<(), InvalidPluginError> {
//!         let id = container.id().to_string();
//!         match loader.resolve_entry_point(&id) {
//!             Ok(entry) => match entry.construct(container.metadata()) {
//!                 Ok(instance) => container.attach(instance),
//!                 Err(err) => Err(container.fail(InvalidPluginError::construction(&id, err), env)),
//!             },
//!             Err(err) => Err(container.fail(InvalidPluginError::missing_entry_point(&id, err), env)),
//!         }
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod candidate;
pub mod container;
pub mod environment;
pub mod error;
pub mod loader;
pub mod report;
pub mod service;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use candidate::{Candidate, SourceLocation};
pub use container::{Container, ContainerState};
pub use environment::{Environment, EnvironmentBuilder};
pub use error::{
    error_chain, BoxError, CandidateRejected, DiscoveryError, InvalidPluginError, ResolutionError,
    ServiceInitializationError,
};
pub use loader::{factory_fn, EntryPoint, EntryPointLoader, PluginFactory, PluginInstance, StaticLoader};
pub use report::{Reporter, Severity, TracingReporter};
pub use service::LanguageService;

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::candidate::{Candidate, SourceLocation};
    pub use crate::container::{Container, ContainerState};
    pub use crate::environment::Environment;
    pub use crate::error::{
        CandidateRejected, DiscoveryError, InvalidPluginError, ResolutionError,
        ServiceInitializationError,
    };
    pub use crate::loader::{EntryPoint, EntryPointLoader, PluginInstance};
    pub use crate::report::{Reporter, Severity};
    pub use crate::service::LanguageService;
    pub use async_trait::async_trait;
}
