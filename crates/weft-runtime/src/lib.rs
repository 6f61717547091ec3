//! # Weft Runtime
//!
//! The plugin host: drives every registered language service through the
//! plugin lifecycle and owns the resulting containers.
//!
//! ## Features
//!
//! - **Service Registry**: ordered, one service per dialect
//! - **Lifecycle Phases**: initialize, discover, resolve, create containers, load
//! - **Conflict Resolution**: first candidate per identity wins across services
//! - **Loader Policies**: one shared loader, or one scoped loader per container
//! - **Bounded Loading**: concurrency limit, timeout and failure policy
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use weft_runtime::prelude::*;
//! use weft_runtime::{ScopedLoaderFactory, StaticLoader, TracingReporter};
//!
//! # #[derive(Debug)]
//! # struct Greeter;
//! # async fn example(
//! #     service: impl LanguageService + 'static,
//! # ) -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let config = weft_config::load_config("weft.yaml")?;
//! let mut host = PluginHost::from_config(&config, Arc::new(TracingReporter));
//! host.register(service)?;
//!
//! let loader = StaticLoader::new().with("greeter", |_: &serde_json::Value| Ok(Greeter));
//! let summary = host.run(&ScopedLoaderFactory::new(loader)).await?;
//! println!("{} loaded, {} failed", summary.loaded.len(), summary.failed.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod host;
pub mod loader;
pub mod phase;
pub mod registry;

pub use error::{HostError, Result};
pub use host::{CandidateFilter, HostStats, LoadFailure, LoadSummary, PluginHost, ServiceFailure};
pub use loader::{
    declared_entry_points, LoaderFactory, ScopedLoader, ScopedLoaderFactory, SharedLoaderFactory,
};
pub use phase::HostPhase;
pub use registry::{ServiceEntry, ServiceRegistry, ServiceState};

// Re-export the service contract for convenience
pub use weft_spi::{
    Candidate, Container, ContainerState, EntryPoint, EntryPointLoader, Environment,
    InvalidPluginError, LanguageService, Reporter, Severity, StaticLoader, TracingReporter,
};

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::error::{HostError, Result};
    pub use crate::host::{LoadSummary, PluginHost};
    pub use crate::loader::{LoaderFactory, ScopedLoaderFactory, SharedLoaderFactory};
    pub use weft_spi::prelude::*;
}
