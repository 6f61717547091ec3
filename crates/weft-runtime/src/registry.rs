//! Ordered registry of language services

use crate::error::{HostError, Result};
use std::path::PathBuf;
use tracing::info;
use weft_spi::{Candidate, LanguageService};

/// Language service state inside the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Registered but not initialized
    Registered,

    /// Initialized and taking part in the remaining phases
    Active,

    /// Excluded after a failed initialization or discovery
    Failed,
}

/// A registered language service with what it produced so far
#[derive(Debug)]
pub struct ServiceEntry {
    pub(crate) service: Box<dyn LanguageService>,
    pub(crate) state: ServiceState,
    pub(crate) resources: Vec<PathBuf>,
    pub(crate) candidates: Vec<Candidate>,
}

impl ServiceEntry {
    fn new(service: Box<dyn LanguageService>) -> Self {
        Self {
            service,
            state: ServiceState::Registered,
            resources: Vec::new(),
            candidates: Vec::new(),
        }
    }

    /// Dialect identifier of the service
    pub fn name(&self) -> &str {
        self.service.name()
    }

    /// The language service
    pub fn service(&self) -> &dyn LanguageService {
        self.service.as_ref()
    }

    /// Current state
    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Whether the service still takes part in the lifecycle
    pub fn is_active(&self) -> bool {
        self.state == ServiceState::Active
    }

    /// Resources found by discovery
    pub fn resources(&self) -> &[PathBuf] {
        &self.resources
    }
}

/// Language services keyed by dialect, in registration order.
///
/// Registration order is the tie-break order for conflicting candidates.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    entries: Vec<ServiceEntry>,
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a language service
    ///
    /// Fails when a service with the same dialect name is already registered.
    pub fn register(&mut self, service: Box<dyn LanguageService>) -> Result<()> {
        let name = service.name().to_string();
        if self.contains(&name) {
            return Err(HostError::already_registered(&name));
        }

        self.entries.push(ServiceEntry::new(service));
        info!(service = %name, "Language service registered");
        Ok(())
    }

    /// Whether a dialect is registered
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Registration index of a dialect
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name() == name)
    }

    /// Look up a service entry by dialect
    pub fn get(&self, name: &str) -> Option<&ServiceEntry> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    /// Dialect names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(ServiceEntry::name).collect()
    }

    /// All entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = &ServiceEntry> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ServiceEntry> {
        self.entries.iter_mut()
    }

    /// Entries still taking part in the lifecycle
    pub fn active(&self) -> impl Iterator<Item = &ServiceEntry> {
        self.entries.iter().filter(|entry| entry.is_active())
    }

    pub(crate) fn active_mut(&mut self) -> impl Iterator<Item = &mut ServiceEntry> {
        self.entries.iter_mut().filter(|entry| entry.is_active())
    }

    pub(crate) fn service_at(&self, index: usize) -> &dyn LanguageService {
        self.entries[index].service()
    }

    /// Number of registered services
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no service is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
