//! Testing utilities for language service and host developers
//!
//! Provides the reference in-memory language service and instrumented
//! doubles for the reporting sink and the dynamic-code loader.

pub mod memory;
pub mod mocks;

pub use memory::{InMemoryLanguageService, MemoryResource, PLATFORM_KEY};
pub use mocks::{CollectingReporter, FailingLoader, RecordingLoader, ReportEntry};
