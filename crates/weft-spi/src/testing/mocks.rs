//! Instrumented test doubles

use parking_lot::Mutex;
use std::error::Error as StdError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{error_chain, BoxError, ResolutionError};
use crate::loader::{EntryPoint, EntryPointLoader, PluginFactory, PluginInstance};
use crate::report::{Reporter, Severity};

/// One recorded report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    /// Severity
    pub severity: Severity,

    /// Message
    pub message: String,

    /// Cause rendered with its source chain
    pub cause: Option<String>,
}

/// Reporter that keeps every report in memory
#[derive(Debug, Default)]
pub struct CollectingReporter {
    entries: Mutex<Vec<ReportEntry>>,
}

impl CollectingReporter {
    /// Create an empty reporter
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports, oldest first
    pub fn entries(&self) -> Vec<ReportEntry> {
        self.entries.lock().clone()
    }

    /// Reports of one severity
    pub fn with_severity(&self, severity: Severity) -> Vec<ReportEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.severity == severity)
            .cloned()
            .collect()
    }

    /// Reports whose message contains `needle`
    pub fn containing(&self, needle: &str) -> Vec<ReportEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.message.contains(needle))
            .cloned()
            .collect()
    }

    /// Number of reports
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing was reported
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Forget all reports
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, severity: Severity, message: &str, cause: Option<&(dyn StdError + 'static)>) {
        self.entries.lock().push(ReportEntry {
            severity,
            message: message.to_string(),
            cause: cause.map(error_chain),
        });
    }
}

/// Loader that records every resolution and construction it performs.
///
/// Clones share their counters, so a test can keep one handle and give
/// another to the host.
#[derive(Debug, Clone)]
pub struct RecordingLoader {
    inner: Arc<dyn EntryPointLoader>,
    resolutions: Arc<Mutex<Vec<String>>>,
    constructions: Arc<AtomicUsize>,
}

impl RecordingLoader {
    /// Wrap a loader
    pub fn new(inner: impl EntryPointLoader + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
            resolutions: Arc::new(Mutex::new(Vec::new())),
            constructions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Names passed to `resolve_entry_point`, in call order
    pub fn resolved_names(&self) -> Vec<String> {
        self.resolutions.lock().clone()
    }

    /// Number of `resolve_entry_point` calls
    pub fn resolution_count(&self) -> usize {
        self.resolutions.lock().len()
    }

    /// Number of constructions through resolved entry points
    pub fn construction_count(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    /// Resolutions plus constructions
    pub fn invocation_count(&self) -> usize {
        self.resolution_count() + self.construction_count()
    }
}

struct CountingFactory {
    entry: EntryPoint,
    constructions: Arc<AtomicUsize>,
}

impl PluginFactory for CountingFactory {
    fn construct(&self, config: &serde_json::Value) -> Result<Box<dyn PluginInstance>, BoxError> {
        self.constructions.fetch_add(1, Ordering::SeqCst);
        self.entry.construct(config)
    }
}

impl EntryPointLoader for RecordingLoader {
    fn resolve_entry_point(&self, name: &str) -> Result<EntryPoint, ResolutionError> {
        self.resolutions.lock().push(name.to_string());
        let entry = self.inner.resolve_entry_point(name)?;
        Ok(EntryPoint::new(
            name,
            Arc::new(CountingFactory {
                entry,
                constructions: Arc::clone(&self.constructions),
            }),
        ))
    }
}

/// Loader that refuses every entry point
#[derive(Debug, Clone)]
pub struct FailingLoader {
    reason: String,
}

impl FailingLoader {
    /// Fail every resolution with `reason`
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl EntryPointLoader for FailingLoader {
    fn resolve_entry_point(&self, name: &str) -> Result<EntryPoint, ResolutionError> {
        Err(ResolutionError::new(name, &self.reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::StaticLoader;
    use serde_json::Value;

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingReporter::new();
        assert!(reporter.is_empty());

        reporter.warn("skipped /p/broken");
        let cause = ResolutionError::not_found("sample");
        reporter.error("load failed", &cause);

        assert_eq!(reporter.len(), 2);
        assert_eq!(reporter.with_severity(Severity::Warning).len(), 1);

        let errors = reporter.with_severity(Severity::Error);
        assert_eq!(
            errors[0].cause.as_deref(),
            Some("Entry point 'sample' could not be resolved: not found")
        );
        assert_eq!(reporter.containing("broken").len(), 1);

        reporter.clear();
        assert!(reporter.is_empty());
    }

    #[test]
    fn test_recording_loader_counts() {
        let loader = RecordingLoader::new(StaticLoader::new().with("unit", |_: &Value| Ok(())));
        let handle = loader.clone();
        assert_eq!(handle.invocation_count(), 0);

        let entry = loader.resolve_entry_point("unit").unwrap();
        assert!(loader.resolve_entry_point("other").is_err());
        assert_eq!(handle.resolved_names(), vec!["unit", "other"]);
        assert_eq!(handle.construction_count(), 0);

        entry.construct(&Value::Null).unwrap();
        assert_eq!(handle.construction_count(), 1);
        assert_eq!(handle.invocation_count(), 3);
    }

    #[test]
    fn test_failing_loader() {
        let err = FailingLoader::new("sealed")
            .resolve_entry_point("sample")
            .unwrap_err();
        assert_eq!(err.reason, "sealed");
    }
}
