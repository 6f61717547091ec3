//! Reporting channel shared by the host and its language services

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;

use crate::error::error_chain;

/// Severity of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Diagnostic detail
    Debug,
    /// Normal progress
    Info,
    /// Something was skipped or rejected
    Warning,
    /// An operation failed
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Debug => write!(f, "debug"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Sink for `(severity, message, optional cause)` reports.
///
/// Implementations must tolerate concurrent calls: discovery for several
/// language services may report at the same time.
pub trait Reporter: Send + Sync + fmt::Debug {
    /// Record a report
    fn report(&self, severity: Severity, message: &str, cause: Option<&(dyn StdError + 'static)>);

    /// Record a warning
    fn warn(&self, message: &str) {
        self.report(Severity::Warning, message, None);
    }

    /// Record an error together with its cause
    fn error(&self, message: &str, cause: &(dyn StdError + 'static)) {
        self.report(Severity::Error, message, Some(cause));
    }
}

/// Forwards reports to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, severity: Severity, message: &str, cause: Option<&(dyn StdError + 'static)>) {
        let cause = cause.map(error_chain);
        match (severity, cause) {
            (Severity::Debug, None) => tracing::debug!("{message}"),
            (Severity::Debug, Some(cause)) => tracing::debug!(%cause, "{message}"),
            (Severity::Info, None) => tracing::info!("{message}"),
            (Severity::Info, Some(cause)) => tracing::info!(%cause, "{message}"),
            (Severity::Warning, None) => tracing::warn!("{message}"),
            (Severity::Warning, Some(cause)) => tracing::warn!(%cause, "{message}"),
            (Severity::Error, None) => tracing::error!("{message}"),
            (Severity::Error, Some(cause)) => tracing::error!(%cause, "{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Warning < Severity::Error);
        assert_eq!(Severity::Warning.to_string(), "warning");
    }

    #[test]
    fn test_severity_serde() {
        let json = serde_json::to_string(&Severity::Error).unwrap();
        assert_eq!(json, "\"error\"");
    }

    #[test]
    fn test_tracing_reporter_accepts_causes() {
        let reporter = TracingReporter;
        let cause = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        reporter.warn("skipping unreadable resource");
        reporter.error("load failed", &cause);
    }
}
