//! Runtime holder for one accepted candidate

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::fmt;

use crate::candidate::{Candidate, SourceLocation};
use crate::environment::Environment;
use crate::error::InvalidPluginError;
use crate::loader::PluginInstance;

/// Container state.
///
/// `Created` moves exactly once, to `Loaded` or `Failed`. Both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// Created from a candidate, nothing instantiated yet
    Created,

    /// The plugin instance is attached
    Loaded,

    /// Loading failed, the cause is kept in the container
    Failed,
}

impl ContainerState {
    /// Whether the state can no longer change
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ContainerState::Created)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerState::Created => write!(f, "created"),
            ContainerState::Loaded => write!(f, "loaded"),
            ContainerState::Failed => write!(f, "failed"),
        }
    }
}

/// Holder for an accepted candidate and, once loaded, its plugin instance.
///
/// The instance is owned by the container. The host can read it but never
/// gets mutable access to it.
pub struct Container {
    id: String,
    dialect: String,
    source: SourceLocation,
    metadata: Value,
    state: ContainerState,
    instance: Option<Box<dyn PluginInstance>>,
    dialect_state: Option<Box<dyn Any + Send + Sync>>,
    failure: Option<InvalidPluginError>,
}

impl Container {
    /// Create a container in state `Created` for a candidate
    pub fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id().to_string(),
            dialect: candidate.dialect().to_string(),
            source: candidate.source().clone(),
            metadata: candidate.metadata().clone(),
            state: ContainerState::Created,
            instance: None,
            dialect_state: None,
            failure: None,
        }
    }

    /// Plugin identity, inherited from the candidate
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Dialect of the service owning this container
    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    /// Where the plugin was found
    pub fn source(&self) -> &SourceLocation {
        &self.source
    }

    /// Candidate metadata
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    /// Current state
    pub fn state(&self) -> ContainerState {
        self.state
    }

    /// Whether the plugin instance is attached
    pub fn is_loaded(&self) -> bool {
        self.state == ContainerState::Loaded
    }

    /// The plugin instance, once loaded
    pub fn instance(&self) -> Option<&dyn PluginInstance> {
        self.instance.as_deref()
    }

    /// The plugin instance as its concrete type
    pub fn instance_as<T: Any>(&self) -> Option<&T> {
        self.instance().and_then(|instance| instance.downcast_ref::<T>())
    }

    /// Why loading failed, once failed
    pub fn failure(&self) -> Option<&InvalidPluginError> {
        self.failure.as_ref()
    }

    /// Store dialect-specific state, replacing any previous value
    pub fn set_dialect_state<T: Any + Send + Sync>(&mut self, state: T) {
        self.dialect_state = Some(Box::new(state));
    }

    /// Dialect-specific state of the given type
    pub fn dialect_state<T: Any>(&self) -> Option<&T> {
        self.dialect_state
            .as_deref()
            .and_then(|state| state.downcast_ref::<T>())
    }

    /// Attach the constructed instance: `Created -> Loaded`.
    pub fn attach(&mut self, instance: Box<dyn PluginInstance>) -> Result<(), InvalidPluginError> {
        self.ensure_created()?;
        self.instance = Some(instance);
        self.state = ContainerState::Loaded;
        tracing::debug!(plugin = %self.id, dialect = %self.dialect, "Plugin instance attached");
        Ok(())
    }

    /// Record a load failure: `Created -> Failed`.
    ///
    /// The cause is kept in the container and reported once through the
    /// environment's reporter. Returns the error for propagation. A container
    /// that already left `Created` is left untouched and an `InvalidState`
    /// error is returned instead.
    pub fn fail(&mut self, error: InvalidPluginError, env: &Environment) -> InvalidPluginError {
        if let Err(invalid) = self.ensure_created() {
            return invalid;
        }

        self.state = ContainerState::Failed;
        self.failure = Some(error.clone());
        env.reporter()
            .error(&format!("Failed to load plugin '{}'", self.id), &error);
        error
    }

    fn ensure_created(&self) -> Result<(), InvalidPluginError> {
        if self.state == ContainerState::Created {
            Ok(())
        } else {
            Err(InvalidPluginError::InvalidState {
                plugin: self.id.clone(),
                state: self.state,
            })
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("dialect", &self.dialect)
            .field("source", &self.source)
            .field("state", &self.state)
            .field("instance", &self.instance)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolutionError;
    use crate::testing::CollectingReporter;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Sample;

    fn container() -> Container {
        let candidate = Candidate::new("sample", "memory", SourceLocation::path("/p/sample"));
        Container::from_candidate(&candidate)
    }

    #[test]
    fn test_created_from_candidate() {
        let container = container();
        assert_eq!(container.id(), "sample");
        assert_eq!(container.dialect(), "memory");
        assert_eq!(container.state(), ContainerState::Created);
        assert!(container.instance().is_none());
        assert!(container.failure().is_none());
    }

    #[test]
    fn test_attach_transitions_once() {
        let mut container = container();
        container.attach(Box::new(Sample)).unwrap();

        assert!(container.is_loaded());
        assert!(container.instance_as::<Sample>().is_some());

        let err = container.attach(Box::new(Sample)).unwrap_err();
        assert!(matches!(
            err,
            InvalidPluginError::InvalidState {
                state: ContainerState::Loaded,
                ..
            }
        ));
        assert!(container.is_loaded());
    }

    #[test]
    fn test_fail_preserves_cause_and_reports_once() {
        let reporter = Arc::new(CollectingReporter::new());
        let env = Environment::builder().reporter(reporter.clone()).build();
        let mut container = container();

        let cause = ResolutionError::not_found("sample");
        let err = container.fail(
            InvalidPluginError::missing_entry_point("sample", cause.clone()),
            &env,
        );

        assert!(matches!(err, InvalidPluginError::MissingEntryPoint { .. }));
        assert_eq!(container.state(), ContainerState::Failed);
        assert!(matches!(
            container.failure(),
            Some(InvalidPluginError::MissingEntryPoint { source, .. }) if *source == cause
        ));
        assert_eq!(reporter.len(), 1);

        // Failed is terminal: nothing changes and nothing is reported again.
        let again = container.fail(InvalidPluginError::malformed("sample", "x"), &env);
        assert!(matches!(again, InvalidPluginError::InvalidState { .. }));
        assert!(container.attach(Box::new(Sample)).is_err());
        assert_eq!(container.state(), ContainerState::Failed);
        assert_eq!(reporter.len(), 1);
    }

    #[test]
    fn test_dialect_state() {
        let mut container = container();
        container.set_dialect_state(String::from("com.example.Main"));

        assert_eq!(
            container.dialect_state::<String>().map(String::as_str),
            Some("com.example.Main")
        );
        assert!(container.dialect_state::<u32>().is_none());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ContainerState::Created.to_string(), "created");
        assert!(!ContainerState::Created.is_terminal());
        assert!(ContainerState::Loaded.is_terminal());
        assert!(ContainerState::Failed.is_terminal());
    }
}
