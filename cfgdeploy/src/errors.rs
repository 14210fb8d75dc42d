//! Error types for cfgdeploy

use thiserror::Error;

use crate::deploy::state::RolloutState;

/// Main error type for cfgdeploy
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("Content rejected by the configuration store: {0}")]
    RemoteValidation(String),

    #[error("A rollout is already in progress for this environment")]
    AlreadyInProgress,

    #[error("Timed out waiting for rollout, last observed state {last_state}")]
    Timeout { last_state: RolloutState },

    #[error("Rollout #{rollout_number} was rolled back and needs investigation")]
    RolledBack { rollout_number: u64 },

    #[error("Configuration store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Content too large: {size} bytes exceeds the {limit} byte limit")]
    ContentTooLarge { size: usize, limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{step}: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<DeployError>,
    },
}

impl DeployError {
    /// The underlying error with every step wrapper removed
    pub fn root(&self) -> &DeployError {
        match self {
            DeployError::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether re-running the same invocation could reasonably succeed.
    ///
    /// Nothing inside this crate retries; this only guides the operator.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root(),
            DeployError::RemoteUnavailable(_) | DeployError::Http(_)
        )
    }
}

/// Attach the name of the step that produced an error
pub trait StepContext<T> {
    fn step(self, step: &'static str) -> Result<T, DeployError>;
}

impl<T, E: Into<DeployError>> StepContext<T> for Result<T, E> {
    fn step(self, step: &'static str) -> Result<T, DeployError> {
        self.map_err(|e| DeployError::Step {
            step,
            source: Box::new(e.into()),
        })
    }
}
