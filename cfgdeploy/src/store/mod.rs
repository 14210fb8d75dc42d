//! Remote configuration store boundary

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::content::kind::ConfigurationProfileKind;
use crate::deploy::state::RolloutState;
use crate::errors::DeployError;

/// Human-facing names of the resources a deploy targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    pub application: String,
    pub configuration_profile: String,
    pub environment: String,
    pub deployment_strategy: String,
}

/// Store identifiers for a deploy target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResources {
    pub application_id: String,
    pub profile_id: String,
    pub profile_kind: ConfigurationProfileKind,
    pub environment_id: String,
    pub strategy_id: String,
}

/// A finished rollout and the version it published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutRef {
    pub version_id: String,
    pub rollout_number: u64,
}

/// One poll observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RolloutSnapshot {
    pub state: RolloutState,
    pub percentage_complete: f32,
}

/// Full view of a rollout for status inspection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RolloutDetails {
    pub rollout_number: u64,
    pub profile_id: String,
    pub version_id: String,
    pub strategy_id: String,
    pub state: RolloutState,
    pub percentage_complete: f32,
    pub description: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<store_api::models::Deployment> for RolloutDetails {
    fn from(d: store_api::models::Deployment) -> Self {
        Self {
            rollout_number: d.deployment_number,
            profile_id: d.configuration_profile_id,
            version_id: d.configuration_version,
            strategy_id: d.deployment_strategy_id,
            state: d.state.into(),
            percentage_complete: d.percentage_complete,
            description: d.description,
            started_at: d.started_at,
            completed_at: d.completed_at,
        }
    }
}

/// Operations the deploy core needs from the configuration store.
///
/// Implementations must not retry internally; every call is a single
/// request/response and failures propagate to the caller.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Map resource names to store identifiers
    async fn resolve_resources(
        &self,
        names: &ResourceNames,
    ) -> Result<ResolvedResources, DeployError>;

    /// Whether a non-terminal rollout exists for the environment
    async fn has_ongoing_rollout(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> Result<bool, DeployError>;

    /// Most recent terminal rollout of the profile to the environment
    async fn fetch_latest_terminal_rollout(
        &self,
        application_id: &str,
        environment_id: &str,
        profile_id: &str,
    ) -> Result<Option<RolloutRef>, DeployError>;

    /// Raw content of a published version
    async fn fetch_version_content(
        &self,
        application_id: &str,
        profile_id: &str,
        version_id: &str,
    ) -> Result<Vec<u8>, DeployError>;

    /// Publish new content, returning the new version identifier
    async fn publish_version(
        &self,
        application_id: &str,
        profile_id: &str,
        content: &[u8],
        content_type: &str,
        description: Option<&str>,
    ) -> Result<String, DeployError>;

    /// Start rolling a version out, returning the rollout number
    async fn start_rollout(
        &self,
        resources: &ResolvedResources,
        version_id: &str,
        description: Option<&str>,
    ) -> Result<u64, DeployError>;

    /// Current state of a rollout
    async fn sample_rollout_state(
        &self,
        application_id: &str,
        environment_id: &str,
        rollout_number: u64,
    ) -> Result<RolloutSnapshot, DeployError>;

    /// Full details of a rollout
    async fn describe_rollout(
        &self,
        application_id: &str,
        environment_id: &str,
        rollout_number: u64,
    ) -> Result<RolloutDetails, DeployError>;

    /// Most recent rollout of the profile to the environment, in any state
    async fn latest_rollout(
        &self,
        application_id: &str,
        environment_id: &str,
        profile_id: &str,
    ) -> Result<Option<RolloutDetails>, DeployError>;
}
