//! API models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Paged list envelope returned by every collection endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// Application summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Configuration profile type as reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileType {
    Freeform,
    FeatureFlags,
}

/// Configuration profile summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationProfile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub profile_type: ProfileType,
}

/// Environment summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
}

/// Deployment strategy summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentStrategy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub deployment_duration_minutes: Option<u32>,
    #[serde(default)]
    pub final_bake_time_minutes: Option<u32>,
}

/// Deployment state as reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentState {
    Baking,
    Validating,
    Deploying,
    Complete,
    RollingBack,
    RolledBack,
}

/// Deployment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub deployment_number: u64,
    pub configuration_profile_id: String,
    pub configuration_version: String,
    pub deployment_strategy_id: String,
    pub state: DeploymentState,
    #[serde(default)]
    pub percentage_complete: f32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Start deployment request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartDeploymentRequest {
    pub configuration_profile_id: String,
    pub configuration_version: String,
    pub deployment_strategy_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Hosted version creation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedVersion {
    pub version_number: u64,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}
