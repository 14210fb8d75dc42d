//! Deploy config file (`cfgdeploy.yml`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::store::ResourceNames;

pub const DEFAULT_CONFIG_FILE: &str = "cfgdeploy.yml";

/// What to deploy and where
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Application name
    pub application: String,

    /// Configuration profile name
    pub configuration_profile: String,

    /// Environment name
    pub environment: String,

    /// Deployment strategy name
    #[serde(default = "default_strategy")]
    pub deployment_strategy: String,

    /// Local data file, relative to the config file
    pub data_file: PathBuf,

    /// Content type override for freeform profiles
    #[serde(default)]
    pub content_type: Option<String>,

    /// Description attached to published versions and rollouts
    #[serde(default)]
    pub description: Option<String>,

    /// Remote store connection
    pub store: StoreSettings,
}

fn default_strategy() -> String {
    "AllAtOnce".to_string()
}

/// Remote store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Base URL of the store API
    pub endpoint: String,

    /// Environment variable holding the API token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_token_env() -> String {
    "CFGDEPLOY_TOKEN".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl StoreSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Read the API token from the configured environment variable
    pub fn token(&self) -> Option<SecretString> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.is_empty())
            .map(SecretString::from)
    }
}

impl DeployConfig {
    /// Load and validate a config file, resolving `data_file` against its directory
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DeployError> {
        let path = path.as_ref();
        let mut config: DeployConfig = File::new(path)
            .read_yaml()
            .await
            .map_err(|e| DeployError::Config(format!("{}: {}", path.display(), e)))?;

        if config.data_file.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            config.data_file = base.join(&config.data_file);
        }

        config.validate()?;
        debug!("Loaded deploy config from {}", path.display());
        Ok(config)
    }

    /// Check required fields and the store endpoint
    pub fn validate(&self) -> Result<(), DeployError> {
        let required = [
            ("application", &self.application),
            ("configuration_profile", &self.configuration_profile),
            ("environment", &self.environment),
            ("deployment_strategy", &self.deployment_strategy),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DeployError::Config(format!("{} must not be empty", field)));
            }
        }

        if self.data_file.as_os_str().is_empty() {
            return Err(DeployError::Config("data_file must not be empty".to_string()));
        }

        let endpoint = Url::parse(&self.store.endpoint).map_err(|e| {
            DeployError::Config(format!("store.endpoint '{}': {}", self.store.endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(DeployError::Config(format!(
                "store.endpoint must be an http(s) URL, got '{}'",
                self.store.endpoint
            )));
        }

        Ok(())
    }

    pub fn resource_names(&self) -> ResourceNames {
        ResourceNames {
            application: self.application.clone(),
            configuration_profile: self.configuration_profile.clone(),
            environment: self.environment.clone(),
            deployment_strategy: self.deployment_strategy.clone(),
        }
    }

    /// Name shown in diff headers
    pub fn source_name(&self) -> String {
        self.data_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.data_file.display().to_string())
    }
}
