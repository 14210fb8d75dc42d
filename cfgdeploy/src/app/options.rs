//! Command options

use std::path::PathBuf;
use std::time::Duration;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::deploy::poller;
use crate::deploy::state::WaitTarget;
use crate::errors::DeployError;

/// Default wait bound in seconds
pub const DEFAULT_TIMEOUT_SECS: i64 = 600;

/// Options for a reconcile (`run`)
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Deploy config file
    pub config_path: PathBuf,

    /// Wait until the rollout reaches baking
    pub wait_bake: bool,

    /// Wait until the rollout completes
    pub wait_deploy: bool,

    /// Wait bound in seconds
    pub timeout_secs: i64,

    /// Publish even when nothing changed
    pub force: bool,

    /// Suppress progress output
    pub silent: bool,

    /// Poller options
    pub poller: poller::Options,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            wait_bake: false,
            wait_deploy: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            force: false,
            silent: false,
            poller: poller::Options::default(),
        }
    }
}

impl RunOptions {
    /// Resolve the wait target and bound, rejecting invalid combinations
    pub fn validate(&self) -> Result<(WaitTarget, Duration), DeployError> {
        validate_wait(self.wait_bake, self.wait_deploy, self.timeout_secs)
    }
}

/// Options for `diff`
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Deploy config file
    pub config_path: PathBuf,

    /// Signal differences through the exit code
    pub exit_nonzero: bool,

    /// Suppress progress output
    pub silent: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            exit_nonzero: false,
            silent: false,
        }
    }
}

/// Options for `status`
#[derive(Debug, Clone)]
pub struct StatusOptions {
    /// Deploy config file
    pub config_path: PathBuf,

    /// Rollout to inspect; latest when absent
    pub rollout_number: Option<u64>,

    /// Wait until the rollout reaches baking
    pub wait_bake: bool,

    /// Wait until the rollout completes
    pub wait_deploy: bool,

    /// Wait bound in seconds
    pub timeout_secs: i64,

    /// Poller options
    pub poller: poller::Options,
}

impl Default for StatusOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            rollout_number: None,
            wait_bake: false,
            wait_deploy: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poller: poller::Options::default(),
        }
    }
}

impl StatusOptions {
    /// Resolve the wait target and bound, rejecting invalid combinations
    pub fn validate(&self) -> Result<(WaitTarget, Duration), DeployError> {
        validate_wait(self.wait_bake, self.wait_deploy, self.timeout_secs)
    }
}

/// Options for `get`
#[derive(Debug, Clone)]
pub struct GetOptions {
    /// Deploy config file
    pub config_path: PathBuf,

    /// Write the content here instead of stdout
    pub output: Option<PathBuf>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            output: None,
        }
    }
}

fn validate_wait(
    wait_bake: bool,
    wait_deploy: bool,
    timeout_secs: i64,
) -> Result<(WaitTarget, Duration), DeployError> {
    let target = WaitTarget::from_flags(wait_bake, wait_deploy).map_err(DeployError::Config)?;

    let secs = u64::try_from(timeout_secs).map_err(|_| {
        DeployError::Config(format!("timeout must not be negative, got {}", timeout_secs))
    })?;

    Ok((target, Duration::from_secs(secs)))
}
