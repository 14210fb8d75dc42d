//! Rollout state model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Observable phase of a rollout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutState {
    /// Configuration is being pushed to targets
    Deploying,

    /// Fully pushed, monitoring before completion
    Baking,

    /// Rollout finished successfully
    Complete,

    /// Rollout failed and was reverted
    RolledBack,
}

impl RolloutState {
    /// Whether no further transitions can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, RolloutState::Complete | RolloutState::RolledBack)
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: RolloutState) -> bool {
        matches!(
            (self, next),
            (RolloutState::Deploying, RolloutState::Baking)
                | (RolloutState::Deploying, RolloutState::Complete)
                | (RolloutState::Deploying, RolloutState::RolledBack)
                | (RolloutState::Baking, RolloutState::Complete)
                | (RolloutState::Baking, RolloutState::RolledBack)
        )
    }
}

impl fmt::Display for RolloutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RolloutState::Deploying => "DEPLOYING",
            RolloutState::Baking => "BAKING",
            RolloutState::Complete => "COMPLETE",
            RolloutState::RolledBack => "ROLLED_BACK",
        };
        f.write_str(name)
    }
}

impl From<store_api::models::DeploymentState> for RolloutState {
    fn from(value: store_api::models::DeploymentState) -> Self {
        use store_api::models::DeploymentState;

        match value {
            DeploymentState::Deploying | DeploymentState::Validating => RolloutState::Deploying,
            DeploymentState::Baking => RolloutState::Baking,
            DeploymentState::Complete => RolloutState::Complete,
            DeploymentState::RollingBack | DeploymentState::RolledBack => RolloutState::RolledBack,
        }
    }
}

/// Milestone a caller waits for after starting a rollout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitTarget {
    #[default]
    None,
    UntilBaking,
    UntilComplete,
}

impl WaitTarget {
    /// Build the target from the two mutually exclusive selectors
    pub fn from_flags(until_baking: bool, until_complete: bool) -> Result<Self, String> {
        match (until_baking, until_complete) {
            (true, true) => {
                Err("waiting for baking and for completion are mutually exclusive".to_string())
            }
            (true, false) => Ok(WaitTarget::UntilBaking),
            (false, true) => Ok(WaitTarget::UntilComplete),
            (false, false) => Ok(WaitTarget::None),
        }
    }

    /// Whether an observed state reaches this milestone.
    ///
    /// A fast rollout may never be observed baking, so completion also
    /// satisfies `UntilBaking`.
    pub fn is_satisfied_by(&self, state: RolloutState) -> bool {
        match self {
            WaitTarget::None => true,
            WaitTarget::UntilBaking => {
                matches!(state, RolloutState::Baking | RolloutState::Complete)
            }
            WaitTarget::UntilComplete => state == RolloutState::Complete,
        }
    }
}

/// Tracks observed rollout states and enforces forward-only progression
#[derive(Debug, Clone, Default)]
pub struct RolloutTracker {
    state: Option<RolloutState>,
}

impl RolloutTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last accepted state
    pub fn state(&self) -> Option<RolloutState> {
        self.state
    }

    /// Record an observation.
    ///
    /// Returns `Ok(true)` when the state changed, `Ok(false)` when it repeats
    /// the previous observation, and an error for a backwards or otherwise
    /// impossible move. A rejected observation leaves the tracker unchanged.
    pub fn observe(&mut self, next: RolloutState) -> Result<bool, String> {
        match self.state {
            None => {
                self.state = Some(next);
                Ok(true)
            }
            Some(current) if current == next => Ok(false),
            Some(current) if current.can_transition_to(next) => {
                self.state = Some(next);
                Ok(true)
            }
            Some(current) => Err(format!("Invalid transition: {} -> {}", current, next)),
        }
    }
}
