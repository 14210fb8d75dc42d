//! Deployment orchestration
//!
//! One reconcile runs these steps in order and stops at the first failure:
//! resolve resources, refuse if a rollout is already running, skip when the
//! deployed content already matches, publish a version, start the rollout,
//! then optionally wait for it. Nothing is undone on failure; a version
//! published by a run whose rollout failed to start stays as unused history.
//!
//! The ongoing-rollout check is advisory. Two invocations launched at the same
//! moment can both pass it.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::content::diff::content_changed;
use crate::content::kind::FileKind;
use crate::content::validate::validate_content;
use crate::deploy::poller::{self, RolloutHandle};
use crate::deploy::state::{RolloutState, WaitTarget};
use crate::deploy::status::deployed_content;
use crate::errors::{DeployError, StepContext};
use crate::store::{ConfigStore, ResolvedResources, ResourceNames};

const STEP_RESOLVE: &str = "resolve resources";
const STEP_GUARD: &str = "check ongoing rollout";
const STEP_COMPARE: &str = "compare with deployed version";
const STEP_VALIDATE: &str = "validate content";
const STEP_PUBLISH: &str = "publish version";
const STEP_START: &str = "start rollout";
const STEP_WAIT: &str = "wait for rollout";

/// Everything one reconcile needs
#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub names: ResourceNames,
    /// Local document
    pub content: Vec<u8>,
    /// Where the document came from; its extension picks the default content type
    pub source_path: PathBuf,
    /// Explicit content type for freeform profiles
    pub content_type: Option<String>,
    pub description: Option<String>,
    pub wait: WaitTarget,
    pub timeout: Duration,
    pub force: bool,
}

/// How a reconcile finished
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Deployed content already matches; nothing was published
    SkippedNoChanges,

    /// Rollout started and the wait target was reached
    Awaited {
        version_id: String,
        rollout_number: u64,
        state: RolloutState,
        percentage_complete: f32,
    },

    /// Rollout started, caller chose not to wait
    NotAwaited {
        version_id: String,
        rollout_number: u64,
    },
}

/// Terminal classification of a successful reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Nothing left to do, or the rollout completed
    Completed,
    /// The rollout is still running remotely
    PartiallyCompleted,
}

impl ReconcileOutcome {
    pub fn completion(&self) -> Completion {
        match self {
            ReconcileOutcome::SkippedNoChanges => Completion::Completed,
            ReconcileOutcome::Awaited { state, .. } if *state == RolloutState::Complete => {
                Completion::Completed
            }
            _ => Completion::PartiallyCompleted,
        }
    }

    pub fn rollout_number(&self) -> Option<u64> {
        match self {
            ReconcileOutcome::SkippedNoChanges => None,
            ReconcileOutcome::Awaited { rollout_number, .. }
            | ReconcileOutcome::NotAwaited { rollout_number, .. } => Some(*rollout_number),
        }
    }
}

/// Drives one reconcile against a configuration store
pub struct Orchestrator<'a> {
    store: &'a dyn ConfigStore,
    poller: poller::Options,
}

impl<'a> Orchestrator<'a> {
    pub fn new(store: &'a dyn ConfigStore, poller: poller::Options) -> Self {
        Self { store, poller }
    }

    /// Run every step for one request
    pub async fn reconcile(
        &self,
        request: &ReconcileRequest,
    ) -> Result<ReconcileOutcome, DeployError> {
        info!(
            "Reconciling {}/{} in {}",
            request.names.application,
            request.names.configuration_profile,
            request.names.environment
        );

        let resources = self
            .store
            .resolve_resources(&request.names)
            .await
            .step(STEP_RESOLVE)?;
        let content_type = resources
            .profile_kind
            .resolve_content_type(&request.source_path, request.content_type.as_deref());

        self.guard(&resources).await.step(STEP_GUARD)?;

        if request.force {
            info!("Force enabled; publishing without comparing to the deployed version");
        } else if !self
            .has_changes(&resources, &request.content, &content_type)
            .await
            .step(STEP_COMPARE)?
        {
            info!("No changes detected; skipping deployment");
            return Ok(ReconcileOutcome::SkippedNoChanges);
        }

        validate_content(&request.content, &content_type).step(STEP_VALIDATE)?;

        let version_id = self
            .store
            .publish_version(
                &resources.application_id,
                &resources.profile_id,
                &request.content,
                &content_type,
                request.description.as_deref(),
            )
            .await
            .step(STEP_PUBLISH)?;
        info!("Published version {} ({})", version_id, content_type);

        let rollout_number = self
            .store
            .start_rollout(&resources, &version_id, request.description.as_deref())
            .await
            .step(STEP_START)?;
        info!("Started rollout #{}", rollout_number);

        if request.wait == WaitTarget::None {
            return Ok(ReconcileOutcome::NotAwaited {
                version_id,
                rollout_number,
            });
        }

        let handle = RolloutHandle {
            application_id: resources.application_id.clone(),
            environment_id: resources.environment_id.clone(),
            rollout_number,
        };
        let outcome = poller::wait_for(
            self.store,
            &handle,
            request.wait,
            request.timeout,
            &self.poller,
            tokio::time::sleep,
        )
        .await
        .step(STEP_WAIT)?;

        Ok(ReconcileOutcome::Awaited {
            version_id,
            rollout_number,
            state: outcome.state,
            percentage_complete: outcome.percentage_complete,
        })
    }

    async fn guard(&self, resources: &ResolvedResources) -> Result<(), DeployError> {
        let ongoing = self
            .store
            .has_ongoing_rollout(&resources.application_id, &resources.environment_id)
            .await?;
        if ongoing {
            return Err(DeployError::AlreadyInProgress);
        }
        Ok(())
    }

    /// Compare local content with the last terminal rollout's content
    async fn has_changes(
        &self,
        resources: &ResolvedResources,
        local: &[u8],
        content_type: &str,
    ) -> Result<bool, DeployError> {
        let Some((rollout, remote)) = deployed_content(self.store, resources).await? else {
            info!("No previous rollout found; treating as first deploy");
            return Ok(true);
        };

        let changed = content_changed(
            &remote,
            local,
            FileKind::from_content_type(content_type),
            resources.profile_kind,
        )?;
        info!(
            "Compared with version {} (rollout #{}): {}",
            rollout.version_id,
            rollout.rollout_number,
            if changed { "changed" } else { "unchanged" }
        );
        Ok(changed)
    }
}
