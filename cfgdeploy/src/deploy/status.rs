//! Read-only inspection of deployed content and rollouts

use std::time::Duration;

use tracing::info;

use crate::content::diff::{self, DiffResult};
use crate::deploy::poller::{self, RolloutHandle, WaitOutcome};
use crate::deploy::state::WaitTarget;
use crate::errors::{DeployError, StepContext};
use crate::store::{ConfigStore, ResolvedResources, RolloutDetails, RolloutRef};

/// Content of the most recent terminal rollout, if the profile was ever deployed
pub async fn deployed_content(
    store: &dyn ConfigStore,
    resources: &ResolvedResources,
) -> Result<Option<(RolloutRef, Vec<u8>)>, DeployError> {
    let latest = store
        .fetch_latest_terminal_rollout(
            &resources.application_id,
            &resources.environment_id,
            &resources.profile_id,
        )
        .await?;

    let Some(rollout) = latest else {
        return Ok(None);
    };

    let content = store
        .fetch_version_content(
            &resources.application_id,
            &resources.profile_id,
            &rollout.version_id,
        )
        .await?;
    Ok(Some((rollout, content)))
}

/// Diff local content against what is currently deployed.
///
/// A profile with no terminal rollout diffs against an empty document.
pub async fn diff_against_deployed(
    store: &dyn ConfigStore,
    resources: &ResolvedResources,
    local: &[u8],
    source_name: &str,
) -> Result<DiffResult, DeployError> {
    let deployed = deployed_content(store, resources)
        .await
        .step("fetch deployed content")?;

    match deployed {
        Some((rollout, remote)) => {
            info!(
                "Comparing {} with version {} (rollout #{})",
                source_name, rollout.version_id, rollout.rollout_number
            );
            diff::calculate(&remote, local, source_name, resources.profile_kind)
                .step("calculate diff")
        }
        None => {
            info!("No previous rollout found; every line is new");
            diff::calculate_initial(local, source_name, resources.profile_kind)
                .step("calculate diff")
        }
    }
}

/// Describe a rollout, defaulting to the latest one for the profile
pub async fn describe(
    store: &dyn ConfigStore,
    resources: &ResolvedResources,
    rollout_number: Option<u64>,
) -> Result<RolloutDetails, DeployError> {
    match rollout_number {
        Some(number) => store
            .describe_rollout(&resources.application_id, &resources.environment_id, number)
            .await
            .step("describe rollout"),
        None => store
            .latest_rollout(
                &resources.application_id,
                &resources.environment_id,
                &resources.profile_id,
            )
            .await
            .step("describe rollout")?
            .ok_or_else(|| DeployError::NotFound("no rollouts for this profile".to_string())),
    }
}

/// Wait on an existing rollout, e.g. one whose deploy invocation timed out
pub async fn wait(
    store: &dyn ConfigStore,
    resources: &ResolvedResources,
    rollout_number: u64,
    target: WaitTarget,
    timeout: Duration,
    options: &poller::Options,
) -> Result<WaitOutcome, DeployError> {
    let handle = RolloutHandle {
        application_id: resources.application_id.clone(),
        environment_id: resources.environment_id.clone(),
        rollout_number,
    };

    poller::wait_for(store, &handle, target, timeout, options, tokio::time::sleep)
        .await
        .step("wait for rollout")
}
