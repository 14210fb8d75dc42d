//! Bounded polling of rollout state

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::deploy::state::{RolloutState, RolloutTracker, WaitTarget};
use crate::errors::DeployError;
use crate::store::ConfigStore;

/// Poller options
#[derive(Debug, Clone)]
pub struct Options {
    /// Delay between samples
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

/// Identifies a rollout for sampling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutHandle {
    pub application_id: String,
    pub environment_id: String,
    pub rollout_number: u64,
}

/// Final observation of a successful wait
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitOutcome {
    pub state: RolloutState,
    pub percentage_complete: f32,
    pub samples: u32,
}

/// Sample a rollout until it reaches `target`, rolls back, or `timeout` elapses.
///
/// The wait is local only: timing out does not stop the remote rollout.
pub async fn wait_for<S, F>(
    store: &dyn ConfigStore,
    handle: &RolloutHandle,
    target: WaitTarget,
    timeout: Duration,
    options: &Options,
    sleep_fn: S,
) -> Result<WaitOutcome, DeployError>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!(
        "Waiting for rollout #{} ({:?}, timeout {:?})",
        handle.rollout_number, target, timeout
    );

    let started = Instant::now();
    let mut tracker = RolloutTracker::new();
    let mut last_percentage: Option<f32> = None;
    let mut samples = 0;

    loop {
        let snapshot = store
            .sample_rollout_state(
                &handle.application_id,
                &handle.environment_id,
                handle.rollout_number,
            )
            .await?;
        samples += 1;

        match tracker.observe(snapshot.state) {
            Ok(true) => info!(
                "Rollout #{}: {} ({:.0}%)",
                handle.rollout_number, snapshot.state, snapshot.percentage_complete
            ),
            Ok(false) if last_percentage != Some(snapshot.percentage_complete) => info!(
                "Rollout #{}: {} ({:.0}%)",
                handle.rollout_number, snapshot.state, snapshot.percentage_complete
            ),
            Ok(false) => debug!("Rollout #{} unchanged", handle.rollout_number),
            Err(e) => warn!("Rollout #{}: {}", handle.rollout_number, e),
        }
        last_percentage = Some(snapshot.percentage_complete);

        if snapshot.state == RolloutState::RolledBack {
            return Err(DeployError::RolledBack {
                rollout_number: handle.rollout_number,
            });
        }

        if target.is_satisfied_by(snapshot.state) {
            return Ok(WaitOutcome {
                state: snapshot.state,
                percentage_complete: snapshot.percentage_complete,
                samples,
            });
        }

        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return Err(DeployError::Timeout {
                last_state: snapshot.state,
            });
        }

        sleep_fn(options.interval.min(timeout - elapsed)).await;
    }
}
