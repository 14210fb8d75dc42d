//! Poller tests, run on a paused clock

mod support;

use std::time::Duration;

use cfgdeploy::content::ConfigurationProfileKind;
use cfgdeploy::deploy::poller::{self, RolloutHandle};
use cfgdeploy::deploy::state::{RolloutState, WaitTarget};
use cfgdeploy::errors::DeployError;

use support::FakeStore;

use RolloutState::*;

const FREEFORM: ConfigurationProfileKind = ConfigurationProfileKind::Freeform;

fn handle() -> RolloutHandle {
    RolloutHandle {
        application_id: "app-1".to_string(),
        environment_id: "env-1".to_string(),
        rollout_number: 2,
    }
}

async fn wait(
    store: &FakeStore,
    target: WaitTarget,
    timeout: Duration,
) -> Result<poller::WaitOutcome, DeployError> {
    poller::wait_for(
        store,
        &handle(),
        target,
        timeout,
        &poller::Options::default(),
        tokio::time::sleep,
    )
    .await
}

#[tokio::test(start_paused = true)]
async fn test_baking_satisfies_wait_for_bake() {
    let store = FakeStore::new(FREEFORM).with_states(&[Deploying, Baking]);

    let outcome = wait(&store, WaitTarget::UntilBaking, Duration::from_secs(60))
        .await
        .unwrap();

    assert_eq!(outcome.state, Baking);
    assert_eq!(outcome.samples, 2);
    assert_eq!(store.samples(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_skipped_baking_still_satisfies_wait_for_bake() {
    let store = FakeStore::new(FREEFORM).with_states(&[Deploying, Complete]);

    let outcome = wait(&store, WaitTarget::UntilBaking, Duration::from_secs(60))
        .await
        .unwrap();

    assert_eq!(outcome.state, Complete);
}

#[tokio::test(start_paused = true)]
async fn test_baking_does_not_satisfy_wait_for_complete() {
    let store = FakeStore::new(FREEFORM).with_states(&[Deploying, Baking]);

    let err = wait(&store, WaitTarget::UntilComplete, Duration::from_secs(12))
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Timeout { last_state: Baking }));
    // Samples at 0s, 5s, 10s and one final sample at the 12s bound
    assert_eq!(store.samples(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_no_samples_after_timeout() {
    let store = FakeStore::new(FREEFORM).with_states(&[Deploying]);

    let err = wait(&store, WaitTarget::UntilComplete, Duration::from_secs(20))
        .await
        .unwrap_err();
    let samples = store.samples();

    tokio::time::sleep(Duration::from_secs(60)).await;

    assert!(matches!(err, DeployError::Timeout { last_state: Deploying }));
    assert_eq!(store.samples(), samples);
}

#[tokio::test(start_paused = true)]
async fn test_zero_timeout_samples_once() {
    let store = FakeStore::new(FREEFORM).with_states(&[Deploying]);

    let err = wait(&store, WaitTarget::UntilBaking, Duration::ZERO)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Timeout { .. }));
    assert_eq!(store.samples(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rollback_stops_polling() {
    let store = FakeStore::new(FREEFORM)
        .with_states(&[Deploying, RolledBack, Complete]);

    let err = wait(&store, WaitTarget::UntilComplete, Duration::from_secs(600))
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::RolledBack { rollout_number: 2 }));
    assert_eq!(store.samples(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_interval_is_respected() {
    let store = FakeStore::new(FREEFORM).with_states(&[Deploying, Deploying, Complete]);
    let options = poller::Options {
        interval: Duration::from_secs(30),
    };
    let started = tokio::time::Instant::now();

    poller::wait_for(
        &store,
        &handle(),
        WaitTarget::UntilComplete,
        Duration::from_secs(600),
        &options,
        tokio::time::sleep,
    )
    .await
    .unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61));
    assert_eq!(store.samples(), 3);
}
