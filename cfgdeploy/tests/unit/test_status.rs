//! Status, diff and deployed-content lookups against an in-memory store

mod support;

use std::path::PathBuf;

use cfgdeploy::app::options::StatusOptions;
use cfgdeploy::app::run::{diff, inspect};
use cfgdeploy::config::{DeployConfig, StoreSettings};
use cfgdeploy::content::ConfigurationProfileKind;
use cfgdeploy::deploy::state::RolloutState;
use cfgdeploy::deploy::status::deployed_content;
use cfgdeploy::errors::DeployError;

use support::{Call, FakeStore};

const FREEFORM: ConfigurationProfileKind = ConfigurationProfileKind::Freeform;

fn config(data_file: PathBuf) -> DeployConfig {
    DeployConfig {
        application: "shop".to_string(),
        configuration_profile: "settings".to_string(),
        environment: "prod".to_string(),
        deployment_strategy: "AllAtOnce".to_string(),
        data_file,
        content_type: None,
        description: None,
        store: StoreSettings {
            endpoint: "https://store.example.com".to_string(),
            token_env: "CFGDEPLOY_TOKEN".to_string(),
            request_timeout_secs: 30,
        },
    }
}

#[tokio::test]
async fn test_status_defaults_to_latest_rollout() {
    let store = FakeStore::new(FREEFORM).with_deployed(br#"{"a":1}"#);

    let report = inspect(&StatusOptions::default(), &config("data.json".into()), &store)
        .await
        .unwrap();

    assert_eq!(report.details.rollout_number, 1);
    assert_eq!(report.details.state, RolloutState::Complete);
    assert!(report.waited.is_none());
    assert_eq!(store.calls(), vec![Call::Resolve, Call::Latest]);
}

#[tokio::test]
async fn test_status_without_rollouts_is_not_found() {
    let store = FakeStore::new(FREEFORM);

    let err = inspect(&StatusOptions::default(), &config("data.json".into()), &store)
        .await
        .unwrap_err();

    assert!(matches!(err.root(), DeployError::NotFound(_)));
}

#[tokio::test(start_paused = true)]
async fn test_status_waits_on_given_rollout() {
    let store =
        FakeStore::new(FREEFORM).with_states(&[RolloutState::Deploying, RolloutState::Complete]);
    let options = StatusOptions {
        rollout_number: Some(5),
        wait_deploy: true,
        ..Default::default()
    };

    let report = inspect(&options, &config("data.json".into()), &store)
        .await
        .unwrap();

    let waited = report.waited.unwrap();
    assert_eq!(waited.state, RolloutState::Complete);
    assert_eq!(waited.samples, 2);
    // Details are re-read after the wait
    assert_eq!(report.details.state, RolloutState::Complete);
    assert_eq!(store.count(|c| matches!(c, Call::Describe(5))), 2);
}

#[tokio::test]
async fn test_status_rejects_exclusive_flags_before_any_call() {
    let store = FakeStore::new(FREEFORM);
    let options = StatusOptions {
        wait_bake: true,
        wait_deploy: true,
        ..Default::default()
    };

    let err = inspect(&options, &config("data.json".into()), &store)
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Config(_)));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_deployed_content_absent_before_first_rollout() {
    let store = FakeStore::new(FREEFORM);

    let deployed = deployed_content(&store, store.resources()).await.unwrap();

    assert!(deployed.is_none());
    assert_eq!(store.calls(), vec![Call::FetchLatest]);
}

#[tokio::test]
async fn test_diff_against_deployed_version() {
    let dir = tempfile::tempdir().unwrap();
    let data_file = dir.path().join("data.json");
    std::fs::write(&data_file, br#"{"k":"new"}"#).unwrap();
    let store = FakeStore::new(FREEFORM).with_deployed(br#"{"k":"old"}"#);

    let result = diff(&config(data_file), &store).await.unwrap();

    assert!(result.has_changes);
    assert!(result.unified_diff.contains("-  \"k\": \"old\""));
    assert!(result.unified_diff.contains("+  \"k\": \"new\""));
    assert_eq!(store.publishes(), 0);
}

#[tokio::test]
async fn test_diff_without_deployed_version_is_all_insertions() {
    let dir = tempfile::tempdir().unwrap();
    let data_file = dir.path().join("data.txt");
    std::fs::write(&data_file, "one\r\ntwo\n\n").unwrap();
    let store = FakeStore::new(FREEFORM);

    let result = diff(&config(data_file), &store).await.unwrap();

    assert!(result.has_changes);
    assert_eq!(result.remote_text, "");
    assert_eq!(result.local_text, "one\ntwo\n");
    assert!(result.unified_diff.lines().all(|l| l.starts_with('+')));
}
