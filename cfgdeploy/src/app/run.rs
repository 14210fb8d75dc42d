//! Command runners
//!
//! Each runner validates its options first, so invalid invocations fail
//! before the config file is read or the store is contacted.

use tracing::info;

use crate::app::options::{DiffOptions, GetOptions, RunOptions, StatusOptions};
use crate::config::DeployConfig;
use crate::content::diff::DiffResult;
use crate::deploy::orchestrator::{Orchestrator, ReconcileOutcome, ReconcileRequest};
use crate::deploy::poller::WaitOutcome;
use crate::deploy::state::WaitTarget;
use crate::deploy::status;
use crate::errors::{DeployError, StepContext};
use crate::filesys::file::File;
use crate::store::http::HttpConfigStore;
use crate::store::{ConfigStore, RolloutDetails};

const STEP_READ: &str = "read data file";

/// Build the HTTP store client for a config
pub fn connect(config: &DeployConfig) -> Result<HttpConfigStore, DeployError> {
    let token = config.store.token();
    if token.is_none() {
        info!(
            "{} is not set; calling the store without credentials",
            config.store.token_env
        );
    }
    HttpConfigStore::new(
        &config.store.endpoint,
        token,
        config.store.request_timeout(),
    )
}

/// Load config, connect and reconcile
pub async fn run_reconcile(options: &RunOptions) -> Result<ReconcileOutcome, DeployError> {
    options.validate()?;
    let config = DeployConfig::load(&options.config_path).await?;
    let store = connect(&config)?;
    reconcile(options, &config, &store).await
}

/// Reconcile the config's data file against a store
pub async fn reconcile(
    options: &RunOptions,
    config: &DeployConfig,
    store: &dyn ConfigStore,
) -> Result<ReconcileOutcome, DeployError> {
    let (wait, timeout) = options.validate()?;
    let content = File::new(&config.data_file)
        .read_bytes()
        .await
        .step(STEP_READ)?;

    let request = ReconcileRequest {
        names: config.resource_names(),
        content,
        source_path: config.data_file.clone(),
        content_type: config.content_type.clone(),
        description: config.description.clone(),
        wait,
        timeout,
        force: options.force,
    };

    Orchestrator::new(store, options.poller.clone())
        .reconcile(&request)
        .await
}

/// Load config, connect and diff
pub async fn run_diff(options: &DiffOptions) -> Result<DiffResult, DeployError> {
    let config = DeployConfig::load(&options.config_path).await?;
    let store = connect(&config)?;
    diff(&config, &store).await
}

/// Diff the config's data file against the deployed version
pub async fn diff(
    config: &DeployConfig,
    store: &dyn ConfigStore,
) -> Result<DiffResult, DeployError> {
    let local = File::new(&config.data_file)
        .read_bytes()
        .await
        .step(STEP_READ)?;
    let resources = store
        .resolve_resources(&config.resource_names())
        .await
        .step("resolve resources")?;

    status::diff_against_deployed(store, &resources, &local, &config.source_name()).await
}

/// Result of a status inspection
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub details: RolloutDetails,
    /// Present when the caller asked to wait
    pub waited: Option<WaitOutcome>,
}

/// Load config, connect and inspect a rollout
pub async fn run_status(options: &StatusOptions) -> Result<StatusReport, DeployError> {
    options.validate()?;
    let config = DeployConfig::load(&options.config_path).await?;
    let store = connect(&config)?;
    inspect(options, &config, &store).await
}

/// Describe a rollout and optionally wait on it
pub async fn inspect(
    options: &StatusOptions,
    config: &DeployConfig,
    store: &dyn ConfigStore,
) -> Result<StatusReport, DeployError> {
    let (wait, timeout) = options.validate()?;
    let resources = store
        .resolve_resources(&config.resource_names())
        .await
        .step("resolve resources")?;

    let details = status::describe(store, &resources, options.rollout_number).await?;
    if wait == WaitTarget::None {
        return Ok(StatusReport {
            details,
            waited: None,
        });
    }

    let waited = status::wait(
        store,
        &resources,
        details.rollout_number,
        wait,
        timeout,
        &options.poller,
    )
    .await?;
    let details = status::describe(store, &resources, Some(details.rollout_number)).await?;

    Ok(StatusReport {
        details,
        waited: Some(waited),
    })
}

/// Fetch the deployed content and print it or write it to a file
pub async fn run_get(options: &GetOptions) -> Result<Vec<u8>, DeployError> {
    let config = DeployConfig::load(&options.config_path).await?;
    let store = connect(&config)?;

    let resources = store
        .resolve_resources(&config.resource_names())
        .await
        .step("resolve resources")?;
    let (rollout, content) = status::deployed_content(&store, &resources)
        .await
        .step("fetch deployed content")?
        .ok_or_else(|| {
            DeployError::NotFound("no finished rollout for this profile".to_string())
        })?;
    info!(
        "Fetched version {} from rollout #{}",
        rollout.version_id, rollout.rollout_number
    );

    if let Some(output) = &options.output {
        File::new(output)
            .write_bytes(&content)
            .await
            .step("write output file")?;
        info!("Wrote {} bytes to {}", content.len(), output.display());
    }
    Ok(content)
}
