//! In-memory configuration store for tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use cfgdeploy::content::ConfigurationProfileKind;
use cfgdeploy::deploy::state::RolloutState;
use cfgdeploy::errors::DeployError;
use cfgdeploy::store::{
    ConfigStore, ResolvedResources, ResourceNames, RolloutDetails, RolloutRef, RolloutSnapshot,
};

/// Every store operation the fake saw, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Resolve,
    HasOngoing,
    FetchLatest,
    FetchContent(String),
    Publish { content: Vec<u8>, content_type: String },
    Start(String),
    Sample(u64),
    Describe(u64),
    Latest,
}

pub struct FakeStore {
    resources: ResolvedResources,
    ongoing: bool,
    deployed: Option<(RolloutRef, Vec<u8>)>,
    states: Mutex<VecDeque<RolloutState>>,
    publish_error: Mutex<Option<DeployError>>,
    start_error: Mutex<Option<DeployError>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeStore {
    pub fn new(profile_kind: ConfigurationProfileKind) -> Self {
        Self {
            resources: ResolvedResources {
                application_id: "app-1".to_string(),
                profile_id: "prof-1".to_string(),
                profile_kind,
                environment_id: "env-1".to_string(),
                strategy_id: "strat-1".to_string(),
            },
            ongoing: false,
            deployed: None,
            states: Mutex::new(VecDeque::new()),
            publish_error: Mutex::new(None),
            start_error: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Pretend `content` was deployed as version 1 by rollout #1
    pub fn with_deployed(mut self, content: &[u8]) -> Self {
        self.deployed = Some((
            RolloutRef {
                version_id: "1".to_string(),
                rollout_number: 1,
            },
            content.to_vec(),
        ));
        self
    }

    pub fn with_ongoing_rollout(mut self) -> Self {
        self.ongoing = true;
        self
    }

    /// States returned by successive samples; the last one repeats forever
    pub fn with_states(self, states: &[RolloutState]) -> Self {
        *self.states.lock().unwrap() = states.iter().copied().collect();
        self
    }

    pub fn with_publish_error(self, err: DeployError) -> Self {
        *self.publish_error.lock().unwrap() = Some(err);
        self
    }

    pub fn with_start_error(self, err: DeployError) -> Self {
        *self.start_error.lock().unwrap() = Some(err);
        self
    }

    pub fn resources(&self) -> &ResolvedResources {
        &self.resources
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn publishes(&self) -> usize {
        self.count(|c| matches!(c, Call::Publish { .. }))
    }

    pub fn starts(&self) -> usize {
        self.count(|c| matches!(c, Call::Start(_)))
    }

    pub fn samples(&self) -> usize {
        self.count(|c| matches!(c, Call::Sample(_)))
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_state(&self) -> RolloutState {
        let mut states = self.states.lock().unwrap();
        if states.len() > 1 {
            states.pop_front().unwrap()
        } else {
            states.front().copied().unwrap_or(RolloutState::Deploying)
        }
    }

    fn details(&self, rollout_number: u64, state: RolloutState) -> RolloutDetails {
        RolloutDetails {
            rollout_number,
            profile_id: self.resources.profile_id.clone(),
            version_id: "2".to_string(),
            strategy_id: self.resources.strategy_id.clone(),
            state,
            percentage_complete: if state == RolloutState::Deploying { 50.0 } else { 100.0 },
            description: None,
            started_at: None,
            completed_at: None,
        }
    }
}

#[async_trait]
impl ConfigStore for FakeStore {
    async fn resolve_resources(
        &self,
        _names: &ResourceNames,
    ) -> Result<ResolvedResources, DeployError> {
        self.record(Call::Resolve);
        Ok(self.resources.clone())
    }

    async fn has_ongoing_rollout(
        &self,
        _application_id: &str,
        _environment_id: &str,
    ) -> Result<bool, DeployError> {
        self.record(Call::HasOngoing);
        Ok(self.ongoing)
    }

    async fn fetch_latest_terminal_rollout(
        &self,
        _application_id: &str,
        _environment_id: &str,
        _profile_id: &str,
    ) -> Result<Option<RolloutRef>, DeployError> {
        self.record(Call::FetchLatest);
        Ok(self.deployed.as_ref().map(|(r, _)| r.clone()))
    }

    async fn fetch_version_content(
        &self,
        _application_id: &str,
        _profile_id: &str,
        version_id: &str,
    ) -> Result<Vec<u8>, DeployError> {
        self.record(Call::FetchContent(version_id.to_string()));
        self.deployed
            .as_ref()
            .map(|(_, c)| c.clone())
            .ok_or_else(|| DeployError::NotFound(format!("version {}", version_id)))
    }

    async fn publish_version(
        &self,
        _application_id: &str,
        _profile_id: &str,
        content: &[u8],
        content_type: &str,
        _description: Option<&str>,
    ) -> Result<String, DeployError> {
        self.record(Call::Publish {
            content: content.to_vec(),
            content_type: content_type.to_string(),
        });
        match self.publish_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok("2".to_string()),
        }
    }

    async fn start_rollout(
        &self,
        _resources: &ResolvedResources,
        version_id: &str,
        _description: Option<&str>,
    ) -> Result<u64, DeployError> {
        self.record(Call::Start(version_id.to_string()));
        match self.start_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(2),
        }
    }

    async fn sample_rollout_state(
        &self,
        _application_id: &str,
        _environment_id: &str,
        rollout_number: u64,
    ) -> Result<RolloutSnapshot, DeployError> {
        self.record(Call::Sample(rollout_number));
        let state = self.next_state();
        let details = self.details(rollout_number, state);
        Ok(RolloutSnapshot {
            state,
            percentage_complete: details.percentage_complete,
        })
    }

    async fn describe_rollout(
        &self,
        _application_id: &str,
        _environment_id: &str,
        rollout_number: u64,
    ) -> Result<RolloutDetails, DeployError> {
        self.record(Call::Describe(rollout_number));
        let state = self
            .states
            .lock()
            .unwrap()
            .front()
            .copied()
            .unwrap_or(RolloutState::Deploying);
        Ok(self.details(rollout_number, state))
    }

    async fn latest_rollout(
        &self,
        _application_id: &str,
        _environment_id: &str,
        _profile_id: &str,
    ) -> Result<Option<RolloutDetails>, DeployError> {
        self.record(Call::Latest);
        Ok(self
            .deployed
            .as_ref()
            .map(|(r, _)| self.details(r.rollout_number, RolloutState::Complete)))
    }
}
