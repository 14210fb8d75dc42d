//! HTTP implementation of the configuration store

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use store_api::models::{
    Application, ConfigurationProfile, Deployment, DeploymentState, DeploymentStrategy,
    Environment, ErrorResponse, HostedVersion, ListResponse, StartDeploymentRequest,
};
use tracing::{debug, error};
use url::Url;

use crate::errors::DeployError;
use crate::store::{
    ConfigStore, ResolvedResources, ResourceNames, RolloutDetails, RolloutRef, RolloutSnapshot,
};

/// Configuration store reached over its REST API
pub struct HttpConfigStore {
    client: Client,
    base_url: String,
    token: Option<SecretString>,
}

impl HttpConfigStore {
    /// Create a new store client
    pub fn new(
        base_url: &str,
        token: Option<SecretString>,
        request_timeout: Duration,
    ) -> Result<Self, DeployError> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, DeployError> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| DeployError::Config(format!("invalid store URL: {}", e)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("X-Request-Id", uuid::Uuid::new_v4().to_string());
        match &self.token {
            Some(token) => request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            ),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DeployError> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| DeployError::RemoteUnavailable(e.to_string()))
    }

    /// Make a GET request and decode a JSON body
    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, DeployError> {
        debug!("GET {}", url);

        let response = self.send(self.client.get(url)).await?;
        let response = check_status(response, "GET", false).await?;
        Ok(response.json().await?)
    }

    /// Make a POST request with a JSON body
    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, DeployError> {
        debug!("POST {}", url);

        let response = self.send(self.client.post(url).json(body)).await?;
        let response = check_status(response, "POST", false).await?;
        Ok(response.json().await?)
    }

    /// Fetch every page of a collection
    async fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, DeployError> {
        let mut items = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut url = self.url(path)?;
            if let Some(token) = &next_token {
                url.query_pairs_mut().append_pair("next_token", token);
            }

            let page: ListResponse<T> = self.get(url).await?;
            items.extend(page.items);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => return Ok(items),
            }
        }
    }

    async fn list_deployments(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> Result<Vec<Deployment>, DeployError> {
        self.list_all(&format!(
            "/applications/{}/environments/{}/deployments",
            application_id, environment_id
        ))
        .await
    }

    async fn get_deployment(
        &self,
        application_id: &str,
        environment_id: &str,
        rollout_number: u64,
    ) -> Result<Deployment, DeployError> {
        let url = self.url(&format!(
            "/applications/{}/environments/{}/deployments/{}",
            application_id, environment_id, rollout_number
        ))?;
        self.get(url).await
    }
}

/// Map a non-success response onto the error taxonomy.
///
/// `validation` marks requests whose 400/422 answers mean the submitted
/// content was rejected.
async fn check_status(
    response: Response,
    method: &str,
    validation: bool,
) -> Result<Response, DeployError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    error!("HTTP {} failed: {} - {}", method, status, message);

    Err(match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY if validation => {
            DeployError::RemoteValidation(message)
        }
        StatusCode::NOT_FOUND => DeployError::NotFound(message),
        StatusCode::CONFLICT => DeployError::AlreadyInProgress,
        _ => DeployError::RemoteUnavailable(format!("{}: {}", status, message)),
    })
}

/// Whether the store has finished with a deployment.
///
/// Judged on the wire state: a deployment that is still rolling back is
/// unresolved, even though a waiting caller already treats it as failed.
fn is_settled(state: DeploymentState) -> bool {
    matches!(state, DeploymentState::Complete | DeploymentState::RolledBack)
}

fn any_unsettled(deployments: &[Deployment]) -> bool {
    deployments.iter().any(|d| !is_settled(d.state))
}

fn latest_settled(deployments: Vec<Deployment>, profile_id: &str) -> Option<RolloutRef> {
    deployments
        .into_iter()
        .filter(|d| d.configuration_profile_id == profile_id && is_settled(d.state))
        .max_by_key(|d| d.deployment_number)
        .map(|d| RolloutRef {
            version_id: d.configuration_version,
            rollout_number: d.deployment_number,
        })
}

/// Pick the single entry whose name matches
fn find_by_name<'a, T>(
    items: &'a [T],
    name: &str,
    kind: &str,
    name_of: impl Fn(&T) -> &str,
) -> Result<&'a T, DeployError> {
    let mut matches = items.iter().filter(|item| name_of(item) == name);
    match (matches.next(), matches.next()) {
        (Some(item), None) => Ok(item),
        (None, _) => Err(DeployError::NotFound(format!("{} '{}'", kind, name))),
        (Some(_), Some(_)) => Err(DeployError::Config(format!(
            "{} name '{}' is ambiguous",
            kind, name
        ))),
    }
}

#[async_trait]
impl ConfigStore for HttpConfigStore {
    async fn resolve_resources(
        &self,
        names: &ResourceNames,
    ) -> Result<ResolvedResources, DeployError> {
        let applications: Vec<Application> = self.list_all("/applications").await?;
        let application = find_by_name(&applications, &names.application, "application", |a| {
            a.name.as_str()
        })?;

        let profiles: Vec<ConfigurationProfile> = self
            .list_all(&format!(
                "/applications/{}/configuration-profiles",
                application.id
            ))
            .await?;
        let profile = find_by_name(
            &profiles,
            &names.configuration_profile,
            "configuration profile",
            |p| p.name.as_str(),
        )?;

        let environments: Vec<Environment> = self
            .list_all(&format!("/applications/{}/environments", application.id))
            .await?;
        let environment = find_by_name(&environments, &names.environment, "environment", |e| {
            e.name.as_str()
        })?;

        let strategies: Vec<DeploymentStrategy> =
            self.list_all("/deployment-strategies").await?;
        let strategy = find_by_name(
            &strategies,
            &names.deployment_strategy,
            "deployment strategy",
            |s| s.name.as_str(),
        )?;

        Ok(ResolvedResources {
            application_id: application.id.clone(),
            profile_id: profile.id.clone(),
            profile_kind: profile.profile_type.into(),
            environment_id: environment.id.clone(),
            strategy_id: strategy.id.clone(),
        })
    }

    async fn has_ongoing_rollout(
        &self,
        application_id: &str,
        environment_id: &str,
    ) -> Result<bool, DeployError> {
        let deployments = self.list_deployments(application_id, environment_id).await?;
        Ok(any_unsettled(&deployments))
    }

    async fn fetch_latest_terminal_rollout(
        &self,
        application_id: &str,
        environment_id: &str,
        profile_id: &str,
    ) -> Result<Option<RolloutRef>, DeployError> {
        let deployments = self.list_deployments(application_id, environment_id).await?;
        Ok(latest_settled(deployments, profile_id))
    }

    async fn fetch_version_content(
        &self,
        application_id: &str,
        profile_id: &str,
        version_id: &str,
    ) -> Result<Vec<u8>, DeployError> {
        let url = self.url(&format!(
            "/applications/{}/configuration-profiles/{}/hosted-versions/{}",
            application_id, profile_id, version_id
        ))?;
        debug!("GET {}", url);

        let response = self.send(self.client.get(url)).await?;
        let response = check_status(response, "GET", false).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn publish_version(
        &self,
        application_id: &str,
        profile_id: &str,
        content: &[u8],
        content_type: &str,
        description: Option<&str>,
    ) -> Result<String, DeployError> {
        let url = self.url(&format!(
            "/applications/{}/configuration-profiles/{}/hosted-versions",
            application_id, profile_id
        ))?;
        debug!("POST {} ({} bytes, {})", url, content.len(), content_type);

        let mut request = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, content_type)
            .body(content.to_vec());
        if let Some(description) = description {
            request = request.header("Description", description);
        }

        let response = self.send(request).await?;
        let response = check_status(response, "POST", true).await?;
        let version: HostedVersion = response.json().await?;
        Ok(version.version_number.to_string())
    }

    async fn start_rollout(
        &self,
        resources: &ResolvedResources,
        version_id: &str,
        description: Option<&str>,
    ) -> Result<u64, DeployError> {
        let url = self.url(&format!(
            "/applications/{}/environments/{}/deployments",
            resources.application_id, resources.environment_id
        ))?;
        let body = StartDeploymentRequest {
            configuration_profile_id: resources.profile_id.clone(),
            configuration_version: version_id.to_string(),
            deployment_strategy_id: resources.strategy_id.clone(),
            description: description.map(str::to_string),
        };

        let deployment: Deployment = self.post(url, &body).await?;
        Ok(deployment.deployment_number)
    }

    async fn sample_rollout_state(
        &self,
        application_id: &str,
        environment_id: &str,
        rollout_number: u64,
    ) -> Result<RolloutSnapshot, DeployError> {
        let deployment = self
            .get_deployment(application_id, environment_id, rollout_number)
            .await?;
        Ok(RolloutSnapshot {
            state: deployment.state.into(),
            percentage_complete: deployment.percentage_complete,
        })
    }

    async fn describe_rollout(
        &self,
        application_id: &str,
        environment_id: &str,
        rollout_number: u64,
    ) -> Result<RolloutDetails, DeployError> {
        let deployment = self
            .get_deployment(application_id, environment_id, rollout_number)
            .await?;
        Ok(deployment.into())
    }

    async fn latest_rollout(
        &self,
        application_id: &str,
        environment_id: &str,
        profile_id: &str,
    ) -> Result<Option<RolloutDetails>, DeployError> {
        let deployments = self.list_deployments(application_id, environment_id).await?;
        Ok(deployments
            .into_iter()
            .filter(|d| d.configuration_profile_id == profile_id)
            .max_by_key(|d| d.deployment_number)
            .map(RolloutDetails::from))
    }
}
