//! Building and sending the deployment request.

use std::time::Duration;

use reqwest::{Client, StatusCode, header};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::Invocation;
use crate::config::{Config, bearer_header};
use crate::error::{DeployError, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_REF: &str = "master";

/// Printed once the API has accepted the deployment.
pub const CONFIRMATION: &str = "Deployment order was sent";

const USER_AGENT: &str = concat!("github-deploy/", env!("CARGO_PKG_VERSION"));
const GITHUB_JSON: &str = "application/vnd.github+json";

/// JSON body of `POST /repos/{owner}/{repo}/deployments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentPayload {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub environment: String,
}

/// A fully resolved deployment request, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub url: String,
    pub payload: DeploymentPayload,
}

impl DeploymentRequest {
    pub fn new(config: &Config, invocation: &Invocation) -> Self {
        Self {
            url: deployments_url(config.api_url.as_str(), &invocation.repository),
            payload: DeploymentPayload {
                git_ref: config.git_ref.clone(),
                environment: invocation.environment.clone(),
            },
        }
    }
}

/// An accepted deployment.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub url: String,
    pub status: StatusCode,
}

/// Templates the deployments endpoint for a repository onto the API base URL.
pub fn deployments_url(api_url: &str, repository: &str) -> String {
    format!(
        "{}/repos/{}/deployments",
        api_url.trim_end_matches('/'),
        repository
    )
}

/// Client with the headers every GitHub API call from this crate carries.
pub(crate) fn github_client(timeout: Option<Duration>) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static(GITHUB_JSON));

    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| DeployError::Configuration(format!("failed to create HTTP client: {e}")))
}

/// Authenticated client for the deployments endpoint.
pub struct DeployClient {
    http: Client,
    authorization: header::HeaderValue,
}

impl DeployClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: github_client(config.timeout)?,
            authorization: bearer_header(&config.token)?,
        })
    }

    /// Sends the request once. Any non-2xx status is returned as `DeployError::Rejected`.
    pub async fn send(&self, request: &DeploymentRequest) -> Result<Deployment> {
        debug!(
            url = %request.url,
            environment = %request.payload.environment,
            "Sending deployment request"
        );

        let response = self
            .http
            .post(&request.url)
            .header(header::AUTHORIZATION, self.authorization.clone())
            .json(&request.payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(Deployment {
                url: request.url.clone(),
                status,
            });
        }

        // Only kept for diagnostics.
        let body = response.text().await.unwrap_or_default();
        debug!(%status, %body, "Deployment response body");

        Err(DeployError::Rejected { status, body })
    }
}

/// Sends exactly one deployment request for `invocation`.
pub async fn trigger(config: &Config, invocation: &Invocation) -> Result<Deployment> {
    let client = DeployClient::new(config)?;
    let request = DeploymentRequest::new(config, invocation);

    let deployment = client.send(&request).await?;
    info!(
        repository = %invocation.repository,
        environment = %invocation.environment,
        url = %deployment.url,
        status = %deployment.status,
        "Deployment accepted"
    );

    Ok(deployment)
}
