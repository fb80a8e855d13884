//! Deployment status updates.
//!
//! `POST /repos/{owner}/{repo}/deployments/{id}/statuses` moves a deployment through
//! `in_progress` to `success`/`failure`, or retires it as `inactive`.

use std::time::Duration;

use reqwest::{Client, Url, header};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::bearer_header;
use crate::deployment::github_client;
use crate::error::{DeployError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    Error,
    Failure,
    Inactive,
    InProgress,
    Queued,
    Pending,
    Success,
}

/// Body of a status update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentStatus {
    pub state: DeploymentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_url: Option<String>,
}

impl DeploymentStatus {
    pub fn new(state: DeploymentState) -> Self {
        Self {
            state,
            log_url: None,
            environment_url: None,
        }
    }

    pub fn with_log_url(mut self, log_url: impl Into<String>) -> Self {
        self.log_url = Some(log_url.into());
        self
    }

    pub fn with_environment_url(mut self, environment_url: Option<String>) -> Self {
        self.environment_url = environment_url;
        self
    }
}

pub fn statuses_url(api_url: &str, repository: &str, deployment_id: u64) -> String {
    format!(
        "{}/repos/{}/deployments/{}/statuses",
        api_url.trim_end_matches('/'),
        repository,
        deployment_id
    )
}

/// Authenticated client for the deployment statuses endpoint.
pub struct StatusClient {
    http: Client,
    authorization: header::HeaderValue,
    api_url: Url,
}

impl StatusClient {
    pub fn new(api_url: Url, token: &str, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            http: github_client(timeout)?,
            authorization: bearer_header(token)?,
            api_url,
        })
    }

    /// Posts one status for `deployment_id`. Non-2xx answers are `DeployError::Rejected`.
    pub async fn update(
        &self,
        repository: &str,
        deployment_id: u64,
        status: &DeploymentStatus,
    ) -> Result<()> {
        let url = statuses_url(self.api_url.as_str(), repository, deployment_id);
        debug!(%url, state = ?status.state, "Posting deployment status");

        let response = self
            .http
            .post(&url)
            .header(header::AUTHORIZATION, self.authorization.clone())
            .json(status)
            .send()
            .await?;

        let code = response.status();
        if !code.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeployError::Rejected { status: code, body });
        }

        info!(%repository, deployment_id, state = ?status.state, "Deployment status updated");
        Ok(())
    }
}
