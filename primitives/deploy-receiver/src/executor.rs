//! Runs a deployment script and reports its progress as GitHub deployment statuses.
//!
//! Layout under the work directory:
//! - `logs/<id>`: script stdout/stderr, published at `/logs/<id>`
//! - `output/<id>[.ext]`: whatever the script writes to `$DEPLOY_OUTPUTFILE`
//! - `data.json`: the active deployment per repository and environment

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use github_deploy::{DeploymentState, DeploymentStatus, StatusClient, Url, parse_api_url};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::settings::{OutputKind, Settings};

/// Everything needed to run one deployment.
#[derive(Debug, Clone)]
pub struct DeploymentContext {
    pub deployment_id: u64,
    pub command: String,
    pub repository: String,
    pub git_ref: String,
    pub environment: String,
    pub auto_inactive: bool,
    pub output: OutputKind,
}

/// Stable file name for a deployment, independent of the raw id.
pub fn internal_deployment_id(repository: &str, environment: &str, deployment_id: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repository.as_bytes());
    hasher.update(environment.as_bytes());
    hasher.update(deployment_id.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEntry {
    pub active: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_url: Option<String>,
}

/// Contents of `data.json`: repository -> environment -> active deployment.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveDeployments(HashMap<String, HashMap<String, ActiveEntry>>);

impl ActiveDeployments {
    /// Reads the ledger, treating a missing file as empty.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    pub fn get(&self, repository: &str, environment: &str) -> Option<&ActiveEntry> {
        self.0.get(repository)?.get(environment)
    }

    /// Records `entry` as active and returns the entry it replaced.
    pub fn replace(
        &mut self,
        repository: &str,
        environment: &str,
        entry: ActiveEntry,
    ) -> Option<ActiveEntry> {
        self.0
            .entry(repository.to_string())
            .or_default()
            .insert(environment.to_string(), entry)
    }
}

pub struct Executor {
    work_dir: PathBuf,
    public_hostname: String,
    api_url: Url,
    // Serialises read-modify-write of data.json.
    ledger: Mutex<()>,
}

impl Executor {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            work_dir: settings.work_dir.clone(),
            public_hostname: settings.public_hostname.trim_end_matches('/').to_string(),
            api_url: parse_api_url(&settings.api_url)?,
            ledger: Mutex::new(()),
        })
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.work_dir.join("logs")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.work_dir.join("output")
    }

    pub fn data_file(&self) -> PathBuf {
        self.work_dir.join("data.json")
    }

    /// Creates `logs/` and `output/`.
    pub fn prepare(&self) -> Result<()> {
        std::fs::create_dir_all(self.logs_dir())?;
        std::fs::create_dir_all(self.output_dir())?;
        Ok(())
    }

    fn log_url(&self, internal_id: &str) -> String {
        format!("{}/logs/{}", self.public_hostname, internal_id)
    }

    /// Runs the deployment to completion and returns the final state reported to GitHub.
    pub async fn run(&self, token: &str, context: &DeploymentContext) -> Result<DeploymentState> {
        let client = StatusClient::new(self.api_url.clone(), token, None)?;
        let internal_id = internal_deployment_id(
            &context.repository,
            &context.environment,
            context.deployment_id,
        );
        let log_path = self.logs_dir().join(&internal_id);
        let log_url = self.log_url(&internal_id);

        let log_file = match create_log(&log_path, context) {
            Ok(file) => file,
            Err(e) => {
                error!(path = %log_path.display(), error = %e, "Cannot create deployment log");
                let status = DeploymentStatus::new(DeploymentState::Error);
                self.report(&client, context, context.deployment_id, &status).await;
                return Ok(DeploymentState::Error);
            }
        };
        info!(deployment_id = context.deployment_id, path = %log_path.display(), "Log file created");

        let in_progress =
            DeploymentStatus::new(DeploymentState::InProgress).with_log_url(log_url.clone());
        self.report(&client, context, context.deployment_id, &in_progress).await;

        let output_path = self.output_dir().join(&internal_id);
        let state = self
            .execute(context, &log_path, log_file, &output_path)
            .await;

        let environment_url = resolve_environment_url(
            context.output,
            &self.output_dir(),
            &output_path,
            &self.public_hostname,
        );

        if context.auto_inactive {
            if let Err(e) = self
                .mark_others_inactive(&client, context, environment_url.clone())
                .await
            {
                error!(error = %e, "Cannot update active deployments");
            }
        }

        let final_status = DeploymentStatus::new(state)
            .with_log_url(log_url)
            .with_environment_url(environment_url);
        self.report(&client, context, context.deployment_id, &final_status).await;

        Ok(state)
    }

    async fn execute(
        &self,
        context: &DeploymentContext,
        log_path: &Path,
        log_file: std::fs::File,
        output_path: &Path,
    ) -> DeploymentState {
        let stderr = match log_file.try_clone() {
            Ok(file) => file,
            Err(e) => {
                error!(error = %e, "Cannot share deployment log with the script");
                return DeploymentState::Error;
            }
        };

        info!(
            repository = %context.repository,
            environment = %context.environment,
            command = %context.command,
            "Executing script"
        );
        let status = Command::new("sh")
            .arg("-c")
            .arg(&context.command)
            .current_dir(&self.work_dir)
            .env("DEPLOY_LOGFILE", absolute(log_path))
            .env("DEPLOY_REF", &context.git_ref)
            .env("DEPLOY_REPOSITORY", &context.repository)
            .env("DEPLOY_ENVIRONMENT", &context.environment)
            .env("DEPLOY_OUTPUTFILE", absolute(output_path))
            .stdin(Stdio::null())
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(stderr))
            .status()
            .await;

        match status {
            Ok(status) if status.success() => DeploymentState::Success,
            Ok(status) => {
                warn!(code = ?status.code(), "Deployment script failed");
                DeploymentState::Failure
            }
            Err(e) => {
                error!(error = %e, "Cannot start deployment script");
                DeploymentState::Error
            }
        }
    }

    /// Retires the previously active deployment of the environment and records this one.
    async fn mark_others_inactive(
        &self,
        client: &StatusClient,
        context: &DeploymentContext,
        environment_url: Option<String>,
    ) -> Result<()> {
        let _guard = self.ledger.lock().await;

        let path = self.data_file();
        let mut ledger = ActiveDeployments::load(&path)?;
        let previous = ledger.replace(
            &context.repository,
            &context.environment,
            ActiveEntry {
                active: context.deployment_id,
                env_url: environment_url,
            },
        );

        if let Some(previous) = previous.filter(|p| p.active != context.deployment_id) {
            let previous_id = internal_deployment_id(
                &context.repository,
                &context.environment,
                previous.active,
            );
            let status = DeploymentStatus::new(DeploymentState::Inactive)
                .with_log_url(self.log_url(&previous_id))
                .with_environment_url(previous.env_url);
            self.report(client, context, previous.active, &status).await;
        }

        ledger.save(&path)
    }

    async fn report(
        &self,
        client: &StatusClient,
        context: &DeploymentContext,
        deployment_id: u64,
        status: &DeploymentStatus,
    ) {
        if let Err(e) = client
            .update(&context.repository, deployment_id, status)
            .await
        {
            error!(deployment_id, state = ?status.state, error = %e, "Cannot set deployment status");
        }
    }
}

fn create_log(path: &Path, context: &DeploymentContext) -> std::io::Result<std::fs::File> {
    let mut file = std::fs::File::create(path)?;
    writeln!(
        file,
        "-- deployment {} of {}@{} to {}",
        context.deployment_id, context.repository, context.git_ref, context.environment
    )?;
    Ok(file)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Derives the `environment_url` from what the script left behind.
pub fn resolve_environment_url(
    output: OutputKind,
    output_dir: &Path,
    output_path: &Path,
    public_hostname: &str,
) -> Option<String> {
    match output {
        OutputKind::None => None,
        OutputKind::File => {
            let stem = output_path.file_name()?;
            let entries = std::fs::read_dir(output_dir).ok()?;
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .find(|path| path.file_stem() == Some(stem))
                .and_then(|path| {
                    path.file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                })
                .map(|name| {
                    format!(
                        "{}/deployments/{}",
                        public_hostname.trim_end_matches('/'),
                        name
                    )
                })
        }
        OutputKind::Url => {
            let raw = std::fs::read_to_string(output_path).ok()?;
            if let Err(e) = std::fs::remove_file(output_path) {
                warn!(error = %e, "Cannot remove deployment output file");
            }
            let url = raw.lines().next().map(str::trim).unwrap_or_default();
            if url.is_empty() {
                warn!("No url, output file empty");
                return None;
            }
            Some(url.to_string())
        }
    }
}
