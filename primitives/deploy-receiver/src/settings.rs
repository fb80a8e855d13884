//! Settings file: which repositories are accepted and what runs for each environment.
//!
//! ```json
//! {
//!   "public_hostname": "https://deploy.example.com",
//!   "port": 8080,
//!   "repos": [
//!     {
//!       "name": "acme/widgets",
//!       "secret": "webhook-secret",
//!       "token": "ghp_...",
//!       "environments": {
//!         "production": { "command": "./deploy.sh", "auto_inactive": true, "output": "url" }
//!       }
//!     }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use github_deploy::parse_api_url;
use github_deploy::deployment::DEFAULT_API_URL;
use serde::Deserialize;

use crate::error::{ReceiverError, Result};

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Base URL under which `/logs` and `/deployments` are reachable from outside.
    pub public_hostname: String,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Holds `logs/`, `output/` and `data.json`.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    #[serde(default)]
    pub repos: Vec<RepoSettings>,
}

#[derive(Clone, Deserialize)]
pub struct RepoSettings {
    /// `owner/name`, matched against `repository.full_name` of the hook.
    pub name: String,
    pub secret: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentSettings {
    /// Shell command run through `sh -c`.
    pub command: String,
    /// Mark the previous deployment of this environment inactive once this one finishes.
    #[serde(default)]
    pub auto_inactive: bool,
    #[serde(default)]
    pub output: OutputKind,
}

/// What the script leaves in `$DEPLOY_OUTPUTFILE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    None,
    /// A file (any extension) published under `/deployments/`.
    File,
    /// The environment URL on the first line.
    Url,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ReceiverError::Settings(format!(
                "failed to read settings file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(raw)
            .map_err(|e| ReceiverError::Settings(format!("failed to parse settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        parse_api_url(&self.api_url)?;
        if self.public_hostname.trim().is_empty() {
            return Err(ReceiverError::Settings(
                "public_hostname must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn repo(&self, name: &str) -> Option<&RepoSettings> {
        self.repos.iter().find(|repo| repo.name == name)
    }
}

impl fmt::Debug for RepoSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoSettings")
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("environments", &self.environments)
            .finish()
    }
}
