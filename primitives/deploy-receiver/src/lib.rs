//! Deploy Receiver - GitHub Deployment Webhook Runner
//!
//! Receives `deployment` webhooks from GitHub, checks their HMAC signature, runs the
//! script configured for the repository and environment, and reports the outcome back
//! through deployment statuses (`in_progress`, then `success`/`failure`/`error`).
//!
//! Deployments are usually created with the `deploy` command from `github-deploy`;
//! this is the other end of that exchange.
//!
//! # Usage
//!
//! ```bash
//! # Serve with the port from the settings file (or any free port)
//! deploy-receiver settings.json
//!
//! # Override the port
//! deploy-receiver settings.json --port 9000
//! ```
//!
//! # Script environment
//!
//! - `DEPLOY_LOGFILE` - the deployment log (stdout/stderr already go there)
//! - `DEPLOY_REF` - ref being deployed
//! - `DEPLOY_REPOSITORY` - `owner/name`
//! - `DEPLOY_ENVIRONMENT` - target environment
//! - `DEPLOY_OUTPUTFILE` - where to leave a URL or a file to publish

pub mod error;
pub mod executor;
pub mod settings;
pub mod signature;
pub mod webhook;

pub use error::{ReceiverError, Result};
pub use executor::{DeploymentContext, Executor, internal_deployment_id};
pub use settings::{EnvironmentSettings, OutputKind, RepoSettings, Settings};
pub use webhook::{AppState, router};
