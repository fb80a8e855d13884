//! GitHub Deploy - Deployment Trigger
//!
//! Asks the GitHub REST API to deploy a ref of a repository to a named environment
//! by sending a single `POST /repos/{owner}/{repo}/deployments`.
//!
//! One invocation sends at most one request. Nothing is sent if the arguments or the
//! configuration are incomplete.
//!
//! # Usage
//!
//! ```bash
//! # Deploy master of acme/widgets to production
//! GITHUB_TOKEN=ghp_... deploy acme/widgets production
//!
//! # Deploy another ref against GitHub Enterprise, failing the process on rejection
//! deploy --ref main --api-url https://ghe.example.com/api/v3 --fail-on-error acme/widgets staging
//! ```

pub mod cli;
pub mod config;
pub mod deployment;
pub mod error;
pub mod status;

pub use cli::{Args, Invocation};
pub use config::{Config, bearer_header, parse_api_url};
pub use deployment::{
    CONFIRMATION, DeployClient, Deployment, DeploymentPayload, DeploymentRequest, trigger,
};
pub use error::{DeployError, Result, USAGE};
pub use reqwest::Url;
pub use status::{DeploymentState, DeploymentStatus, StatusClient};
