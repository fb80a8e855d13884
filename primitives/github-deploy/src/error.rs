use reqwest::StatusCode;

/// Usage line printed when the positional arguments are missing.
pub const USAGE: &str = "Bad usage. deploy <user/repo> <environment>";

/// Errors raised while triggering a deployment.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("{}", USAGE)]
    Usage,

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The API answered, but not with a 2xx status.
    #[error("Deployment was rejected with status {status}")]
    Rejected { status: StatusCode, body: String },

    /// No HTTP status was received (connect, TLS, timeout, ...).
    #[error("Deployment request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl DeployError {
    /// Whether the error came from the remote call rather than from local validation.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Transport(_))
    }
}

/// Helper type for Results that use DeployError
pub type Result<T> = std::result::Result<T, DeployError>;
