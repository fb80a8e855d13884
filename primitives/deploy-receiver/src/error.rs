use github_deploy::DeployError;

/// Errors raised by the webhook receiver.
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    GitHub(#[from] DeployError),
}

/// Helper type for Results that use ReceiverError
pub type Result<T> = std::result::Result<T, ReceiverError>;
