use std::fmt;
use std::time::Duration;

use reqwest::Url;
use reqwest::header::HeaderValue;

use crate::cli::Args;
use crate::error::{DeployError, Result};

/// Runtime settings resolved from flags and environment.
#[derive(Clone)]
pub struct Config {
    pub token: String,
    pub api_url: Url,
    pub git_ref: String,
    pub timeout: Option<Duration>,
    pub fail_on_error: bool,
}

impl Config {
    /// Checks the settings that must be present before any request is made.
    pub fn from_args(args: &Args) -> Result<Self> {
        let token = match args.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => {
                return Err(DeployError::Configuration(
                    "no GitHub token provided; set GITHUB_TOKEN or pass --token".to_string(),
                ));
            }
        };

        bearer_header(&token)?;

        let api_url = parse_api_url(&args.api_url)?;

        if args.git_ref.trim().is_empty() {
            return Err(DeployError::Configuration("ref must not be empty".to_string()));
        }

        Ok(Self {
            token,
            api_url,
            git_ref: args.git_ref.clone(),
            timeout: args.timeout.map(Duration::from_secs),
            fail_on_error: args.fail_on_error,
        })
    }
}

/// Builds the `Authorization` value for `token`, marked sensitive.
///
/// Tokens that cannot travel in a header (control characters, non-visible bytes)
/// are a configuration error, caught before any request is attempted.
pub fn bearer_header(token: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
        DeployError::Configuration(
            "GitHub token contains characters that are not allowed in an HTTP header"
                .to_string(),
        )
    })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Parses an http(s) API base URL.
pub fn parse_api_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| DeployError::Configuration(format!("invalid API URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DeployError::Configuration(format!(
            "API URL '{raw}' must use http or https"
        )));
    }
    Ok(url)
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url.as_str())
            .field("git_ref", &self.git_ref)
            .field("timeout", &self.timeout)
            .field("fail_on_error", &self.fail_on_error)
            .finish()
    }
}
