use std::ffi::OsString;

use clap::Parser;
use clap::builder::BoolishValueParser;
use clap::error::ContextKind;
use tracing::warn;

use crate::error::{DeployError, Result};

/// Triggers a GitHub deployment for a repository and environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "deploy", version)]
#[command(about = "Asks GitHub to deploy a ref of a repository to an environment")]
pub struct Args {
    /// Repository to deploy, as `owner/name`.
    #[arg(value_name = "OWNER/REPO")]
    pub repository: Option<String>,

    /// Target environment (e.g. "production", "staging").
    #[arg(value_name = "ENVIRONMENT")]
    pub environment: Option<String>,

    #[arg(hide = true)]
    pub extra: Vec<String>,

    /// GitHub token sent as a bearer credential.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Base URL of the GitHub REST API.
    #[arg(long, env = "DEPLOY_API_URL", default_value = crate::deployment::DEFAULT_API_URL)]
    pub api_url: String,

    /// Source reference to deploy.
    #[arg(long = "ref", env = "DEPLOY_REF", default_value = crate::deployment::DEFAULT_REF)]
    pub git_ref: String,

    /// Request timeout in seconds. No timeout when unset.
    #[arg(long, env = "DEPLOY_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Exit with status 1 when the deployment was not accepted.
    #[arg(long, env = "DEPLOY_FAIL_ON_ERROR", value_parser = BoolishValueParser::new())]
    pub fail_on_error: bool,
}

/// The two positional inputs of a deploy run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub repository: String,
    pub environment: String,
}

impl Args {
    /// Extracts the repository and environment, failing with a usage error if either is missing.
    pub fn invocation(&self) -> Result<Invocation> {
        let (Some(repository), Some(environment)) = (&self.repository, &self.environment) else {
            return Err(DeployError::Usage);
        };

        if !self.extra.is_empty() {
            warn!(ignored = ?self.extra, "Ignoring extra positional arguments");
        }

        Ok(Invocation {
            repository: repository.clone(),
            environment: environment.clone(),
        })
    }
}

/// Sorts a clap parse failure into a usage error or a configuration error.
///
/// A bad value for an option that is absent from `argv` came from its environment
/// variable, so the command line itself was fine.
pub fn classify_parse_error(err: &clap::Error, argv: &[OsString]) -> DeployError {
    let Some(flag) = err.get(ContextKind::InvalidArg).and_then(|arg| {
        arg.to_string()
            .split_whitespace()
            .next()
            .filter(|name| name.starts_with("--"))
            .map(str::to_string)
    }) else {
        return DeployError::Usage;
    };

    let on_command_line = argv.iter().any(|arg| {
        let arg = arg.to_string_lossy();
        arg == flag || arg.starts_with(&format!("{flag}="))
    });
    if on_command_line {
        return DeployError::Usage;
    }

    let detail = err.to_string();
    let detail = detail
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches("error: ");
    DeployError::Configuration(format!("{detail} (set through the environment)"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_two_positionals_make_an_invocation() {
        let args = Args::try_parse_from(["deploy", "acme/widgets", "production"]).unwrap();
        let invocation = args.invocation().unwrap();

        assert_eq!(invocation.repository, "acme/widgets");
        assert_eq!(invocation.environment, "production");
    }

    #[test]
    fn test_missing_positionals_are_a_usage_error() {
        for argv in [vec!["deploy"], vec!["deploy", "acme/widgets"]] {
            let args = Args::try_parse_from(argv).unwrap();
            assert!(matches!(args.invocation(), Err(DeployError::Usage)));
        }
    }

    #[test]
    fn test_extra_positionals_are_ignored() {
        let args =
            Args::try_parse_from(["deploy", "acme/widgets", "staging", "leftover"]).unwrap();
        let invocation = args.invocation().unwrap();

        assert_eq!(invocation.environment, "staging");
        assert_eq!(args.extra, vec!["leftover".to_string()]);
    }

    #[test]
    fn test_defaults() {
        let command = Args::command();
        let default_of = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .unwrap()
                .get_default_values()
                .iter()
                .map(|v| v.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
        };

        assert_eq!(default_of("api_url"), vec!["https://api.github.com"]);
        assert_eq!(default_of("git_ref"), vec!["master"]);
        assert!(default_of("timeout").is_empty());
    }

    #[test]
    fn test_fail_on_error_accepts_boolish_values() {
        use clap::builder::TypedValueParser;

        let command = Args::command();
        let parser = BoolishValueParser::new();
        for (raw, expected) in [("1", true), ("yes", true), ("0", false), ("off", false)] {
            let parsed = parser
                .parse_ref(&command, None, std::ffi::OsStr::new(raw))
                .unwrap();
            assert_eq!(parsed, expected, "{raw}");
        }
    }

    #[test]
    fn test_bad_flag_value_on_command_line_is_usage() {
        let argv: Vec<OsString> = ["deploy", "--timeout", "soon", "a/b", "c"]
            .into_iter()
            .map(OsString::from)
            .collect();
        let err = Args::try_parse_from(&argv).unwrap_err();

        assert!(matches!(
            classify_parse_error(&err, &argv),
            DeployError::Usage
        ));
    }

    #[test]
    fn test_bad_value_without_flag_is_configuration() {
        let argv: Vec<OsString> = ["deploy", "--timeout", "soon", "a/b", "c"]
            .into_iter()
            .map(OsString::from)
            .collect();
        let err = Args::try_parse_from(&argv).unwrap_err();

        // Same error, but the flag is not on the command line being classified.
        let without_flag: Vec<OsString> = ["deploy", "a/b", "c"]
            .into_iter()
            .map(OsString::from)
            .collect();
        let classified = classify_parse_error(&err, &without_flag);
        assert!(matches!(classified, DeployError::Configuration(_)));
        assert!(classified.to_string().contains("--timeout"));
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "deploy",
            "--token",
            "t0ken",
            "--ref",
            "main",
            "--timeout",
            "15",
            "--fail-on-error",
            "acme/widgets",
            "production",
        ])
        .unwrap();

        assert_eq!(args.token.as_deref(), Some("t0ken"));
        assert_eq!(args.git_ref, "main");
        assert_eq!(args.timeout, Some(15));
        assert!(args.fail_on_error);
    }

    #[test]
    fn test_help_is_not_a_usage_error() {
        let err = Args::try_parse_from(["deploy", "--help"]).unwrap_err();
        assert!(!err.use_stderr());

        let err = Args::try_parse_from(["deploy", "--timeout", "soon", "a/b", "c"]).unwrap_err();
        assert!(err.use_stderr());
    }
}
