//! `deploy <owner/repo> <environment>`
//!
//! Prints the confirmation on stdout when GitHub accepts the deployment. Rejections and
//! transport failures are logged to stderr and leave stdout empty; the exit status stays 0
//! unless `--fail-on-error` is set.

use std::io::IsTerminal;

use clap::Parser;
use github_deploy::cli::classify_parse_error;
use github_deploy::{Args, CONFIRMATION, Config, DeployError, USAGE};
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

async fn run(args: Args) -> i32 {
    let invocation = match args.invocation() {
        Ok(invocation) => invocation,
        Err(e) => {
            println!("{e}");
            return 1;
        }
    };

    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };
    debug!(?config, ?invocation, "Resolved deployment");

    match github_deploy::trigger(&config, &invocation).await {
        Ok(_) => {
            println!("{CONFIRMATION}");
            0
        }
        // Local faults never reach the network.
        Err(e) if !e.is_remote() => {
            eprintln!("{e}");
            1
        }
        Err(e) => {
            if let DeployError::Rejected { status, .. } = &e {
                warn!(
                    repository = %invocation.repository,
                    %status,
                    "Deployment was not accepted"
                );
            } else {
                error!(
                    repository = %invocation.repository,
                    error = %e,
                    "Deployment request failed"
                );
            }

            i32::from(config.fail_on_error)
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let argv: Vec<_> = std::env::args_os().collect();
    let args = match Args::try_parse_from(&argv) {
        Ok(args) => args,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => match classify_parse_error(&e, &argv) {
            DeployError::Usage => {
                warn!("{}", e.to_string().trim_end());
                println!("{USAGE}");
                std::process::exit(1);
            }
            other => {
                eprintln!("{other}");
                std::process::exit(1);
            }
        },
    };

    let code = run(args).await;
    std::process::exit(code);
}
