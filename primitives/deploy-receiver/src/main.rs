use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use deploy_receiver::{AppState, Executor, Settings, router};
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Webhook receiver that runs deployment scripts.
#[derive(Parser, Debug)]
#[command(name = "deploy-receiver", version)]
#[command(about = "Runs deployment scripts for GitHub deployment webhooks")]
struct Args {
    /// Path to the JSON settings file.
    #[arg(env = "DEPLOY_RECEIVER_SETTINGS")]
    settings: PathBuf,

    /// Host to bind to.
    #[arg(long, env = "DEPLOY_RECEIVER_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on. Overrides `port` from the settings file.
    #[arg(short, long, env = "DEPLOY_RECEIVER_PORT")]
    port: Option<u16>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing();

    let settings = match Settings::load(&args.settings) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Unable to load settings: {e}");
            std::process::exit(1);
        }
    };

    let executor = Executor::new(&settings)?;
    if let Err(e) = executor.prepare() {
        eprintln!("Logs or output directory cannot be created: {e}");
        std::process::exit(1);
    }

    // Port 0 picks any free port, as when neither flag nor settings name one.
    let port = args.port.or(settings.port).unwrap_or(0);
    let addr: SocketAddr = format!("{}:{}", args.host, port).parse()?;

    let state = Arc::new(AppState {
        settings,
        executor: Arc::new(executor),
    });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");

    // Set up SIGTERM handler for graceful shutdown
    let mut sigterm = signal(SignalKind::terminate())?;

    let server = axum::serve(listener, app.into_make_service());

    tokio::select! {
        result = server => {
            result?;
        }
        _ = sigterm.recv() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
