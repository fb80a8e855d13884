//! HTTP surface: `POST /deploy` for GitHub hooks, plus the published logs and outputs.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Html,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::executor::{DeploymentContext, Executor};
use crate::settings::Settings;
use crate::signature::{SIGNATURE_HEADER, validate_signature};

pub const EVENT_HEADER: &str = "x-github-event";

/// Shared application state.
pub struct AppState {
    pub settings: Settings,
    pub executor: Arc<Executor>,
}

/// JSON body of every `/deploy` answer.
#[derive(Debug, Serialize)]
pub struct HookReply {
    pub status: u16,
    pub detail: String,
}

fn reply(code: StatusCode, detail: &str) -> (StatusCode, Json<HookReply>) {
    if code.is_success() {
        info!(status = code.as_u16(), "{detail}");
    } else {
        warn!(status = code.as_u16(), "{detail}");
    }
    (
        code,
        Json(HookReply {
            status: code.as_u16(),
            detail: detail.to_string(),
        }),
    )
}

pub fn router(state: Arc<AppState>) -> Router {
    let logs = ServeDir::new(state.executor.logs_dir());
    let outputs = ServeDir::new(state.executor.output_dir());

    Router::new()
        .route("/", get(landing))
        .route("/deploy", post(handle_hook))
        .nest_service("/logs", logs)
        .nest_service("/deployments", outputs)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn landing() -> Html<&'static str> {
    Html(
        "<html><body style=\"font-family: monospace;\"><b>deploy-receiver</b><br>\
         <i>Runs deployment scripts for GitHub deployment events</i></body></html>",
    )
}

/// Handles one webhook delivery.
async fn handle_hook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<HookReply>) {
    info!("Received hook");

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return reply(StatusCode::BAD_REQUEST, "Could not parse json."),
    };

    let Some(event) = headers.get(EVENT_HEADER).and_then(|h| h.to_str().ok()) else {
        return reply(StatusCode::BAD_REQUEST, "Missing X-GitHub-Event header");
    };
    match event {
        "ping" => return reply(StatusCode::OK, "pong"),
        "deployment" => {}
        _ => {
            return reply(
                StatusCode::BAD_REQUEST,
                "This deployment server only supports deployment events",
            );
        }
    }

    let Some(repo_name) = payload
        .pointer("/repository/full_name")
        .and_then(|v| v.as_str())
    else {
        return reply(
            StatusCode::BAD_REQUEST,
            "Could not find repository name in request.",
        );
    };
    let Some(repo) = state.settings.repo(repo_name) else {
        return reply(StatusCode::NOT_FOUND, "Repository not found in settings.");
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    if !validate_signature(&repo.secret, &body, signature) {
        return reply(StatusCode::UNAUTHORIZED, "Invalid signature.");
    }

    let deployment = (
        payload.pointer("/deployment/id").and_then(|v| v.as_u64()),
        payload.pointer("/deployment/ref").and_then(|v| v.as_str()),
        payload
            .pointer("/deployment/environment")
            .and_then(|v| v.as_str()),
    );
    let (Some(deployment_id), Some(git_ref), Some(environment)) = deployment else {
        return reply(StatusCode::BAD_REQUEST, "Invalid deployment payload.");
    };

    let Some(environment_settings) = repo.environments.get(environment) else {
        return reply(StatusCode::NOT_FOUND, "No script for this environment found.");
    };
    let Some(token) = repo.token.clone() else {
        return reply(StatusCode::INTERNAL_SERVER_ERROR, "Don't have a github token");
    };

    let context = DeploymentContext {
        deployment_id,
        command: environment_settings.command.clone(),
        repository: repo_name.to_string(),
        git_ref: git_ref.to_string(),
        environment: environment.to_string(),
        auto_inactive: environment_settings.auto_inactive,
        output: environment_settings.output,
    };

    let executor = Arc::clone(&state.executor);
    tokio::spawn(async move {
        match executor.run(&token, &context).await {
            Ok(state) => info!(
                deployment_id = context.deployment_id,
                state = ?state,
                "Deployment finished"
            ),
            Err(e) => error!(
                deployment_id = context.deployment_id,
                error = %e,
                "Deployment could not run"
            ),
        }
    });

    reply(StatusCode::OK, "Deployment successfully scheduled")
}
