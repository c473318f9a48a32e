//! HTTP surface for Slack slash commands.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::command::{parse_slash_command, CommandParseError, SlashCommandForm};
use crate::handler::CommandHandler;
use crate::notifier::OutboundMessage;

pub const SLACK_COMMANDS_ENDPOINT: &str = "/slack/commands";
pub const HEALTH_ENDPOINT: &str = "/health";

pub fn build_relay_router(handler: Arc<CommandHandler>) -> Router {
    Router::new()
        .route(SLACK_COMMANDS_ENDPOINT, post(handle_slash_command))
        .route(HEALTH_ENDPOINT, get(handle_health))
        .with_state(handler)
}

/// Serves the relay until Ctrl-C, then waits for in-flight continuations.
pub async fn run_relay_server(bind: &str, handler: Arc<CommandHandler>) -> Result<()> {
    let bind_addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid --bind '{bind}': expected host:port"))?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind relay server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve relay server listen address")?;

    info!(
        addr = %local_addr,
        provider = handler.provider_name(),
        model = handler.model(),
        output_shape = %handler.output_shape(),
        store = handler.store_backend(),
        "relay server listening"
    );

    let app = build_relay_router(Arc::clone(&handler));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await
        .context("relay server exited unexpectedly")?;

    let pending = handler.tasks().pending();
    if pending > 0 {
        info!(pending, "waiting for in-flight research continuations");
    }
    handler.wait_idle().await;
    info!("relay server stopped");
    Ok(())
}

/// Resolves once `signal` fires. A signal that cannot be installed never
/// resolves, so the relay keeps serving instead of exiting at once.
async fn shutdown_on(signal: impl std::future::Future<Output = std::io::Result<()>>) {
    if let Err(error) = signal.await {
        warn!(error = %error, "failed to install ctrl-c handler; relay runs until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn handle_slash_command(
    State(handler): State<Arc<CommandHandler>>,
    Form(form): Form<SlashCommandForm>,
) -> Response {
    match parse_slash_command(&form, handler.alternate_language_token()) {
        Ok(command) => (StatusCode::OK, Json(handler.handle(command))).into_response(),
        Err(CommandParseError::EmptySubject { locale }) => (
            StatusCode::OK,
            Json(OutboundMessage::ephemeral(
                locale.usage_text(form.command_name()),
            )),
        )
            .into_response(),
        Err(error) => {
            warn!(error = %error, "rejected slash command");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": {
                        "code": "invalid_slash_command",
                        "message": error.to_string(),
                    }
                })),
            )
                .into_response()
        }
    }
}

async fn handle_health(State(handler): State<Arc<CommandHandler>>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "provider": handler.provider_name(),
            "model": handler.model(),
            "output_shape": handler.output_shape().as_str(),
            "store": handler.store_backend(),
        })),
    )
        .into_response()
}
