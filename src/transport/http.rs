//! HTTP relay: chat streaming, health check and widget bundle hosting

use crate::agent::ChatAgent;
use crate::config::Config;
use crate::protocol::{to_model_messages, UIStreamEvent, UiMessage, UiStreamEncoder};
use anyhow::Result;
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use super::sse;

/// Agent events buffered between the run task and the response body
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ChatAgent>,
    pub static_dir: PathBuf,
}

/// Errors answered before a stream starts
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Messages array is required")]
    MissingMessages,

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match self {
            RelayError::MissingMessages => StatusCode::BAD_REQUEST,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let mut error = self.to_string();
        if error.is_empty() {
            error = "Internal server error".to_string();
        }
        (status, Json(ErrorBody { error })).into_response()
    }
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Build the relay router
pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/chat", post(handle_chat))
        .nest_service("/cdn", static_files)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn run_http_server(config: &Config, agent: Arc<ChatAgent>) -> Result<()> {
    let state = AppState {
        agent,
        static_dir: config.server.static_dir.clone(),
    };
    tracing::info!("Serving static files from {:?} under /cdn", state.static_dir);

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Relay listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn handle_chat(State(state): State<AppState>, body: Bytes) -> Result<Response, RelayError> {
    let history = parse_history(&body)?;
    tracing::debug!("Chat request with {} messages", history.len());

    let run = state
        .agent
        .clone()
        .begin(to_model_messages(&history))
        .await
        .map_err(|e| {
            tracing::error!("Chat request error: {:#}", e);
            RelayError::Internal(e.to_string())
        })?;

    let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(run.drive(tx));

    let mut encoder = UiStreamEncoder::with_random_id();
    let stream = async_stream::stream! {
        for event in encoder.prologue() {
            yield Ok::<_, Infallible>(sse::frame(&event));
        }
        while let Some(agent_event) = rx.recv().await {
            for event in encoder.on_agent_event(&agent_event) {
                yield Ok(sse::frame(&event));
            }
        }
        // The run task went away without a terminal event
        if !encoder.is_finished() {
            tracing::error!("Agent run ended without finishing the stream");
            yield Ok(sse::frame(&UIStreamEvent::error("Stream ended unexpectedly")));
        }
        yield Ok(sse::done_frame());
    };

    Ok(sse::stream_response(Body::from_stream(stream)))
}

/// Extract the conversation from a request body
///
/// Anything that does not yield a `messages` array is a client error; an
/// array whose entries are not chat messages is an internal error.
fn parse_history(body: &[u8]) -> Result<Vec<UiMessage>, RelayError> {
    let value: serde_json::Value = serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("Rejecting chat request with invalid JSON: {}", e);
        RelayError::MissingMessages
    })?;

    let messages = match value.get("messages") {
        Some(messages @ serde_json::Value::Array(_)) => messages.clone(),
        _ => return Err(RelayError::MissingMessages),
    };

    serde_json::from_value(messages).map_err(|e| {
        tracing::error!("Chat request error: {}", e);
        RelayError::Internal(e.to_string())
    })
}
