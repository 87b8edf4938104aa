//! System handlers: health check, SSE events, OpenAPI specification.

use crate::api::AppState;
use crate::types::Event;
use axum::{
    Json,
    extract::State,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

/// Events buffered per SSE client
const SSE_BUFFER: usize = 64;

/// Service name reported by the health check
pub const SERVICE_NAME: &str = "Media Downloader API";

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests
    pub status: String,
    /// Service name
    pub service: String,
    /// Crate version
    pub version: String,
    /// Fetch engine name
    pub engine: String,
    /// Whether downloads can currently be served
    pub engine_available: bool,
}

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let capabilities = state.downloader.capabilities();
    Json(HealthResponse {
        status: "healthy".into(),
        service: SERVICE_NAME.into(),
        version: env!("CARGO_PKG_VERSION").into(),
        engine: capabilities.engine,
        engine_available: capabilities.engine_available,
    })
}

/// GET /api/capabilities - Engine and storage details
#[utoipa::path(
    get,
    path = "/api/capabilities",
    tag = "system",
    responses(
        (status = 200, description = "Current capabilities", body = crate::types::Capabilities)
    )
)]
pub async fn get_capabilities(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.downloader.capabilities())
}

/// GET /api/openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/api/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}

/// GET /api/events - Server-sent events stream
///
/// Each SSE event is named after the job event type and carries it as JSON.
/// Slow clients skip events they fell behind on. The stream ends after the
/// `shutdown` event.
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "system",
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream")
    )
)]
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let mut receiver = state.downloader.subscribe();
    let shutdown = state.downloader.shutdown_token();
    let (tx, rx) = tokio::sync::mpsc::channel::<SseEvent>(SSE_BUFFER);

    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                biased;
                received = receiver.recv() => match received {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "SSE client lagged behind");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = shutdown.cancelled() => break,
            };

            let is_shutdown = matches!(event, Event::Shutdown);
            match serde_json::to_string(&event) {
                Ok(json_data) => {
                    let sse = SseEvent::default().event(event_name(&event)).data(json_data);
                    // client disconnected
                    if tx.send(sse).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to serialize event"),
            }

            if is_shutdown {
                break;
            }
        }
    });

    Sse::new(ReceiverStream::new(rx).map(Ok)).keep_alive(KeepAlive::default())
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::Started { .. } => "started",
        Event::Progress { .. } => "progress",
        Event::Processing { .. } => "processing",
        Event::Completed { .. } => "completed",
        Event::Failed { .. } => "failed",
        Event::Swept { .. } => "swept",
        Event::Shutdown => "shutdown",
    }
}
