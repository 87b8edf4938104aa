//! REST API server module
//!
//! Exposes the downloader over HTTP: start downloads, poll progress, fetch
//! stored files, probe metadata, and watch job events.

use crate::{Config, MediaDownloader, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Downloads
/// - `POST /api/download` - Download media, respond once the file is stored
/// - `GET /api/progress/:download_id` - Job progress (`not_found` for unknown ids)
/// - `POST /api/info` - Probe metadata without downloading
///
/// ## Files
/// - `GET /api/file/:filename` - Stream a stored file as an attachment
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /api/capabilities` - Engine and storage details
/// - `GET /api/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /api/events` - Server-sent events stream
pub fn create_router(downloader: Arc<MediaDownloader>, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader, config.clone());

    let router = Router::new()
        // Downloads
        .route("/api/download", post(routes::start_download))
        .route("/api/progress/:download_id", get(routes::get_progress))
        .route("/api/info", post(routes::get_info))
        // Files
        .route("/api/file/:filename", get(routes::get_file))
        // System
        .route("/health", get(routes::health_check))
        .route("/api/capabilities", get(routes::get_capabilities))
        .route("/api/openapi.json", get(routes::openapi_spec))
        .route("/api/events", get(routes::event_stream));

    // Swagger UI serves its own copy of the document under /api-docs
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin. All methods and headers are
/// allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the downloader is shut down (graceful: in-flight requests
/// finish) or the listener fails.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, MediaDownloader};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let downloader = Arc::new(MediaDownloader::new((*config).clone()).await?);
///
/// // Blocks until shutdown
/// media_dl::api::start_api_server(downloader, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(downloader: Arc<MediaDownloader>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let shutdown = downloader.shutdown_token();
    let app = create_router(downloader, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(bind_address),
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
