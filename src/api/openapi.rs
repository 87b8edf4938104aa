//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the media-dl REST API using
//! utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl REST API
///
/// Served at `/api/openapi.json`, and through Swagger UI at `/swagger-ui`
/// when enabled.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl REST API",
        version = "0.1.0",
        description = "Download video or audio from media pages through yt-dlp, poll progress, and fetch the stored file",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::start_download,
        crate::api::routes::get_progress,
        crate::api::routes::get_info,

        // Files
        crate::api::routes::get_file,

        // System
        crate::api::routes::health_check,
        crate::api::routes::get_capabilities,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(
        schemas(
            crate::types::JobId,
            crate::types::Status,
            crate::types::JobState,
            crate::types::MediaKind,
            crate::types::DownloadRequest,
            crate::types::DownloadOutcome,
            crate::types::InfoRequest,
            crate::types::MediaInfo,
            crate::types::Event,
            crate::types::Capabilities,
            crate::error::ApiError,
            crate::api::routes::HealthResponse,
        )
    ),
    tags(
        (name = "downloads", description = "Start downloads, poll progress, probe metadata"),
        (name = "files", description = "Retrieve stored files"),
        (name = "system", description = "Health, capabilities, events, API documentation")
    )
)]
pub struct ApiDoc;
