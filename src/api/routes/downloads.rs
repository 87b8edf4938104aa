//! Download, progress and metadata handlers.

use crate::api::AppState;
use crate::error::Error;
use crate::types::{DownloadRequest, InfoRequest};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /api/download - Download media and wait for the stored file
///
/// Blocks until the engine finishes. Poll `GET /api/progress/{download_id}`
/// from another connection meanwhile; the id is also announced on
/// `GET /api/events` as soon as the job starts.
#[utoipa::path(
    post,
    path = "/api/download",
    tag = "downloads",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Download completed", body = crate::types::DownloadOutcome),
        (status = 400, description = "Missing URL or invalid quality", body = crate::error::ApiError),
        (status = 500, description = "Engine failure, yt-dlp unavailable, or output file missing", body = crate::error::ApiError),
        (status = 503, description = "Service shutting down", body = crate::error::ApiError)
    )
)]
pub async fn start_download(
    State(state): State<AppState>,
    body: Result<Json<DownloadRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return invalid_body(rejection),
    };

    match state.downloader.start_download(request).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/progress/:download_id - Current job state
///
/// Unknown or malformed ids answer 200 with `{"status": "not_found"}`.
#[utoipa::path(
    get,
    path = "/api/progress/{download_id}",
    tag = "downloads",
    params(
        ("download_id" = String, Path, description = "Job id returned by POST /api/download")
    ),
    responses(
        (status = 200, description = "Job state (status not_found for unknown ids)", body = crate::types::JobState)
    )
)]
pub async fn get_progress(
    State(state): State<AppState>,
    Path(download_id): Path<String>,
) -> impl IntoResponse {
    (StatusCode::OK, Json(state.downloader.progress(&download_id)))
}

/// POST /api/info - Probe media metadata without downloading
#[utoipa::path(
    post,
    path = "/api/info",
    tag = "downloads",
    request_body = InfoRequest,
    responses(
        (status = 200, description = "Media metadata", body = crate::types::MediaInfo),
        (status = 400, description = "Missing URL", body = crate::error::ApiError),
        (status = 500, description = "Engine failure or yt-dlp unavailable", body = crate::error::ApiError)
    )
)]
pub async fn get_info(
    State(state): State<AppState>,
    body: Result<Json<InfoRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return invalid_body(rejection),
    };

    match state.downloader.probe(request.url.as_deref()).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => e.into_response(),
    }
}

fn invalid_body(rejection: JsonRejection) -> Response {
    Error::InvalidRequest(format!("invalid request body: {}", rejection.body_text())).into_response()
}
