//! Stored file retrieval.

use crate::api::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// GET /api/file/:filename - Stream a stored file as an attachment
#[utoipa::path(
    get,
    path = "/api/file/{filename}",
    tag = "files",
    params(
        ("filename" = String, Path, description = "File name returned by POST /api/download")
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 400, description = "Filename escapes the storage area", body = crate::error::ApiError),
        (status = 404, description = "File not found (never stored or already swept)", body = crate::error::ApiError)
    )
)]
pub async fn get_file(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    let stored = match state.downloader.open_file(&filename).await {
        Ok(stored) => stored,
        Err(e) => return e.into_response(),
    };

    tracing::debug!(%filename, len = stored.len, "streaming stored file");

    let mut response = Response::new(Body::from_stream(ReaderStream::new(stored.file)));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&filename)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(stored.len));
    if let Ok(disposition) = HeaderValue::from_str(&attachment_disposition(&filename)) {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    response.into_response()
}

/// `attachment; filename="..."` with quotes and backslashes escaped
/// and control characters replaced
fn attachment_disposition(filename: &str) -> String {
    let mut quoted = String::with_capacity(filename.len());
    for c in filename.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            c if c.is_control() => quoted.push('_'),
            c => quoted.push(c),
        }
    }
    format!("attachment; filename=\"{quoted}\"")
}

fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "opus" | "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}
