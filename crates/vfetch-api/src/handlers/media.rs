//! Artifact streaming, download and HLS file handlers.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use vfetch_media::content_type_for;
use vfetch_models::JobId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Serve a file with conditional and byte-range handling.
async fn serve(path: &FsPath, request: Request) -> ApiResult<Response> {
    let response = ServeFile::new(path)
        .oneshot(request)
        .await
        .map_err(|e| ApiError::internal(format!("failed to serve file: {}", e)))?;
    Ok(response.map(Body::new))
}

fn set_content_type(response: &mut Response, content_type: &'static str) {
    // Error responses (e.g. 416) carry no body worth typing.
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
}

/// `GET /stream/:id`: the primary artifact, seekable.
pub async fn stream_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    let path = state.jobs.artifact_file(&JobId::from(id)).await?;
    let mut response = serve(&path, request).await?;
    set_content_type(&mut response, "video/mp4");
    Ok(response)
}

/// `GET /download/:id`: the primary artifact as an attachment.
pub async fn download_artifact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    let id = JobId::from(id);
    let path = state.jobs.artifact_file(&id).await?;
    let mut response = serve(&path, request).await?;
    set_content_type(&mut response, "video/mp4");

    let disposition = format!("attachment; filename=\"{}.mp4\"", id);
    let value = HeaderValue::from_str(&disposition)
        .map_err(|_| ApiError::bad_request("job id is not a valid file name"))?;
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, value);

    Ok(response)
}

/// `GET /hls/:id/:file`: playlist or segment from the streaming directory.
pub async fn hls_file(
    State(state): State<AppState>,
    Path((id, file)): Path<(String, String)>,
    request: Request,
) -> ApiResult<Response> {
    let path = state.jobs.streaming_file(&JobId::from(id), &file).await?;
    let mut response = serve(&path, request).await?;
    set_content_type(&mut response, content_type_for(&file));
    Ok(response)
}
