//! Job handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use vfetch_models::{Job, JobId, JobStatus};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub id: JobId,
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
}

/// Register a job and start fetching in the background.
pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<CreateJobResponse>)> {
    let id = state.jobs.create_job(&request.url).await?;
    info!(job_id = %id, "Job accepted");

    Ok((
        StatusCode::CREATED,
        Json(CreateJobResponse {
            id,
            status: JobStatus::Processing,
        }),
    ))
}

pub async fn list_jobs(State(state): State<AppState>) -> ApiResult<Json<JobListResponse>> {
    let jobs = state.jobs.list_jobs().await?;
    Ok(Json(JobListResponse { jobs }))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state.jobs.get_job(&JobId::from(id)).await?;
    Ok(Json(job))
}

/// Rotate the job's artifact in place; returns the updated record.
pub async fn rotate_job(
    State(state): State<AppState>,
    Path((id, angle)): Path<(String, String)>,
) -> ApiResult<Json<Job>> {
    let job = state.jobs.rotate(&JobId::from(id), &angle).await?;
    Ok(Json(job))
}
