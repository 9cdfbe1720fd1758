//! Handlers for the `/generations` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. Users see their
//! own jobs; admins may act on anyone's.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pixora_core::error::CoreError;
use pixora_core::generation::CreateGenerationRequest;
use pixora_core::types::DbId;
use pixora_db::models::generation_job::{GenerationJob, JobListQuery};
use pixora_db::repositories::GenerationJobRepo;
use pixora_pipeline::JobState;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a job by ID and verify the caller owns it (or is admin).
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    job_id: DbId,
    auth: &AuthUser,
    action: &str,
) -> AppResult<GenerationJob> {
    let job = GenerationJobRepo::find_by_id(pool, job_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Generation",
            id: job_id,
        }))?;

    if job.user_id != auth.user_id && !auth.is_admin() {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Cannot {action} another user's generation"
        ))));
    }

    Ok(job)
}

/// Body of `GET /generations/{id}`.
#[derive(Debug, Serialize)]
pub struct GenerationStatusResponse {
    pub job: GenerationJob,
    /// `pending`, `completed` or `failed`.
    pub state: &'static str,
    pub progress: i16,
    pub images: Vec<String>,
    pub error: Option<String>,
}

impl GenerationStatusResponse {
    fn new(job: GenerationJob, state: JobState) -> Self {
        match state {
            JobState::Pending { progress } => Self {
                job,
                state: "pending",
                progress,
                images: Vec::new(),
                error: None,
            },
            JobState::Completed { images } => Self {
                job,
                state: "completed",
                progress: 100,
                images,
                error: None,
            },
            JobState::Failed { error } => Self {
                job,
                state: "failed",
                progress: 100,
                images: Vec::new(),
                error: Some(error),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/generations
///
/// Price and debit the batch, create one job per image, and hand the jobs
/// to the provider in the background. Returns 201 with the job ids.
pub async fn create_generation(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateGenerationRequest>,
) -> AppResult<impl IntoResponse> {
    let batch = state.engine.create(auth.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: batch })))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/v1/generations
///
/// The caller's jobs, newest first. Admins may pass `user_id` to list
/// another user's jobs.
pub async fn list_generations(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let owner = match params.user_id {
        Some(other) if other != auth.user_id => {
            if !auth.is_admin() {
                return Err(AppError::Core(CoreError::Forbidden(
                    "Only admins can list another user's generations".into(),
                )));
            }
            other
        }
        _ => auth.user_id,
    };

    let jobs = GenerationJobRepo::list(&state.pool, Some(owner), &params).await?;
    Ok(Json(DataResponse { data: jobs }))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/generations/{id}
///
/// Reconciles the job against its provider before answering, so polling
/// this endpoint is what advances a job in the common case.
pub async fn get_generation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = find_and_authorize(&state.pool, job_id, &auth, "view").await?;
    let job_state = state.engine.reconcile(&job).await?;

    // Reconciliation may have moved the row on.
    let job = GenerationJobRepo::find_by_id(&state.pool, job_id)
        .await?
        .unwrap_or(job);

    Ok(Json(DataResponse {
        data: GenerationStatusResponse::new(job, job_state),
    }))
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// DELETE /api/v1/generations/{id}
///
/// Only terminal jobs can be deleted. Returns 204 on success, 409 while
/// the job is still pending.
pub async fn delete_generation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let job = find_and_authorize(&state.pool, job_id, &auth, "delete").await?;

    if job.is_pending() {
        return Err(AppError::Core(CoreError::Conflict(
            "Generation is still pending and cannot be deleted".into(),
        )));
    }

    if !GenerationJobRepo::delete_terminal(&state.pool, job_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Generation",
            id: job_id,
        }));
    }

    tracing::info!(job_id, user_id = auth.user_id, "Generation deleted");
    Ok(StatusCode::NO_CONTENT)
}
