//! Generation job entity and DTOs.

use pixora_core::types::{DbId, Points, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use super::status::{GenerationStatus, StatusId};

/// A row from the `generation_jobs` table. One row is one image.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationJob {
    pub id: DbId,
    pub user_id: DbId,
    pub job_type: String,
    pub prompt: String,
    pub reference_images: Json<Vec<String>>,
    pub model: String,
    pub size_ratio: Option<String>,
    pub resolution: String,
    pub explicit_size: Option<String>,
    pub quantity: i16,
    /// Points charged for this job; refunded in full on failure.
    pub cost: Points,
    pub status_id: StatusId,
    /// Provider task handles; empty until a submit-and-poll provider accepts the job.
    pub task_ids: Json<Vec<String>>,
    /// Advisory progress, 0-100.
    pub progress: i16,
    pub result_urls: Json<Vec<String>>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl GenerationJob {
    pub fn status(&self) -> Option<GenerationStatus> {
        GenerationStatus::from_id(self.status_id)
    }

    pub fn is_pending(&self) -> bool {
        self.status_id == GenerationStatus::Pending.id()
    }
}

/// Insert DTO shared by every job of one batch.
#[derive(Debug, Clone)]
pub struct NewGenerationJob {
    pub user_id: DbId,
    pub job_type: String,
    pub prompt: String,
    pub reference_images: Vec<String>,
    pub model: String,
    pub size_ratio: Option<String>,
    pub resolution: String,
    pub explicit_size: Option<String>,
    /// Per-job cost (batch cost divided by quantity).
    pub cost: Points,
}

/// Query parameters for `GET /api/v1/generations`.
#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    /// Filter by status name (`pending`, `completed`, `failed`).
    pub status: Option<String>,
    /// Admin only: list another user's jobs.
    pub user_id: Option<DbId>,
    /// Maximum number of results. Defaults to 20, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}
