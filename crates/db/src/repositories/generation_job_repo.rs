//! Repository for the `generation_jobs` table.
//!
//! Terminal transitions are conditional updates: a job leaves `pending`
//! at most once, and whoever's `UPDATE ... WHERE status_id = pending`
//! affects the row owns the transition (and the refund that goes with a
//! failure).

use pixora_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::models::generation_job::{GenerationJob, JobListQuery, NewGenerationJob};
use crate::models::status::GenerationStatus;

/// Column list for `generation_jobs` queries.
const COLUMNS: &str = "\
    id, user_id, job_type, prompt, reference_images, model, \
    size_ratio, resolution, explicit_size, quantity, cost, \
    status_id, task_ids, progress, result_urls, error_message, \
    created_at, updated_at, completed_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 20;

/// Provides persistence operations for generation jobs.
pub struct GenerationJobRepo;

impl GenerationJobRepo {
    /// Insert `count` identical pending jobs, one per image, on the given
    /// connection (normally an open transaction).
    pub async fn insert_batch(
        conn: &mut PgConnection,
        input: &NewGenerationJob,
        count: u32,
    ) -> Result<Vec<GenerationJob>, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_jobs \
                (user_id, job_type, prompt, reference_images, model, size_ratio, \
                 resolution, explicit_size, quantity, cost, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1, $9, $10) \
             RETURNING {COLUMNS}"
        );

        let mut jobs = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let job = sqlx::query_as::<_, GenerationJob>(&query)
                .bind(input.user_id)
                .bind(&input.job_type)
                .bind(&input.prompt)
                .bind(Json(&input.reference_images))
                .bind(&input.model)
                .bind(&input.size_ratio)
                .bind(&input.resolution)
                .bind(&input.explicit_size)
                .bind(input.cost)
                .bind(GenerationStatus::Pending.id())
                .fetch_one(&mut *conn)
                .await?;
            jobs.push(job);
        }
        Ok(jobs)
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_jobs WHERE id = $1");
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List jobs, newest first. When `user_id` is `Some`, only that user's
    /// jobs are returned.
    pub async fn list(
        pool: &PgPool,
        user_id: Option<DbId>,
        params: &JobListQuery,
    ) -> Result<Vec<GenerationJob>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);
        let status_id = params
            .status
            .as_deref()
            .and_then(GenerationStatus::from_name)
            .map(GenerationStatus::id);

        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if user_id.is_some() {
            conditions.push(format!("user_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if status_id.is_some() {
            conditions.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM generation_jobs \
             {where_clause} \
             ORDER BY created_at DESC, id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, GenerationJob>(&query);
        if let Some(uid) = user_id {
            q = q.bind(uid);
        }
        if let Some(sid) = status_id {
            q = q.bind(sid);
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Pending jobs, oldest first, for the reconciliation sweep.
    pub async fn list_pending(pool: &PgPool, limit: i64) -> Result<Vec<GenerationJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generation_jobs \
             WHERE status_id = $1 \
             ORDER BY created_at ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(GenerationStatus::Pending.id())
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Record a provider task handle on a still-pending job.
    ///
    /// Returns `false` if the job already reached a terminal state.
    pub async fn attach_task(pool: &PgPool, id: DbId, task_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_jobs \
             SET task_ids = task_ids || jsonb_build_array($2::text) \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(task_id)
        .bind(GenerationStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store advisory progress. Never changes status.
    pub async fn update_progress(pool: &PgPool, id: DbId, progress: i16) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_jobs SET progress = $2 \
             WHERE id = $1 AND status_id = $3 AND progress <> $2",
        )
        .bind(id)
        .bind(progress.clamp(0, 100))
        .bind(GenerationStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a job completed with its result URLs and drop its task handles.
    ///
    /// Re-running on an already completed job rewrites the same data. A
    /// failed job is never resurrected: returns `false` in that case.
    pub async fn complete(pool: &PgPool, id: DbId, result_urls: &[String]) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_jobs \
             SET status_id = $2, progress = 100, result_urls = $3, task_ids = '[]'::jsonb, \
                 error_message = NULL, completed_at = COALESCE(completed_at, NOW()) \
             WHERE id = $1 AND status_id IN ($4, $2)",
        )
        .bind(id)
        .bind(GenerationStatus::Completed.id())
        .bind(Json(result_urls))
        .bind(GenerationStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Compare-and-swap a pending job to failed, dropping its task handles.
    ///
    /// Returns the updated row only if this call performed the transition.
    /// A second concurrent caller gets `None` and must not refund.
    pub async fn fail_if_pending(
        conn: &mut PgConnection,
        id: DbId,
        error: &str,
    ) -> Result<Option<GenerationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs \
             SET status_id = $2, error_message = $3, task_ids = '[]'::jsonb, completed_at = NOW() \
             WHERE id = $1 AND status_id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJob>(&query)
            .bind(id)
            .bind(GenerationStatus::Failed.id())
            .bind(error)
            .bind(GenerationStatus::Pending.id())
            .fetch_optional(&mut *conn)
            .await
    }

    /// Delete a job that has reached a terminal state.
    ///
    /// Returns `false` if the job does not exist or is still pending.
    pub async fn delete_terminal(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM generation_jobs WHERE id = $1 AND status_id <> $2")
            .bind(id)
            .bind(GenerationStatus::Pending.id())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
