//! Reconciler: converts provider task state into job state.
//!
//! Safe to run concurrently for the same job, from the owner's status
//! check and from the periodic sweep. Success is idempotent and failure
//! goes through the compare-and-swap in [`Engine::fail_job`].

use chrono::Utc;
use pixora_core::error::CoreError;
use pixora_core::failure_category;
use pixora_core::generation::{is_timed_out, mean_progress, TIMEOUT_ERROR};
use pixora_core::types::DbId;
use pixora_db::models::generation_job::GenerationJob;
use pixora_db::models::status::GenerationStatus;
use pixora_db::repositories::GenerationJobRepo;
use pixora_providers::{PollOutcome, TaskStatus};
use serde::Serialize;

use crate::engine::Engine;
use crate::error::PipelineError;
use crate::settings::LiveSettings;

/// Observed state of a job after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Pending { progress: i16 },
    Completed { images: Vec<String> },
    Failed { error: String },
}

impl JobState {
    /// State as recorded on the row, without contacting the provider.
    pub fn of(job: &GenerationJob) -> Self {
        match job.status() {
            Some(GenerationStatus::Completed) => JobState::Completed {
                images: job.result_urls.0.clone(),
            },
            Some(GenerationStatus::Failed) => JobState::Failed {
                error: job
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "generation failed".to_string()),
            },
            _ => JobState::Pending {
                progress: job.progress,
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Pending { .. })
    }
}

/// Per-handle poll results folded together.
#[derive(Debug, Default)]
struct Aggregate {
    images: Vec<String>,
    succeeded: usize,
    errors: Vec<String>,
    pending: usize,
    progress: Vec<i16>,
}

impl Aggregate {
    fn record(&mut self, outcome: PollOutcome) {
        match outcome.status {
            TaskStatus::Succeeded => {
                self.succeeded += 1;
                self.images.extend(outcome.images);
                self.progress.push(100);
            }
            TaskStatus::Failed(message) => {
                self.errors.push(message);
                self.progress.push(100);
            }
            TaskStatus::Pending => {
                self.pending += 1;
                self.progress.push(outcome.progress);
            }
        }
    }
}

impl Engine {
    /// Reconcile one job by id.
    pub async fn reconcile_by_id(&self, job_id: DbId) -> Result<JobState, PipelineError> {
        let job = GenerationJobRepo::find_by_id(&self.pool, job_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "GenerationJob",
                id: job_id,
            })?;
        self.reconcile(&job).await
    }

    /// Bring a job up to date with its provider.
    ///
    /// - Terminal jobs are returned as stored.
    /// - Jobs past the timeout are failed and refunded.
    /// - Jobs without a task handle are reported pending at 0% without
    ///   any provider call.
    /// - Otherwise every handle is polled concurrently. While any handle
    ///   is pending the job stays pending with the mean progress. Once
    ///   none are, one success is enough to complete the job; if all
    ///   failed, the first error fails it.
    pub async fn reconcile(&self, job: &GenerationJob) -> Result<JobState, PipelineError> {
        if !job.is_pending() {
            return Ok(JobState::of(job));
        }

        if is_timed_out(job.created_at, Utc::now()) {
            tracing::warn!(
                job_id = job.id,
                category = failure_category::TIMEOUT,
                created_at = %job.created_at,
                "Pending job exceeded timeout",
            );
            self.fail_job(job, TIMEOUT_ERROR, failure_category::TIMEOUT).await?;
            return self.reload(job.id).await;
        }

        let handles = &job.task_ids.0;
        if handles.is_empty() {
            return Ok(JobState::Pending { progress: 0 });
        }

        let settings = LiveSettings::load(&self.pool).await?;
        let provider = match self.providers.build(&settings.provider) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(
                    job_id = job.id,
                    category = failure_category::PROVIDER_POLL_TRANSIENT,
                    error = %e,
                    "Provider unavailable for poll",
                );
                return Ok(JobState::Pending {
                    progress: job.progress,
                });
            }
        };

        let polls = handles.iter().map(|task_id| provider.poll(task_id));
        let results = futures::future::join_all(polls).await;

        let mut agg = Aggregate::default();
        for (task_id, result) in handles.iter().zip(results) {
            match result {
                Ok(outcome) => agg.record(outcome),
                Err(e) if e.is_terminal_poll_failure() => {
                    tracing::warn!(
                        job_id = job.id,
                        task_id = %task_id,
                        category = failure_category::PROVIDER_POLL_TERMINAL,
                        error = %e,
                        "Provider rejected poll",
                    );
                    agg.record(PollOutcome::failed(e.to_string()));
                }
                Err(e) => {
                    tracing::info!(
                        job_id = job.id,
                        task_id = %task_id,
                        category = failure_category::PROVIDER_POLL_TRANSIENT,
                        error = %e,
                        "Poll failed, will retry",
                    );
                    agg.record(PollOutcome::pending(job.progress));
                }
            }
        }

        if agg.pending > 0 {
            let progress = mean_progress(&agg.progress);
            GenerationJobRepo::update_progress(&self.pool, job.id, progress).await?;
            return Ok(JobState::Pending { progress });
        }

        if agg.succeeded > 0 {
            if !agg.errors.is_empty() {
                tracing::warn!(
                    job_id = job.id,
                    succeeded = agg.succeeded,
                    dropped = agg.errors.len(),
                    "Partial success, failed tasks dropped",
                );
            }
            self.complete_job(job.id, &agg.images).await?;
            return self.reload(job.id).await;
        }

        let first_error = agg
            .errors
            .into_iter()
            .next()
            .unwrap_or_else(|| "provider reported failure".to_string());
        self.fail_job(job, &first_error, failure_category::PROVIDER_POLL_TERMINAL)
            .await?;
        self.reload(job.id).await
    }

    async fn reload(&self, job_id: DbId) -> Result<JobState, PipelineError> {
        let job = GenerationJobRepo::find_by_id(&self.pool, job_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "GenerationJob",
                id: job_id,
            })?;
        Ok(JobState::of(&job))
    }
}
