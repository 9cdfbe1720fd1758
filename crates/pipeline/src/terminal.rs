//! The two terminal transitions of a job.
//!
//! Success mirrors the images and writes `completed`; it may run more
//! than once but never overwrites `failed`. Failure is a compare-and-swap
//! from `pending` to `failed`, and the refund is written in the same
//! transaction only when the swap took effect.

use pixora_core::generation::truncate_error;
use pixora_core::types::DbId;
use pixora_db::models::generation_job::GenerationJob;
use pixora_db::models::point_transaction::CreditEntry;
use pixora_db::repositories::{GenerationJobRepo, LedgerRepo};

use crate::engine::Engine;
use crate::error::PipelineError;

impl Engine {
    /// Mirror `images` and mark the job completed.
    ///
    /// Returns `false` if the job had already failed; its late result is
    /// discarded.
    pub(crate) async fn complete_job(
        &self,
        job_id: DbId,
        images: &[String],
    ) -> Result<bool, PipelineError> {
        let urls = self.mirror.persist(images, job_id).await;
        let written = GenerationJobRepo::complete(&self.pool, job_id, &urls).await?;
        if written {
            tracing::info!(job_id, images = urls.len(), "Generation completed");
        } else {
            tracing::warn!(job_id, "Result arrived after job reached failed, discarding");
        }
        Ok(written)
    }

    /// Fail a pending job and refund its cost.
    ///
    /// Returns `true` only for the caller whose update performed the
    /// transition. Everyone else gets `false` and nothing is refunded.
    pub(crate) async fn fail_job(
        &self,
        job: &GenerationJob,
        error: &str,
        category: &'static str,
    ) -> Result<bool, PipelineError> {
        let message = truncate_error(error);

        let mut tx = self.pool.begin().await?;
        let Some(failed) = GenerationJobRepo::fail_if_pending(&mut tx, job.id, &message).await?
        else {
            tracing::debug!(job_id = job.id, "Job already terminal, skipping failure path");
            return Ok(false);
        };

        if failed.cost > 0 {
            LedgerRepo::credit_in(
                &mut tx,
                &CreditEntry::refund(failed.user_id, failed.id, failed.cost),
            )
            .await?;
        }
        tx.commit().await?;

        tracing::warn!(
            job_id = failed.id,
            user_id = failed.user_id,
            category,
            refunded = failed.cost,
            error = %message,
            "Generation failed, points refunded",
        );
        Ok(true)
    }
}
