//! Job intake: price, debit, persist, then dispatch in the background.

use pixora_core::error::CoreError;
use pixora_core::failure_category;
use pixora_core::generation::CreateGenerationRequest;
use pixora_core::pricing;
use pixora_core::types::{DbId, Points};
use pixora_db::models::generation_job::{GenerationJob, NewGenerationJob};
use pixora_db::repositories::{GenerationJobRepo, LedgerRepo};
use pixora_providers::{DispatchOutcome, ProviderSettings};
use serde::Serialize;

use crate::engine::{request_for, Engine};
use crate::error::PipelineError;
use crate::settings::LiveSettings;

/// Result of a successful creation request.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedBatch {
    pub job_ids: Vec<DbId>,
    /// Total points debited for the batch.
    pub cost: Points,
    /// Balance after the debit.
    pub balance: Points,
}

impl Engine {
    /// Create a batch of generation jobs for `user_id`.
    ///
    /// Validation and the balance check happen before anything is
    /// written. The job rows and the debit share one transaction, so
    /// either both exist or neither does. Provider calls run in spawned
    /// tasks and never delay the response.
    pub async fn create(
        &self,
        user_id: DbId,
        request: CreateGenerationRequest,
    ) -> Result<CreatedBatch, PipelineError> {
        let spec = request.into_validated().inspect_err(|e| {
            tracing::info!(user_id, category = failure_category::VALIDATION, error = %e, "Rejected generation request");
        })?;

        let settings = LiveSettings::load(&self.pool).await?;
        let quote = pricing::quote(
            spec.job_type,
            spec.tier,
            spec.quantity,
            Some(&spec.model),
            &settings.prices,
        );

        let available = LedgerRepo::balance(&self.pool, user_id).await?;
        if available < quote.total_cost {
            tracing::info!(
                user_id,
                required = quote.total_cost,
                available,
                category = failure_category::INSUFFICIENT_FUNDS,
                "Rejected generation request",
            );
            return Err(CoreError::InsufficientFunds {
                required: quote.total_cost,
                available,
            }
            .into());
        }

        let new_job = NewGenerationJob {
            user_id,
            job_type: spec.job_type.as_str().to_string(),
            prompt: spec.prompt.clone(),
            reference_images: spec.reference_images.clone(),
            model: spec.model.clone(),
            size_ratio: spec.size_ratio.clone(),
            resolution: spec.tier.as_str().to_string(),
            explicit_size: spec.explicit_size.clone(),
            cost: quote.unit_cost,
        };

        let mut tx = self.pool.begin().await?;
        let jobs = GenerationJobRepo::insert_batch(&mut tx, &new_job, quote.quantity).await?;
        let first_job_id = jobs.first().map(|j| j.id);
        let description = format!(
            "Generation x{} ({}, {})",
            quote.quantity,
            spec.tier.as_str(),
            spec.model
        );
        let entry = LedgerRepo::debit_in(&mut tx, user_id, quote.total_cost, &description, first_job_id)
            .await
            .inspect_err(|e| {
                tracing::warn!(user_id, category = failure_category::LEDGER, error = %e, "Debit failed, batch rolled back");
            })?;
        tx.commit().await?;

        tracing::info!(
            user_id,
            jobs = jobs.len(),
            cost = quote.total_cost,
            balance = entry.balance_after,
            "Generation batch created",
        );

        let job_ids = jobs.iter().map(|j| j.id).collect();
        for job in jobs {
            let engine = self.clone();
            let provider_settings = settings.provider.clone();
            tokio::spawn(async move {
                engine.dispatch_job(job, provider_settings).await;
            });
        }

        Ok(CreatedBatch {
            job_ids,
            cost: quote.total_cost,
            balance: entry.balance_after,
        })
    }

    /// Send one job to the provider and record what came back.
    ///
    /// Every error ends here: a failed job is refunded, a failed write is
    /// logged and left for the reconciler.
    pub async fn dispatch_job(&self, job: GenerationJob, settings: ProviderSettings) {
        let job_id = job.id;
        let outcome = match self.providers.build(&settings) {
            Ok(provider) => provider.dispatch(&request_for(&job)).await,
            Err(e) => Err(e),
        };

        let result = match outcome {
            Ok(DispatchOutcome::Images(images)) => self.complete_job(job_id, &images).await.map(|_| ()),
            Ok(DispatchOutcome::Submitted { task_id }) => {
                match GenerationJobRepo::attach_task(&self.pool, job_id, &task_id).await {
                    Ok(true) => {
                        tracing::info!(job_id, task_id = %task_id, "Provider task attached");
                        Ok(())
                    }
                    Ok(false) => {
                        tracing::warn!(job_id, task_id = %task_id, "Job left pending before task was attached");
                        Ok(())
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => {
                tracing::warn!(
                    job_id,
                    category = failure_category::PROVIDER_SUBMIT,
                    error = %e,
                    "Provider dispatch failed",
                );
                self.fail_job(&job, &e.to_string(), failure_category::PROVIDER_SUBMIT)
                    .await
                    .map(|_| ())
            }
        };

        if let Err(e) = result {
            tracing::error!(job_id, error = %e, "Failed to record dispatch outcome");
        }
    }
}
