//! Periodic reconciliation of pending jobs.
//!
//! Runs inside the API process or the standalone worker. Picks up jobs
//! whose owner never polls, and enforces the timeout on jobs a provider
//! silently dropped.

use std::time::Duration;

use futures::StreamExt;
use pixora_db::repositories::GenerationJobRepo;
use tokio_util::sync::CancellationToken;

use crate::engine::Engine;
use crate::error::PipelineError;
use crate::reconciler::JobState;

/// Maximum pending jobs examined per sweep.
pub const SWEEP_BATCH_SIZE: i64 = 100;

/// Jobs reconciled concurrently within one sweep.
const SWEEP_CONCURRENCY: usize = 8;

/// Counts from one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub completed: usize,
    pub failed: usize,
    pub errors: usize,
}

/// Run the sweep loop until `cancel` is triggered.
pub async fn run(engine: Engine, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Reconciliation sweep started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconciliation sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                match sweep_once(&engine).await {
                    Ok(report) if report.examined > 0 => {
                        tracing::info!(
                            examined = report.examined,
                            completed = report.completed,
                            failed = report.failed,
                            errors = report.errors,
                            "Reconciliation sweep finished",
                        );
                    }
                    Ok(_) => tracing::debug!("Reconciliation sweep: nothing pending"),
                    Err(e) => tracing::error!(error = %e, "Reconciliation sweep failed"),
                }
            }
        }
    }
}

/// Reconcile every pending job once, oldest first.
pub async fn sweep_once(engine: &Engine) -> Result<SweepReport, PipelineError> {
    let pending = GenerationJobRepo::list_pending(&engine.pool, SWEEP_BATCH_SIZE).await?;

    let results: Vec<_> = futures::stream::iter(pending)
        .map(|job| async move { (job.id, engine.reconcile(&job).await) })
        .buffer_unordered(SWEEP_CONCURRENCY)
        .collect()
        .await;

    let mut report = SweepReport {
        examined: results.len(),
        ..Default::default()
    };
    for (job_id, result) in results {
        match result {
            Ok(JobState::Completed { .. }) => report.completed += 1,
            Ok(JobState::Failed { .. }) => report.failed += 1,
            Ok(JobState::Pending { .. }) => {}
            Err(e) => {
                report.errors += 1;
                tracing::error!(job_id, error = %e, "Failed to reconcile job");
            }
        }
    }
    Ok(report)
}
