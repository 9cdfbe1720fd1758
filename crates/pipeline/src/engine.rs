use std::sync::Arc;

use pixora_core::generation::{resolve_size, JobType, ResolutionTier};
use pixora_db::models::generation_job::GenerationJob;
use pixora_providers::GenerationRequest;
use sqlx::PgPool;

use crate::mirror::ArtifactMirror;
use crate::provider_factory::ProviderFactory;

/// Shared handle to the generation engine. Cheap to clone.
#[derive(Clone)]
pub struct Engine {
    pub(crate) pool: PgPool,
    pub(crate) providers: Arc<dyn ProviderFactory>,
    pub(crate) mirror: Arc<ArtifactMirror>,
}

impl Engine {
    pub fn new(
        pool: PgPool,
        providers: Arc<dyn ProviderFactory>,
        mirror: Arc<ArtifactMirror>,
    ) -> Self {
        Self {
            pool,
            providers,
            mirror,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn mirror(&self) -> &ArtifactMirror {
        &self.mirror
    }
}

/// Rebuild the provider request for a stored job.
pub(crate) fn request_for(job: &GenerationJob) -> GenerationRequest {
    let tier = ResolutionTier::from_label(Some(&job.resolution));
    GenerationRequest {
        job_id: job.id,
        job_type: JobType::parse(&job.job_type).unwrap_or(JobType::TextToImage),
        prompt: job.prompt.clone(),
        reference_images: job.reference_images.0.clone(),
        model: job.model.clone(),
        size: resolve_size(job.explicit_size.as_deref(), job.size_ratio.as_deref(), tier),
        ratio: job.size_ratio.clone(),
        tier,
    }
}
