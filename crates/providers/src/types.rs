//! Provider-neutral request and outcome types, and the provider trait.

use async_trait::async_trait;
use pixora_core::generation::{JobType, ResolutionTier};
use pixora_core::types::DbId;

use crate::error::ProviderError;

/// Everything a provider needs to generate one image.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Job the call is made for. Used for logging only.
    pub job_id: DbId,
    pub job_type: JobType,
    pub prompt: String,
    /// Data URIs or absolute URLs, in request order.
    pub reference_images: Vec<String>,
    pub model: String,
    /// Resolved `WIDTHxHEIGHT`.
    pub size: String,
    /// Aspect ratio such as `16:9`, when the client gave one.
    pub ratio: Option<String>,
    pub tier: ResolutionTier,
}

/// Normalised result of a dispatch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The provider returned images directly (URLs or data URIs).
    Images(Vec<String>),
    /// The provider accepted the job and will finish it later.
    Submitted { task_id: String },
}

/// Provider-reported state of a submitted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Succeeded,
    Failed(String),
}

/// Normalised result of a poll call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub status: TaskStatus,
    /// Advisory progress, 0-100.
    pub progress: i16,
    pub images: Vec<String>,
}

impl PollOutcome {
    pub fn pending(progress: i16) -> Self {
        Self {
            status: TaskStatus::Pending,
            progress: progress.clamp(0, 100),
            images: Vec::new(),
        }
    }

    pub fn succeeded(images: Vec<String>) -> Self {
        Self {
            status: TaskStatus::Succeeded,
            progress: 100,
            images,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failed(message.into()),
            progress: 0,
            images: Vec::new(),
        }
    }
}

/// An upstream image generation API.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Short protocol label for logs.
    fn name(&self) -> &'static str;

    /// Start generating one image. Never blocks waiting on a task.
    async fn dispatch(&self, request: &GenerationRequest) -> Result<DispatchOutcome, ProviderError>;

    /// Query a task previously returned as [`DispatchOutcome::Submitted`].
    async fn poll(&self, task_id: &str) -> Result<PollOutcome, ProviderError>;
}
