//! Client for OpenAI-style `/v1/images/generations` endpoints.
//!
//! One request, images in the response body. Nothing is ever polled.

use async_trait::async_trait;
use pixora_core::generation::JobType;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::http::{self, GENERATE_TIMEOUT};
use crate::types::{DispatchOutcome, GenerationRequest, ImageProvider, PollOutcome};

/// HTTP client for a synchronous image API.
pub struct SyncImageClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
    b64_json: Option<String>,
}

impl SyncImageClient {
    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn request_body(request: &GenerationRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "n": 1,
            "size": request.size,
        });
        if request.job_type == JobType::ImageToImage {
            body["image"] = serde_json::json!(request.reference_images);
        }
        body
    }
}

/// Collect image references from a response, in order. Inline payloads
/// become PNG data URIs.
fn extract_images(response: ImagesResponse) -> Vec<String> {
    response
        .data
        .into_iter()
        .filter_map(|d| match (d.url, d.b64_json) {
            (Some(url), _) if !url.trim().is_empty() => Some(url.trim().to_string()),
            (_, Some(b64)) if !b64.trim().is_empty() => Some(http::png_data_uri(&b64)),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl ImageProvider for SyncImageClient {
    fn name(&self) -> &'static str {
        "sync_image"
    }

    async fn dispatch(&self, request: &GenerationRequest) -> Result<DispatchOutcome, ProviderError> {
        let mut call = self
            .client
            .post(http::endpoint(&self.base_url, "/v1/images/generations"))
            .timeout(GENERATE_TIMEOUT)
            .json(&Self::request_body(request));
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let response: ImagesResponse = http::parse_response(call.send().await?).await?;
        let images = extract_images(response);
        if images.is_empty() {
            return Err(ProviderError::NoImage("response contained no images".into()));
        }
        Ok(DispatchOutcome::Images(images))
    }

    async fn poll(&self, task_id: &str) -> Result<PollOutcome, ProviderError> {
        Err(ProviderError::Config(format!(
            "sync_image provider has no task to poll (task {task_id})"
        )))
    }
}
