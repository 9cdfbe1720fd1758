//! Client for chat-completion endpoints that answer with an image.
//!
//! The aspect ratio goes into a system message, the prompt and any
//! reference images into the user message. The image comes back either
//! in `message.images` or embedded in the reply text as a data URI or a
//! plain URL.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::http::{self, GENERATE_TIMEOUT};
use crate::types::{DispatchOutcome, GenerationRequest, ImageProvider, PollOutcome};

static DATA_URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"data:image/[A-Za-z0-9.+-]+;base64,[A-Za-z0-9+/=]+").expect("valid regex")
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s()<>\[\]"']+"#).expect("valid regex"));

/// HTTP client for a chat-encoded image API.
pub struct ChatImageClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    images: Vec<ImagePart>,
}

#[derive(Debug, Deserialize)]
struct ImagePart {
    image_url: ImageUrl,
}

#[derive(Debug, Deserialize)]
struct ImageUrl {
    url: String,
}

impl ChatImageClient {
    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn request_body(request: &GenerationRequest) -> serde_json::Value {
        let ratio = request.ratio.as_deref().unwrap_or("1:1");
        let system = format!(
            "You are an image generator. Reply with exactly one image. \
             Aspect ratio: {ratio}. Output size: {}.",
            request.size
        );

        let mut user_content = vec![serde_json::json!({"type": "text", "text": request.prompt})];
        for reference in &request.reference_images {
            user_content.push(serde_json::json!({
                "type": "image_url",
                "image_url": {"url": reference},
            }));
        }

        serde_json::json!({
            "model": request.model,
            "stream": false,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user_content},
            ],
        })
    }
}

/// Find the image in a chat reply.
///
/// Structured `images` win. Otherwise the text is scanned for a data URI
/// first, then for any absolute URL.
fn extract_image(message: &ChatMessage) -> Result<String, ProviderError> {
    if let Some(part) = message.images.iter().find(|p| !p.image_url.url.trim().is_empty()) {
        return Ok(part.image_url.url.trim().to_string());
    }

    let text = message.content.as_deref().unwrap_or("").trim();
    if text.is_empty() {
        return Err(ProviderError::NoImage("provider returned an empty reply".into()));
    }
    if let Some(m) = DATA_URI_RE.find(text) {
        return Ok(m.as_str().to_string());
    }
    if let Some(m) = URL_RE.find(text) {
        return Ok(m.as_str().trim_end_matches(['.', ',']).to_string());
    }
    Err(ProviderError::NoImage(
        "no image found in provider reply".into(),
    ))
}

#[async_trait]
impl ImageProvider for ChatImageClient {
    fn name(&self) -> &'static str {
        "chat_image"
    }

    async fn dispatch(&self, request: &GenerationRequest) -> Result<DispatchOutcome, ProviderError> {
        let mut call = self
            .client
            .post(http::endpoint(&self.base_url, "/v1/chat/completions"))
            .timeout(GENERATE_TIMEOUT)
            .json(&Self::request_body(request));
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let response: ChatResponse = http::parse_response(call.send().await?).await?;
        let message = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ProviderError::NoImage("provider returned no choices".into()))?;

        let image = extract_image(&message)?;
        Ok(DispatchOutcome::Images(vec![image]))
    }

    async fn poll(&self, task_id: &str) -> Result<PollOutcome, ProviderError> {
        Err(ProviderError::Config(format!(
            "chat_image provider has no task to poll (task {task_id})"
        )))
    }
}
