//! Client for submit-and-poll task APIs.
//!
//! Submission returns a task id immediately. The id is stored on the job
//! and polled later by the reconciler. Two endpoint shapes share the
//! same state machine:
//!
//! | Flavor  | Submit                          | Poll                          |
//! |---------|---------------------------------|-------------------------------|
//! | `Tasks` | `POST /v1/images/tasks`         | `GET /v1/images/tasks/{id}`   |
//! | `Draw`  | `POST /v1/draw/completions`     | `POST /v1/draw/result`        |
//!
//! The `Draw` flavor wraps every response in `{code, msg, data}` and
//! signals success with `code == 0`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::http::{self, POLL_TIMEOUT, SUBMIT_TIMEOUT};
use crate::types::{DispatchOutcome, GenerationRequest, ImageProvider, PollOutcome};

/// Which endpoint shape the provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitFlavor {
    Tasks,
    Draw,
}

/// HTTP client for a submit-and-poll image API.
pub struct SubmitPollClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    flavor: SubmitFlavor,
}

/// Envelope used by the `Draw` flavor.
#[derive(Debug, Deserialize)]
struct DrawEnvelope {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Value,
}

impl SubmitPollClient {
    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        flavor: SubmitFlavor,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            flavor,
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn submit_body(&self, request: &GenerationRequest) -> Value {
        match self.flavor {
            SubmitFlavor::Tasks => serde_json::json!({
                "model": request.model,
                "prompt": request.prompt,
                "size": request.size,
                "aspect_ratio": request.ratio,
                "image_urls": request.reference_images,
            }),
            SubmitFlavor::Draw => serde_json::json!({
                "model": request.model,
                "prompt": request.prompt,
                "aspectRatio": request.ratio.as_deref().unwrap_or("auto"),
                "imageSize": request.tier.as_str(),
                "urls": request.reference_images,
                "shutProgress": false,
            }),
        }
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let path = match self.flavor {
            SubmitFlavor::Tasks => "/v1/images/tasks",
            SubmitFlavor::Draw => "/v1/draw/completions",
        };
        let call = self
            .client
            .post(http::endpoint(&self.base_url, path))
            .timeout(SUBMIT_TIMEOUT)
            .json(&self.submit_body(request));
        let body: Value = http::parse_response(self.authorized(call).send().await?).await?;

        let data = match self.flavor {
            SubmitFlavor::Tasks => body,
            SubmitFlavor::Draw => unwrap_envelope(body)?,
        };
        task_id_from(&data)
            .ok_or_else(|| ProviderError::Decode("submit response carried no task id".into()))
    }

    async fn fetch_status(&self, task_id: &str) -> Result<Value, ProviderError> {
        let call = match self.flavor {
            SubmitFlavor::Tasks => self
                .client
                .get(http::endpoint(&self.base_url, &format!("/v1/images/tasks/{task_id}"))),
            SubmitFlavor::Draw => self
                .client
                .post(http::endpoint(&self.base_url, "/v1/draw/result"))
                .json(&serde_json::json!({ "id": task_id })),
        };
        let body: Value =
            http::parse_response(self.authorized(call.timeout(POLL_TIMEOUT)).send().await?).await?;
        match self.flavor {
            SubmitFlavor::Tasks => Ok(body),
            SubmitFlavor::Draw => unwrap_envelope(body),
        }
    }
}

fn unwrap_envelope(body: Value) -> Result<Value, ProviderError> {
    let envelope: DrawEnvelope =
        serde_json::from_value(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    if envelope.code != 0 {
        return Err(ProviderError::Decode(format!(
            "provider returned code {}: {}",
            envelope.code,
            envelope.msg.unwrap_or_default()
        )));
    }
    Ok(envelope.data)
}

fn task_id_from(data: &Value) -> Option<String> {
    ["task_id", "id"].iter().find_map(|key| match data.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Map a provider status document to a [`PollOutcome`].
fn interpret_status(data: &Value) -> PollOutcome {
    let status = data
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    let progress = parse_progress(data.get("progress"));

    match status.as_str() {
        "succeeded" | "success" | "completed" | "done" => {
            let images = collect_images(data);
            if images.is_empty() {
                PollOutcome::failed("task succeeded without images")
            } else {
                PollOutcome::succeeded(images)
            }
        }
        "failed" | "failure" | "error" | "cancelled" => {
            let reason = ["failure_reason", "error", "message"]
                .iter()
                .find_map(|k| data.get(*k).and_then(Value::as_str))
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("provider reported failure");
            PollOutcome::failed(reason)
        }
        _ => PollOutcome::pending(progress),
    }
}

/// Progress arrives as a number or a string such as `"45%"`.
fn parse_progress(value: Option<&Value>) -> i16 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.map(|p| p.round().clamp(0.0, 100.0) as i16).unwrap_or(0)
}

/// Image references from `images`, `results` or `urls`, whose entries are
/// either strings or objects with a `url` field.
fn collect_images(data: &Value) -> Vec<String> {
    let mut out = Vec::new();
    for key in ["images", "results", "urls"] {
        let Some(items) = data.get(key).and_then(Value::as_array) else {
            continue;
        };
        for item in items {
            let url = match item {
                Value::String(s) => Some(s.as_str()),
                Value::Object(_) => item.get("url").and_then(Value::as_str),
                _ => None,
            };
            if let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) {
                out.push(url.to_string());
            }
        }
    }
    if out.is_empty() {
        if let Some(url) = data.get("url").and_then(Value::as_str) {
            out.push(url.trim().to_string());
        }
    }
    out
}

#[async_trait]
impl ImageProvider for SubmitPollClient {
    fn name(&self) -> &'static str {
        match self.flavor {
            SubmitFlavor::Tasks => "task_poll",
            SubmitFlavor::Draw => "draw_poll",
        }
    }

    async fn dispatch(&self, request: &GenerationRequest) -> Result<DispatchOutcome, ProviderError> {
        let task_id = self.submit(request).await?;
        tracing::debug!(job_id = request.job_id, task_id = %task_id, "Task submitted");
        Ok(DispatchOutcome::Submitted { task_id })
    }

    async fn poll(&self, task_id: &str) -> Result<PollOutcome, ProviderError> {
        let data = self.fetch_status(task_id).await?;
        Ok(interpret_status(&data))
    }
}
