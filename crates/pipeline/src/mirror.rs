//! Artifact Mirror: re-host provider images in the object store.
//!
//! Provider URLs expire. Every result image is copied into durable
//! storage under `generations/{job_id}/{index}-{millis}.{ext}` and the
//! stored object's public URL replaces the original. Mirroring is best
//! effort: on any failure the original reference is kept.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use pixora_core::failure_category;
use pixora_core::types::DbId;

use crate::storage::{ObjectStore, StorageError};

/// Timeout for one image download.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Largest image body accepted for mirroring.
pub const MAX_DOWNLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Some CDNs refuse non-browser clients.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Why a single image could not be mirrored.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("download returned HTTP {0}")]
    Status(u16),

    #[error("malformed data URI")]
    InvalidDataUri,

    #[error("image body is empty")]
    Empty,

    #[error("image body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("unsupported image reference scheme")]
    UnsupportedScheme,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Copies images into an [`ObjectStore`].
pub struct ArtifactMirror {
    store: Arc<dyn ObjectStore>,
    http: reqwest::Client,
    max_bytes: usize,
}

impl ArtifactMirror {
    pub fn new(store: Arc<dyn ObjectStore>, http: reqwest::Client) -> Self {
        Self {
            store,
            http,
            max_bytes: MAX_DOWNLOAD_BYTES,
        }
    }

    /// Override the per-image size limit.
    pub fn with_max_download_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Mirror every image of a job, preserving order and length.
    ///
    /// URLs already in the store pass through unchanged. Failed copies
    /// keep the provider reference.
    pub async fn persist(&self, urls: &[String], job_id: DbId) -> Vec<String> {
        let copies = urls
            .iter()
            .enumerate()
            .map(|(index, url)| self.persist_one(url, job_id, index));
        futures::future::join_all(copies).await
    }

    async fn persist_one(&self, url: &str, job_id: DbId, index: usize) -> String {
        if self.store.is_durable(url) {
            return url.to_string();
        }
        match self.copy(url, job_id, index).await {
            Ok(stored) => {
                tracing::debug!(job_id, index, url = %stored, "Artifact mirrored");
                stored
            }
            Err(e) => {
                tracing::warn!(
                    job_id,
                    index,
                    category = failure_category::MIRROR,
                    error = %e,
                    "Artifact mirror failed, keeping provider reference",
                );
                url.to_string()
            }
        }
    }

    async fn copy(&self, url: &str, job_id: DbId, index: usize) -> Result<String, MirrorError> {
        let (body, content_type) = if url.starts_with("data:") {
            decode_data_uri(url)?
        } else if url.starts_with("http://") || url.starts_with("https://") {
            self.download(url).await?
        } else {
            return Err(MirrorError::UnsupportedScheme);
        };
        if body.is_empty() {
            return Err(MirrorError::Empty);
        }
        if body.len() > self.max_bytes {
            return Err(MirrorError::TooLarge { limit: self.max_bytes });
        }

        let key = object_key(job_id, index, extension_for(&content_type));
        self.store.put(&key, body, &content_type).await?;
        Ok(self.store.public_url(&key))
    }

    async fn download(&self, url: &str) -> Result<(Vec<u8>, String), MirrorError> {
        let mut response = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::Status(status.as_u16()));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| guess_content_type(url).to_string());

        let limit = self.max_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(MirrorError::TooLarge { limit });
        }
        // Chunked bodies carry no length up front.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(MirrorError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok((body, content_type))
    }
}

/// Storage key for the `index`th image of a job.
fn object_key(job_id: DbId, index: usize, ext: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    format!("generations/{job_id}/{index}-{millis}.{ext}")
}

/// Split `data:image/png;base64,....` into bytes and media type.
fn decode_data_uri(uri: &str) -> Result<(Vec<u8>, String), MirrorError> {
    let (meta, payload) = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or(MirrorError::InvalidDataUri)?;
    if !meta.ends_with(";base64") {
        return Err(MirrorError::InvalidDataUri);
    }
    let media_type = meta
        .split(';')
        .next()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("image/png")
        .to_ascii_lowercase();
    let body = BASE64
        .decode(payload.trim().as_bytes())
        .map_err(|_| MirrorError::InvalidDataUri)?;
    Ok((body, media_type))
}

fn guess_content_type(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    if path.ends_with(".jpg") || path.ends_with(".jpeg") {
        "image/jpeg"
    } else if path.ends_with(".webp") {
        "image/webp"
    } else if path.ends_with(".gif") {
        "image/gif"
    } else {
        "image/png"
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}
