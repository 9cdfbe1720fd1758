//! Durable object storage for mirrored artifacts.
//!
//! Two backends implement [`ObjectStore`]: [`LocalObjectStore`] writes
//! under a directory (development), [`S3ObjectStore`] writes to a bucket.
//! Either way, objects are served back through a public base URL (by
//! default the API's own `/api/v1/media` route).

mod local;
mod s3;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;

/// Default public base URL for stored objects.
pub const DEFAULT_PUBLIC_BASE_URL: &str = "/api/v1/media";

/// Default root directory of the local backend.
const DEFAULT_LOCAL_ROOT: &str = "./data/media";

/// Errors from an object store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 GetObject error: {0}")]
    GetObject(String),

    #[error("S3 PutObject error: {0}")]
    PutObject(String),

    #[error("storage config error: {0}")]
    Config(String),
}

/// An object read back from the store.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

/// Key/value blob storage with a public URL per key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError>;

    /// Base URL that [`ObjectStore::public_url`] prefixes keys with.
    fn public_base_url(&self) -> &str;

    /// Stable URL for a stored key.
    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url().trim_end_matches('/'), key)
    }

    /// Whether `url` already points into this store.
    fn is_durable(&self, url: &str) -> bool {
        let base = self.public_base_url().trim_end_matches('/');
        url.strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Reject keys that could escape the store root.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Guess a content type from a key's extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    let ext = key.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which backend to build.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    Local {
        root: PathBuf,
    },
    S3 {
        bucket: String,
        region: Option<String>,
        endpoint: Option<String>,
    },
}

/// Object store configuration loaded from environment variables.
///
/// | Env var                  | Default          |
/// |--------------------------|------------------|
/// | `STORAGE_BACKEND`        | `local`          |
/// | `STORAGE_LOCAL_ROOT`     | `./data/media`   |
/// | `S3_BUCKET`              | required for s3  |
/// | `S3_REGION`              | SDK default      |
/// | `S3_ENDPOINT`            | AWS              |
/// | `MEDIA_PUBLIC_BASE_URL`  | `/api/v1/media`  |
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub public_base_url: String,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, StorageError> {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend = match var("STORAGE_BACKEND").as_deref().unwrap_or("local") {
            "local" => StorageBackend::Local {
                root: PathBuf::from(
                    var("STORAGE_LOCAL_ROOT").unwrap_or_else(|| DEFAULT_LOCAL_ROOT.into()),
                ),
            },
            "s3" => StorageBackend::S3 {
                bucket: var("S3_BUCKET").ok_or_else(|| {
                    StorageError::Config("S3_BUCKET is required when STORAGE_BACKEND=s3".into())
                })?,
                region: var("S3_REGION"),
                endpoint: var("S3_ENDPOINT"),
            },
            other => {
                return Err(StorageError::Config(format!(
                    "unknown STORAGE_BACKEND '{other}', expected 'local' or 's3'"
                )))
            }
        };

        Ok(Self {
            backend,
            public_base_url: var("MEDIA_PUBLIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.into()),
        })
    }

    /// Construct the configured store.
    pub async fn build(&self) -> Result<Arc<dyn ObjectStore>, StorageError> {
        Ok(match &self.backend {
            StorageBackend::Local { root } => Arc::new(LocalObjectStore::new(
                root.clone(),
                self.public_base_url.clone(),
            )),
            StorageBackend::S3 {
                bucket,
                region,
                endpoint,
            } => Arc::new(
                S3ObjectStore::connect(
                    bucket.clone(),
                    region.clone(),
                    endpoint.clone(),
                    self.public_base_url.clone(),
                )
                .await,
            ),
        })
    }
}
