use std::path::PathBuf;

use async_trait::async_trait;

use super::{content_type_for_key, validate_key, ObjectStore, StorageError, StoredObject};

/// Stores objects as files under a root directory.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: PathBuf, public_base_url: String) -> Self {
        Self {
            root,
            public_base_url,
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, body).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
        validate_key(key)?;
        match tokio::fs::read(self.root.join(key)).await {
            Ok(body) => Ok(StoredObject {
                body,
                content_type: Some(content_type_for_key(key).to_string()),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn public_base_url(&self) -> &str {
        &self.public_base_url
    }
}
