use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;

use crate::config::Config;
use crate::error::AppError;

/// Blob store seam. Attachments and avatars live outside the relational
/// store; paths are namespaced by the configured folders.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, path: &str) -> Result<bool, AppError>;

    /// Idempotent: deleting an absent blob succeeds. A concurrent
    /// deletion racing on the same path must not surface an error.
    async fn delete(&self, path: &str) -> Result<(), AppError>;

    fn url(&self, path: &str) -> String;
}

pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3BlobStore {
    pub async fn from_env(cfg: &Config) -> Self {
        let shared = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_s3::Client::new(&shared),
            bucket: cfg.storage_bucket.clone(),
            public_base_url: cfg.storage_public_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn exists(&self, path: &str) -> Result<bool, AppError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(ctx)) if ctx.err().is_not_found() => Ok(false),
            Err(e) => Err(AppError::Blob(format!("head {path}: {e}"))),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        // S3 DeleteObject succeeds for absent keys, which is exactly the
        // tolerate-already-deleted contract.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| AppError::Blob(format!("delete {path}: {e}")))?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path)
    }
}

/// In-memory store for tests and local development.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: tokio::sync::RwLock<std::collections::HashSet<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, path: &str) {
        self.blobs.write().await.insert(path.to_string());
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn exists(&self, path: &str) -> Result<bool, AppError> {
        Ok(self.blobs.read().await.contains(path))
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.blobs.write().await.remove(path);
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("memory://{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_delete_is_idempotent() {
        let store = MemoryBlobStore::new();
        store.put("attachments/a.jpg").await;
        assert!(store.exists("attachments/a.jpg").await.unwrap());

        store.delete("attachments/a.jpg").await.unwrap();
        assert!(!store.exists("attachments/a.jpg").await.unwrap());

        // Already absent: still Ok.
        store.delete("attachments/a.jpg").await.unwrap();
    }
}
