use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

/// Object-store boundary used by the upload pipeline.
///
/// A single best-effort write per run; no partial-object cleanup is attempted
/// on failure.
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stream a local file's bytes to the store under `key`, setting the
    /// content-type metadata.
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()>;

    /// Fully-qualified public locator for `key`.
    fn public_url(&self, key: &str) -> String;
}

/// S3-backed storage
pub struct S3StorageService {
    client: Client,
    bucket: String,
    region: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String, region: String) -> Self {
        Self {
            client,
            bucket,
            region,
        }
    }
}

#[async_trait::async_trait]
impl ObjectStorage for S3StorageService {
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()> {
        let body = ByteStream::from_path(path).await?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, key
        )
    }
}

/// In-memory storage for local development and tests (no S3 required),
/// analogous to running without a live object store.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(_, ct)| ct.clone())
    }
}

#[async_trait::async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://videos/{}", key)
    }
}
