//! Object storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use fxflow_common::{FxFlowError, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Trait for bucket/key object stores.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store name, used in error messages.
    fn name(&self) -> &str;

    /// Write an object, replacing any existing one.
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, content_type: &str)
        -> Result<()>;

    /// Read an object. `None` if the key does not exist.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>>;
}

/// Serialize `value` as JSON and store it.
pub async fn put_json<T: Serialize + ?Sized + Sync>(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    value: &T,
) -> Result<()> {
    let body = serde_json::to_vec(value)
        .map_err(|e| FxFlowError::Validation(format!("Cannot serialize {key}: {e}")))?;
    store.put_object(bucket, key, body, JSON_CONTENT_TYPE).await
}

/// Read and parse a JSON object. A missing key is an external call failure.
pub async fn get_json(store: &dyn ObjectStore, bucket: &str, key: &str) -> Result<Value> {
    let body = store
        .get_object(bucket, key)
        .await?
        .ok_or_else(|| FxFlowError::external(store.name(), format!("NoSuchKey: {bucket}/{key}")))?;

    serde_json::from_slice(&body)
        .map_err(|e| FxFlowError::Validation(format!("Object {key} is not valid JSON: {e}")))
}

/// Stores each bucket as a directory under a root path.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(bucket).join(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || bucket.is_empty() || key.is_empty() {
            return Err(FxFlowError::Validation(format!(
                "Invalid object location {bucket}/{key}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn name(&self) -> &str {
        "fs-object-store"
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let path = self.path_for(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FxFlowError::external(self.name(), e))?;
        }

        debug!(path = %path.display(), content_type, bytes = body.len(), "Writing object");
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| FxFlowError::external(self.name(), e))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(bucket, key)?;
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FxFlowError::external(self.name(), e)),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    content_type: String,
}

/// In-process object store.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: DashMap<(String, String), StoredObject>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in a bucket, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .filter(|e| e.key().0 == bucket)
            .map(|e| e.key().1.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn name(&self) -> &str {
        "memory-object-store"
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.body.clone()))
    }
}
