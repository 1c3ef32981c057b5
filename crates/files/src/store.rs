//! Storage trait definitions.

use crate::constants::DEFAULT_CONTENT_TYPE;
use crate::key::StorageKey;
use crate::FilesResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Headers persisted alongside an object and replayed when it is served.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ObjectMeta {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
}

impl ObjectMeta {
    /// An empty content type falls back to `application/octet-stream`.
    pub fn new(content_type: impl Into<String>, cache_control: Option<String>) -> Self {
        let content_type = content_type.into();
        let content_type = if content_type.trim().is_empty() {
            DEFAULT_CONTENT_TYPE.to_string()
        } else {
            content_type
        };
        Self {
            content_type,
            cache_control,
        }
    }
}

/// An object read back from the store.
#[derive(Clone, Debug)]
pub struct StoredObject {
    pub data: Bytes,
    pub meta: ObjectMeta,
}

/// Object store abstraction used by the review service.
///
/// Semantics are last-write-wins per key; no cross-key transactions are offered.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Put an object, replacing any previous value atomically.
    async fn put(&self, key: &StorageKey, data: Bytes, meta: ObjectMeta) -> FilesResult<()>;

    /// Get an object's bytes and headers.
    ///
    /// Returns [`crate::FilesError::NotFound`] when nothing is stored under `key`.
    async fn get(&self, key: &StorageKey) -> FilesResult<StoredObject>;

    /// Check if an object exists.
    async fn exists(&self, key: &StorageKey) -> FilesResult<bool>;

    /// Static identifier for logs (`"filesystem"`, `"memory"`).
    fn backend_name(&self) -> &'static str;
}
