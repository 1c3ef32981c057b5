//! In-process storage backend.

use crate::key::StorageKey;
use crate::store::{ObjectMeta, ObjectStore, StoredObject};
use crate::{FilesError, FilesResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Object store backed by a map; used for development servers and tests.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Keys currently stored, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &StorageKey, data: Bytes, meta: ObjectMeta) -> FilesResult<()> {
        self.objects
            .write()
            .await
            .insert(key.as_str().to_string(), StoredObject { data, meta });
        Ok(())
    }

    async fn get(&self, key: &StorageKey) -> FilesResult<StoredObject> {
        self.objects
            .read()
            .await
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| FilesError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &StorageKey) -> FilesResult<bool> {
        Ok(self.objects.read().await.contains_key(key.as_str()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
