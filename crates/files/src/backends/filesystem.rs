//! Local filesystem storage backend.
//!
//! ```text
//! <root>/
//! ├── objects/<id>/<ab>/<sha256(path)>.bin    # object bytes
//! ├── objects/<id>/<ab>/<sha256(path)>.json   # ObjectMeta sidecar
//! └── tmp/                                    # staging for atomic renames
//! ```
//!
//! Object paths never become directory names. Each path is hashed into a fixed-length leaf
//! name, sharded by the first two hex digits, so `a/img` and `a/img/index.html` are
//! independent objects and no stored name depends on attacker-controlled text.

use crate::constants::{DATA_FILE_EXT, HEADER_FILE_EXT, OBJECTS_DIR_NAME, STAGING_DIR_NAME};
use crate::key::StorageKey;
use crate::store::{ObjectMeta, ObjectStore, StoredObject};
use crate::{FilesError, FilesResult};
use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Object store rooted at a local directory.
#[derive(Debug)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    /// Creates the backend, creating `root` and its layout directories if needed.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if `root` exists but is not a directory, or the layout
    /// directories cannot be created.
    pub async fn new(root: impl AsRef<Path>) -> FilesResult<Self> {
        let root = root.as_ref().to_path_buf();

        if root.exists() && !root.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root.display()
            )));
        }

        for dir in [OBJECTS_DIR_NAME, STAGING_DIR_NAME] {
            fs::create_dir_all(root.join(dir)).await?;
        }

        let root = root.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self { root })
    }

    /// Returns the canonical storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shard directory and hashed leaf stem for `key`.
    fn locate(&self, key: &StorageKey) -> (PathBuf, String) {
        let digest = hex::encode(Sha256::digest(key.path().as_str().as_bytes()));
        let dir = self
            .root
            .join(OBJECTS_DIR_NAME)
            .join(key.id().as_str())
            .join(&digest[..2]);
        (dir, digest)
    }

    fn object_path(&self, key: &StorageKey) -> PathBuf {
        let (dir, digest) = self.locate(key);
        dir.join(format!("{digest}.{DATA_FILE_EXT}"))
    }

    fn header_path(&self, key: &StorageKey) -> PathBuf {
        let (dir, digest) = self.locate(key);
        dir.join(format!("{digest}.{HEADER_FILE_EXT}"))
    }

    /// Writes `data` to `target` through a staging file and a rename.
    async fn write_atomic(&self, target: &Path, data: &[u8]) -> FilesResult<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let staging = self
            .root
            .join(STAGING_DIR_NAME)
            .join(Uuid::new_v4().simple().to_string());

        let mut file = fs::File::create(&staging).await?;
        let written = async {
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        if let Err(e) = written {
            let _ = fs::remove_file(&staging).await;
            return Err(FilesError::Io(e));
        }

        if let Err(e) = fs::rename(&staging, target).await {
            let _ = fs::remove_file(&staging).await;
            return Err(FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to move object into {}: {}", target.display(), e),
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    #[instrument(skip(self, data, meta), fields(backend = "filesystem", key = %key, bytes = data.len()))]
    async fn put(&self, key: &StorageKey, data: Bytes, meta: ObjectMeta) -> FilesResult<()> {
        // Headers go first so a visible object always has its headers.
        let header = serde_json::to_vec(&meta)?;
        self.write_atomic(&self.header_path(key), &header).await?;
        self.write_atomic(&self.object_path(key), &data).await?;

        tracing::debug!("stored object");
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem", key = %key))]
    async fn get(&self, key: &StorageKey) -> FilesResult<StoredObject> {
        let data = match fs::read(self.object_path(key)).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FilesError::NotFound(key.to_string()));
            }
            Err(e) => return Err(FilesError::Io(e)),
        };

        let meta = match fs::read(self.header_path(key)).await {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ObjectMeta::new("", None)
            }
            Err(e) => return Err(FilesError::Io(e)),
        };

        Ok(StoredObject {
            data: Bytes::from(data),
            meta,
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem", key = %key))]
    async fn exists(&self, key: &StorageKey) -> FilesResult<bool> {
        match fs::metadata(self.object_path(key)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FilesError::Io(e)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
