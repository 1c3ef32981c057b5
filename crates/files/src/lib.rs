//! BannerShare object storage
//!
//! This crate is the storage gateway for review sessions: a small object-store abstraction,
//! two backends, and the signer that issues time-limited write URLs.
//!
//! ## Key layout
//!
//! Every object belongs to exactly one session and is addressed by a [`StorageKey`]:
//!
//! ```text
//! reviews/
//! └── <review-id>/
//!     ├── _meta.json          # written once by finalize
//!     ├── review.html         # optional, synthesized when absent
//!     └── 300x250/index.html  # archive contents at their normalized paths
//! ```
//!
//! A [`StorageKey`] can only be built from a validated [`ReviewId`] and a normalized
//! [`RelativePath`], so no backend ever sees a key derived from raw input.
//!
//! ## Example Usage
//!
//! ```no_run
//! use bannershare_files::{ObjectMeta, ObjectStore, MemoryStore, StorageKey};
//! use bannershare_id::ReviewId;
//! use bannershare_types::normalize_upload_path;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let key = StorageKey::new(&ReviewId::parse("abcdef123456")?, &normalize_upload_path("300x250/index.html")?);
//! store.put(&key, bytes::Bytes::from_static(b"<html></html>"), ObjectMeta::new("text/html", None)).await?;
//! # Ok(())
//! # }
//! ```

mod backends;
mod constants;
mod key;
mod signer;
mod store;

pub use backends::{filesystem::FilesystemStore, memory::MemoryStore};
pub use constants::{DEFAULT_CONTENT_TYPE, REVIEWS_PREFIX, SIGNED_WRITE_ROUTE};
pub use key::StorageKey;
pub use signer::{SignedWrite, UrlSigner, MAX_TTL_SECS, MIN_SECRET_LEN};
pub use store::{ObjectMeta, ObjectStore, StoredObject};

pub use bannershare_id::ReviewId;
pub use bannershare_types::RelativePath;

use std::path::PathBuf;
use std::sync::Arc;

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Storage root is unusable
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// No object is stored under the key
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Signed URL is past its expiry
    #[error("Signed URL has expired")]
    SignatureExpired,

    /// Signature does not match the request
    #[error("Signature does not match request")]
    SignatureMismatch,

    /// Signer misconfiguration (secret or base URL)
    #[error("Signer configuration error: {0}")]
    SignerConfig(String),

    /// Header sidecar could not be encoded or decoded
    #[error("Object header error: {0}")]
    Header(#[from] serde_json::Error),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type FilesResult<T> = Result<T, FilesError>;

/// Which backend to construct at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageConfig {
    /// Objects under a local directory.
    Filesystem { path: PathBuf },
    /// Process-local map; contents vanish on restart.
    Memory,
}

/// Create the process-wide object store handle from configuration.
///
/// Called once at startup; the returned handle is shared by every request.
pub async fn from_config(config: &StorageConfig) -> FilesResult<Arc<dyn ObjectStore>> {
    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemStore::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
