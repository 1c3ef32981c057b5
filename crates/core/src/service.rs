//! Server-side session operations.
//!
//! [`ReviewService`] owns the object store handle and the URL signer. Every method takes raw,
//! untrusted request values and validates them here, so transport layers only translate shapes
//! and status codes.

use crate::catalog::build_catalog;
use crate::config::{ServerConfig, UploadLimits};
use crate::constants::{
    METADATA_CONTENT_TYPE, METADATA_FILE_NAME, REVIEW_PAGE_CONTENT_TYPE, REVIEW_PAGE_NAME,
    REVIEW_ROUTE,
};
use crate::content_type::{cache_control_for, content_type_for};
use crate::review_page;
use crate::session::{SessionFile, UploadSession};
use crate::{ReviewError, ReviewResult};
use bannershare_files::{
    FilesError, ObjectMeta, ObjectStore, SignedWrite, StorageKey, UrlSigner, DEFAULT_CONTENT_TYPE,
    REVIEWS_PREFIX,
};
use bannershare_id::ReviewId;
use bannershare_types::{normalize_upload_path, NonEmptyText, RelativePath};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A newly allocated session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedSession {
    pub identifier: ReviewId,
    pub base_path: String,
    pub review_location: String,
    pub limits: UploadLimits,
}

/// Raw file entry from a finalize request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedFile {
    pub path: String,
    pub byte_size: u64,
}

/// Query parameters carried by a signed write URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedWriteParams {
    pub expires: i64,
    pub content_type: String,
    pub signature: String,
}

/// Bytes and headers to serve for a fetch.
#[derive(Clone, Debug)]
pub struct FetchedObject {
    pub data: Bytes,
    pub content_type: String,
    pub cache_control: &'static str,
}

#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn ObjectStore>,
    signer: UrlSigner,
    limits: UploadLimits,
    public_url: String,
}

impl std::fmt::Debug for ReviewService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewService")
            .field("store", &self.store.backend_name())
            .field("signer", &self.signer)
            .field("limits", &self.limits)
            .field("public_url", &self.public_url)
            .finish()
    }
}

fn parse_id(raw: &str) -> ReviewResult<ReviewId> {
    ReviewId::parse(raw).map_err(|_| ReviewError::InvalidInput("Invalid upload id".into()))
}

fn parse_path(raw: &str) -> ReviewResult<RelativePath> {
    normalize_upload_path(raw).map_err(|_| ReviewError::InvalidInput("Invalid path".into()))
}

/// Paths a client may write. The metadata record is only written by finalize.
fn writable_path(raw: &str) -> ReviewResult<RelativePath> {
    let path = parse_path(raw)?;
    if path.as_str() == METADATA_FILE_NAME {
        return Err(ReviewError::InvalidInput("Path is reserved".into()));
    }
    Ok(path)
}

impl ReviewService {
    /// Creates the service from startup configuration.
    ///
    /// A missing signing secret is replaced by a random one, which invalidates outstanding
    /// signed URLs on restart.
    pub fn new(store: Arc<dyn ObjectStore>, config: &ServerConfig) -> ReviewResult<Self> {
        let secret = match config.signing_secret() {
            Some(secret) => secret.to_vec(),
            None => {
                tracing::warn!("no signing secret configured, generating one for this process");
                UrlSigner::generate_secret()
            }
        };
        let signer = UrlSigner::new(secret, config.public_url(), config.signed_url_ttl_secs())
            .map_err(|e| ReviewError::Config(e.to_string()))?;

        Ok(Self {
            store,
            signer,
            limits: config.limits(),
            public_url: config.public_url().to_string(),
        })
    }

    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Absolute location of a session's review page.
    pub fn review_location(&self, id: &ReviewId) -> String {
        format!("{}/{REVIEW_ROUTE}/{id}/{REVIEW_PAGE_NAME}", self.public_url)
    }

    /// Allocates a fresh session identifier. Nothing is written to storage.
    pub fn create_session(&self, zip_name: &str) -> ReviewResult<CreatedSession> {
        let zip_name = NonEmptyText::new(zip_name)
            .map_err(|_| ReviewError::InvalidInput("zipName is required".into()))?;

        let identifier = ReviewId::new();
        tracing::info!(id = %identifier, zip_name = zip_name.as_str(), "upload session created");
        Ok(CreatedSession {
            base_path: format!("{REVIEWS_PREFIX}/{identifier}"),
            review_location: self.review_location(&identifier),
            identifier,
            limits: self.limits,
        })
    }

    /// Issues a signed write URL for one file.
    ///
    /// A missing or blank content type is signed as `application/octet-stream`.
    pub fn sign_write(
        &self,
        id: &str,
        path: &str,
        content_type: Option<&str>,
        now: DateTime<Utc>,
    ) -> ReviewResult<SignedWrite> {
        let id = parse_id(id)?;
        let path = writable_path(path)?;
        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        let key = StorageKey::new(&id, &path);
        self.signer
            .sign_write(&key, content_type, now)
            .map_err(|_| ReviewError::Transfer("Unable to sign upload".into()))
    }

    /// Stores one file sent through the server.
    pub async fn direct_write(
        &self,
        id: Option<&str>,
        path: Option<&str>,
        content_type: Option<&str>,
        body: Bytes,
    ) -> ReviewResult<()> {
        let (Some(id), Some(path)) = (id, path) else {
            return Err(ReviewError::InvalidInput("Missing upload metadata".into()));
        };
        let id = parse_id(id)?;
        let path = writable_path(path)?;
        let content_type = content_type.unwrap_or(DEFAULT_CONTENT_TYPE);
        self.store_file(&id, &path, content_type, body).await
    }

    /// Stores one file presented against a signed write URL.
    ///
    /// The request's content type must be the one that was signed.
    pub async fn signed_write(
        &self,
        id: &str,
        path: &str,
        params: &SignedWriteParams,
        request_content_type: Option<&str>,
        body: Bytes,
        now: DateTime<Utc>,
    ) -> ReviewResult<()> {
        let id = parse_id(id)?;
        let path = writable_path(path)?;
        let key = StorageKey::new(&id, &path);

        self.signer
            .verify_write(&key, &params.content_type, params.expires, &params.signature, now)?;
        if request_content_type.unwrap_or(DEFAULT_CONTENT_TYPE) != params.content_type {
            return Err(ReviewError::Forbidden(
                "Content type does not match signed URL".into(),
            ));
        }

        self.store_file(&id, &path, &params.content_type, body).await
    }

    async fn store_file(
        &self,
        id: &ReviewId,
        path: &RelativePath,
        content_type: &str,
        body: Bytes,
    ) -> ReviewResult<()> {
        if body.len() as u64 > self.limits.max_file_size() {
            return Err(ReviewError::LimitExceeded("File is too large".into()));
        }

        let key = StorageKey::new(id, path);
        let meta = ObjectMeta::new(content_type, Some(cache_control_for(path).to_string()));
        let size = body.len();
        self.store.put(&key, body, meta).await?;
        tracing::debug!(key = %key, bytes = size, "object stored");
        Ok(())
    }

    /// Writes the session metadata record and returns the review location.
    ///
    /// Sizes are checked against the configured limits. An empty file list is accepted and
    /// produces an empty review page.
    pub async fn finalize(&self, id: &str, files: Vec<UploadedFile>) -> ReviewResult<String> {
        let id = parse_id(id)?;

        let mut session_files = Vec::with_capacity(files.len());
        let mut total_bytes: u64 = 0;
        for file in files {
            let path = normalize_upload_path(&file.path)
                .map_err(|_| ReviewError::InvalidInput("Invalid file path".into()))?;
            if file.byte_size > self.limits.max_file_size() {
                return Err(ReviewError::LimitExceeded("File is too large".into()));
            }
            total_bytes = total_bytes.saturating_add(file.byte_size);
            session_files.push(SessionFile::new(path, file.byte_size));
        }
        if total_bytes > self.limits.max_total_size() {
            return Err(ReviewError::LimitExceeded(
                "Upload exceeds the total size limit".into(),
            ));
        }

        let session = UploadSession {
            identifier: id.clone(),
            created_at: Utc::now(),
            total_bytes,
            files: session_files,
        };
        let record = serde_json::to_vec(&session).map_err(ReviewError::Serialization)?;
        let meta_path = parse_path(METADATA_FILE_NAME)?;
        let meta = ObjectMeta::new(
            METADATA_CONTENT_TYPE,
            Some(cache_control_for(&meta_path).to_string()),
        );
        self.store
            .put(&StorageKey::new(&id, &meta_path), Bytes::from(record), meta)
            .await?;

        tracing::info!(
            id = %id,
            files = session.files.len(),
            total_bytes,
            "upload session finalized"
        );
        Ok(self.review_location(&id))
    }

    /// Loads the metadata record of a finalized session.
    pub async fn load_session(&self, id: &ReviewId) -> ReviewResult<UploadSession> {
        let meta_path = parse_path(METADATA_FILE_NAME)?;
        let object = self.store.get(&StorageKey::new(id, &meta_path)).await?;
        serde_json::from_slice(&object.data).map_err(ReviewError::Deserialization)
    }

    /// Fetches a stored object, synthesizing the review page when it was never uploaded.
    pub async fn fetch(&self, id: &str, path: &str) -> ReviewResult<FetchedObject> {
        let id = ReviewId::parse(id).map_err(|_| ReviewError::InvalidInput("Invalid id".into()))?;
        let path = parse_path(path)?;
        let cache_control = cache_control_for(&path);

        match self.store.get(&StorageKey::new(&id, &path)).await {
            Ok(object) => {
                let content_type = if object.meta.content_type == DEFAULT_CONTENT_TYPE {
                    content_type_for(path.as_str()).to_string()
                } else {
                    object.meta.content_type
                };
                return Ok(FetchedObject {
                    data: object.data,
                    content_type,
                    cache_control,
                });
            }
            Err(FilesError::NotFound(_)) if path.as_str() == REVIEW_PAGE_NAME => {}
            Err(e) => return Err(e.into()),
        }

        let session = self.load_session(&id).await?;
        let catalog = build_catalog(&session.files);
        let html = review_page::render(&catalog, &id)?;
        tracing::debug!(id = %id, banners = catalog.len(), "review page synthesized");

        Ok(FetchedObject {
            data: Bytes::from(html),
            content_type: REVIEW_PAGE_CONTENT_TYPE.to_string(),
            cache_control,
        })
    }
}
