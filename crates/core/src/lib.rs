//! # BannerShare Core
//!
//! Core logic for turning a banner archive into a shareable review page.
//!
//! - [`archive`]: in-memory extraction with path normalization and size limits
//! - [`catalog`]: which HTML files are banners, and their order
//! - [`review_page`]: the self-contained review page
//! - [`upload`]: the client-side upload state machine
//! - [`service`]: server-side session operations over an object store
//!
//! **No transport concerns**: HTTP routing and wire formats belong in `api-rest` and
//! `api-shared`; the HTTP client for [`upload::UploadApi`] lives in the CLI.

pub mod archive;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod content_type;
mod error;
pub mod review_page;
pub mod service;
pub mod session;
pub mod upload;

pub use archive::{extract, ExtractError, ExtractedArchive, FileEntry};
pub use catalog::{build_catalog, BannerEntry};
pub use config::{format_bytes, ServerConfig, UploadLimits};
pub use error::{ErrorKind, ReviewError, ReviewResult};
pub use service::{CreatedSession, FetchedObject, ReviewService, SignedWriteParams, UploadedFile};
pub use session::{SessionFile, UploadSession};
pub use upload::{
    ResetHandle, SessionGrant, UploadApi, UploadOrchestrator, UploadPhase, UploadProgress,
    UploadSnapshot,
};

pub use bannershare_files::StorageConfig;
pub use bannershare_id::ReviewId;
pub use bannershare_types::{normalize_upload_path, RelativePath};
