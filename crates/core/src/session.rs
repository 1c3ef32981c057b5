//! The finalized session metadata record (`_meta.json`).

use bannershare_id::ReviewId;
use bannershare_types::RelativePath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One uploaded file as listed in the metadata record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFile {
    pub path: RelativePath,
    #[serde(default, alias = "bytes")]
    pub byte_size: u64,
}

impl SessionFile {
    pub fn new(path: RelativePath, byte_size: u64) -> Self {
        Self { path, byte_size }
    }
}

/// Metadata written once per session by finalize.
///
/// Records written under the older `id`/`bytes` field names still deserialize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    #[serde(alias = "id")]
    pub identifier: ReviewId,
    pub created_at: DateTime<Utc>,
    pub total_bytes: u64,
    pub files: Vec<SessionFile>,
}
