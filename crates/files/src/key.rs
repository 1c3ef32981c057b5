use crate::constants::REVIEWS_PREFIX;
use bannershare_id::ReviewId;
use bannershare_types::RelativePath;
use std::fmt;

/// Fully qualified object key: `reviews/<id>/<relative path>`.
///
/// Constructed only from already-validated parts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageKey {
    id: ReviewId,
    path: RelativePath,
    full: String,
}

impl StorageKey {
    pub fn new(id: &ReviewId, path: &RelativePath) -> Self {
        Self {
            full: format!("{REVIEWS_PREFIX}/{id}/{path}"),
            id: id.clone(),
            path: path.clone(),
        }
    }

    pub fn id(&self) -> &ReviewId {
        &self.id
    }

    pub fn path(&self) -> &RelativePath {
        &self.path
    }

    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}
