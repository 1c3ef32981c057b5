//! Storage layout names.

/// Prefix under which every review session's objects live.
pub const REVIEWS_PREFIX: &str = "reviews";

/// Filesystem backend: directory holding object bytes.
pub const OBJECTS_DIR_NAME: &str = "objects";

/// Filesystem backend: extension of object byte files.
pub const DATA_FILE_EXT: &str = "bin";

/// Filesystem backend: extension of per-object header sidecars.
pub const HEADER_FILE_EXT: &str = "json";

/// Filesystem backend: staging directory for atomic writes.
pub const STAGING_DIR_NAME: &str = "tmp";

/// First URL path segment of signed write URLs.
pub const SIGNED_WRITE_ROUTE: &str = "objects";

/// Content type used when none is known.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
