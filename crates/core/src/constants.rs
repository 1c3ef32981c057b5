//! Constants used throughout the BannerShare core crate.
//!
//! Filenames, cache policies and default limits live here so the server, the upload
//! orchestrator and the CLI agree on them.

/// Reserved top-level filename of the generated review page.
pub const REVIEW_PAGE_NAME: &str = "review.html";

/// Reserved top-level filename of the session metadata record.
pub const METADATA_FILE_NAME: &str = "_meta.json";

/// Preferred entry point inside a size folder.
pub const ENTRY_POINT_NAME: &str = "index.html";

/// Extension that marks a file as banner markup.
pub const HTML_EXTENSION: &str = ".html";

/// Cache policy for the review page.
pub const REVIEW_PAGE_CACHE_CONTROL: &str = "public, max-age=60, must-revalidate";

/// Cache policy for the session metadata record.
pub const METADATA_CACHE_CONTROL: &str = "public, max-age=60";

/// Cache policy for every other stored object.
pub const OBJECT_CACHE_CONTROL: &str = "public, max-age=300";

/// Content type of the session metadata record.
pub const METADATA_CONTENT_TYPE: &str = "application/json";

/// Content type served for a synthesized review page.
pub const REVIEW_PAGE_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Route prefix under which stored objects are served.
pub const REVIEW_ROUTE: &str = "r";

const MIB: u64 = 1024 * 1024;

/// Default per-file size limit (5 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * MIB;

/// Default aggregate size limit (50 MiB).
pub const DEFAULT_MAX_TOTAL_SIZE: u64 = 50 * MIB;

/// Default lifetime of a signed write URL.
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 15 * 60;

/// Default listen address for the server.
pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Default externally visible base URL.
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";

/// Default directory for filesystem-backed review storage.
pub const DEFAULT_DATA_DIR: &str = "review_data";
