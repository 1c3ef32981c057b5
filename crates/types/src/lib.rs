//! # BannerShare Types
//!
//! Small validated value types shared by every BannerShare crate.
//!
//! - [`NonEmptyText`]: trimmed, non-empty text
//! - [`RelativePath`]: an upload path that is safe to join onto a storage prefix
//!
//! Archive member names, request bodies and URL segments are attacker-controlled. Anything
//! that ends up in a storage key must first become a [`RelativePath`] via
//! [`normalize_upload_path`]; there is no other constructor.

mod path;
mod text;

pub use path::{normalize_upload_path, PathError, RelativePath};
pub use text::{NonEmptyText, TextError};
