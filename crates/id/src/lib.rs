//! Review session identifiers.
//!
//! Every upload session is named by an opaque identifier that doubles as the storage prefix
//! for all of its objects (`reviews/<id>/...`). Identifiers are the only access control the
//! system has, so they must be unguessable when generated and strictly validated when they
//! arrive from outside.
//!
//! ## Accepted form
//! - Length: 6 to 32 characters
//! - Characters: `A-Z`, `a-z`, `0-9`, `_` and `-`
//!
//! ## Generated form
//! [`ReviewId::new`] takes the first 12 characters of a random v4 UUID in simple form, e.g.
//! `550e8400e29b`.

mod service;

pub use service::{ReviewId, GENERATED_ID_LEN, MAX_ID_LEN, MIN_ID_LEN};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
