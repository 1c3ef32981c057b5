//! In-memory archive extraction.
//!
//! [`extract`] turns the bytes of a `.zip` into a list of [`FileEntry`] values with normalized
//! paths, skipping platform junk and enforcing the upload size limits as it goes. Member sizes
//! declared in the central directory are not trusted: each member is read through a bounded
//! reader, so an archive that lies about its sizes still cannot exhaust memory.

use crate::config::{format_bytes, UploadLimits};
use crate::content_type::content_type_for;
use crate::session::SessionFile;
use bannershare_types::{normalize_upload_path, RelativePath};
use bytes::Bytes;
use std::collections::HashSet;
use std::io::{Cursor, Read};
use zip::ZipArchive;

fn human(limit: &u64) -> String {
    format_bytes(*limit)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("Please upload a .zip file.")]
    NotZip,
    #[error("ZIP is larger than {}", human(.limit))]
    ArchiveTooLarge { limit: u64 },
    #[error("Unable to read this ZIP file")]
    Unreadable(String),
    #[error("ZIP contains invalid paths")]
    InvalidPath(String),
    #[error("ZIP contains duplicate paths")]
    DuplicatePath(String),
    #[error("One or more files exceed {}", human(.limit))]
    FileTooLarge { path: String, limit: u64 },
    #[error("ZIP is larger than {}", human(.limit))]
    TotalTooLarge { limit: u64 },
    #[error("No banner HTML files found")]
    NoBannerMarkup,
    #[error("ZIP is empty")]
    Empty,
}

impl ExtractError {
    /// True for failures caused by a size limit rather than archive content.
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            ExtractError::ArchiveTooLarge { .. }
                | ExtractError::FileTooLarge { .. }
                | ExtractError::TotalTooLarge { .. }
        )
    }
}

/// One extracted file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub path: RelativePath,
    pub data: Bytes,
    pub content_type: &'static str,
}

impl FileEntry {
    pub fn byte_size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// The result of a successful extraction.
#[derive(Clone, Debug, Default)]
pub struct ExtractedArchive {
    pub files: Vec<FileEntry>,
    pub total_bytes: u64,
}

impl ExtractedArchive {
    /// Path and size of every file, in archive order.
    pub fn manifest(&self) -> Vec<SessionFile> {
        self.files
            .iter()
            .map(|file| SessionFile::new(file.path.clone(), file.byte_size()))
            .collect()
    }
}

/// Checks that can run before the archive is opened.
pub fn precheck(file_name: &str, archive_len: u64, limits: &UploadLimits) -> Result<(), ExtractError> {
    if !file_name.to_ascii_lowercase().ends_with(".zip") {
        return Err(ExtractError::NotZip);
    }
    if archive_len > limits.max_total_size() {
        return Err(ExtractError::ArchiveTooLarge {
            limit: limits.max_total_size(),
        });
    }
    Ok(())
}

/// macOS resource forks and Finder metadata.
pub fn is_platform_junk(name: &str) -> bool {
    name.starts_with("__MACOSX/")
        || name.contains("/__MACOSX/")
        || name.ends_with(".DS_Store")
        || name.contains("/.DS_Store")
}

/// Extracts every regular file from `archive_bytes`.
///
/// Directory entries and platform junk are skipped. All other members must have a path that
/// normalizes cleanly, and paths must be unique after normalization.
///
/// # Errors
///
/// - [`ExtractError::Unreadable`] if the container or a member cannot be decoded
/// - [`ExtractError::InvalidPath`] / [`ExtractError::DuplicatePath`] for unusable member names
/// - [`ExtractError::FileTooLarge`] / [`ExtractError::TotalTooLarge`] when a limit is crossed
/// - [`ExtractError::NoBannerMarkup`] if no nested `.html` file exists, including when
///   nothing remains after filtering
/// - [`ExtractError::Empty`] if the surviving list is empty
pub fn extract(archive_bytes: &[u8], limits: &UploadLimits) -> Result<ExtractedArchive, ExtractError> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|e| ExtractError::Unreadable(e.to_string()))?;

    let mut extracted = ExtractedArchive::default();
    let mut seen = HashSet::new();
    let mut has_banner_markup = false;

    for index in 0..archive.len() {
        let mut member = archive
            .by_index(index)
            .map_err(|e| ExtractError::Unreadable(e.to_string()))?;

        let name = member.name().replace('\\', "/");
        if member.is_dir() || name.ends_with('/') || is_platform_junk(&name) {
            continue;
        }

        let path = normalize_upload_path(&name).map_err(|_| ExtractError::InvalidPath(name.clone()))?;
        if !seen.insert(path.clone()) {
            return Err(ExtractError::DuplicatePath(path.to_string()));
        }

        let too_large = || ExtractError::FileTooLarge {
            path: path.to_string(),
            limit: limits.max_file_size(),
        };
        if member.size() > limits.max_file_size() {
            return Err(too_large());
        }

        let mut data = Vec::with_capacity(member.size() as usize);
        (&mut member)
            .take(limits.max_file_size() + 1)
            .read_to_end(&mut data)
            .map_err(|e| ExtractError::Unreadable(e.to_string()))?;
        let size = data.len() as u64;
        if size > limits.max_file_size() {
            return Err(too_large());
        }

        extracted.total_bytes += size;
        if extracted.total_bytes > limits.max_total_size() {
            return Err(ExtractError::TotalTooLarge {
                limit: limits.max_total_size(),
            });
        }

        has_banner_markup |= path.is_nested() && path.is_html();
        extracted.files.push(FileEntry {
            content_type: content_type_for(path.as_str()),
            path,
            data: Bytes::from(data),
        });
    }

    if !has_banner_markup {
        return Err(ExtractError::NoBannerMarkup);
    }
    if extracted.files.is_empty() {
        return Err(ExtractError::Empty);
    }

    tracing::debug!(
        files = extracted.files.len(),
        total_bytes = extracted.total_bytes,
        "archive extracted"
    );
    Ok(extracted)
}
