//! Content type and cache policy lookup for stored objects.

use crate::constants::{
    METADATA_CACHE_CONTROL, METADATA_FILE_NAME, OBJECT_CACHE_CONTROL, REVIEW_PAGE_CACHE_CONTROL,
    REVIEW_PAGE_NAME,
};
use bannershare_files::DEFAULT_CONTENT_TYPE;
use bannershare_types::RelativePath;

/// Content type for a file, decided by its extension (case-insensitive).
///
/// Unknown or missing extensions give `application/octet-stream`.
pub fn content_type_for(path: &str) -> &'static str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let Some((_, extension)) = file_name.rsplit_once('.') else {
        return DEFAULT_CONTENT_TYPE;
    };

    match extension.to_ascii_lowercase().as_str() {
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "woff2" => "font/woff2",
        "woff" => "font/woff",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Cache policy attached to an object when it is stored and when it is served.
pub fn cache_control_for(path: &RelativePath) -> &'static str {
    match path.as_str() {
        REVIEW_PAGE_NAME => REVIEW_PAGE_CACHE_CONTROL,
        METADATA_FILE_NAME => METADATA_CACHE_CONTROL,
        _ => OBJECT_CACHE_CONTROL,
    }
}
