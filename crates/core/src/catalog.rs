//! Banner catalog derivation.
//!
//! Given the file list of a finalized session, [`build_catalog`] decides which HTML files are
//! banners and in what order the review page shows them.
//!
//! - Archives often wrap everything in one export folder; when every nested file shares a
//!   single top-level folder, that folder is ignored for grouping.
//! - A top-level folder named `<width>x<height>` is a size folder. Each size folder yields one
//!   banner; `index.html` wins over any other HTML file in it.
//! - Without any size folder, every remaining HTML file becomes a banner, grouped by its
//!   top-level folder (or its own name for top-level files).
//!
//! The result only depends on the set of files, never on their order.

use crate::constants::{ENTRY_POINT_NAME, HTML_EXTENSION, REVIEW_PAGE_NAME};
use crate::session::SessionFile;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// One reviewable banner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerEntry {
    pub id: String,
    pub label: String,
    /// Reference to the entry point, relative to the review page (`./<storage path>`).
    pub display_path: String,
}

/// Parsed `<width>x<height>` identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeKey {
    pub width: u64,
    pub height: u64,
}

impl SizeKey {
    /// Parses ASCII digits, a lowercase `x`, ASCII digits. Values too large for `u64` saturate.
    pub fn parse(id: &str) -> Option<Self> {
        let (width, height) = id.split_once('x')?;
        Some(Self {
            width: parse_digits(width)?,
            height: parse_digits(height)?,
        })
    }

    fn area(&self) -> u128 {
        u128::from(self.width) * u128::from(self.height)
    }
}

fn parse_digits(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(raw.parse::<u64>().unwrap_or(u64::MAX))
}

struct Candidate<'a> {
    weight: u8,
    storage_path: &'a str,
}

fn weight(file_name: &str) -> u8 {
    if file_name.eq_ignore_ascii_case(ENTRY_POINT_NAME) {
        2
    } else {
        1
    }
}

/// Keeps the first candidate unless a later one strictly outweighs it.
fn offer<'a>(groups: &mut BTreeMap<String, Candidate<'a>>, id: &str, candidate: Candidate<'a>) {
    match groups.get(id) {
        Some(current) if current.weight >= candidate.weight => {}
        _ => {
            groups.insert(id.to_string(), candidate);
        }
    }
}

/// The one top-level folder shared by every nested file, if there is exactly one.
fn common_prefix<'a>(files: &[&'a SessionFile]) -> Option<&'a str> {
    let folders: BTreeSet<&str> = files
        .iter()
        .filter(|file| file.path.is_nested())
        .map(|file| file.path.first_segment())
        .collect();
    if folders.len() == 1 {
        folders.into_iter().next()
    } else {
        None
    }
}

/// Builds the ordered banner list for a session.
pub fn build_catalog(files: &[SessionFile]) -> Vec<BannerEntry> {
    let mut ordered: Vec<&SessionFile> = files.iter().collect();
    ordered.sort_by(|a, b| a.path.cmp(&b.path));
    ordered.dedup_by(|a, b| a.path == b.path);

    let prefix = common_prefix(&ordered);
    let mut sized: BTreeMap<String, Candidate> = BTreeMap::new();
    let mut fallback: BTreeMap<String, Candidate> = BTreeMap::new();

    for file in &ordered {
        let storage_path = file.path.as_str();
        let display = match prefix {
            Some(prefix) if file.path.is_nested() => storage_path
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(storage_path),
            _ => storage_path,
        };

        if !display.to_ascii_lowercase().ends_with(HTML_EXTENSION)
            || storage_path == REVIEW_PAGE_NAME
            || display == REVIEW_PAGE_NAME
        {
            continue;
        }

        let file_name = display.rsplit('/').next().unwrap_or(display);
        let candidate = Candidate {
            weight: weight(file_name),
            storage_path,
        };

        match display.split_once('/') {
            Some((folder, _)) if SizeKey::parse(folder).is_some() => {
                offer(&mut sized, folder, candidate)
            }
            Some((folder, _)) => offer(&mut fallback, folder, candidate),
            // Directly inside the stripped wrapper folder: the wrapper names the banner.
            None if file.path.is_nested() => {
                offer(&mut fallback, file.path.first_segment(), candidate)
            }
            None => {
                let stem = &file_name[..file_name.len() - HTML_EXTENSION.len()];
                offer(&mut fallback, stem, candidate)
            }
        }
    }

    let groups = if sized.is_empty() { fallback } else { sized };
    let mut entries: Vec<BannerEntry> = groups
        .into_iter()
        .map(|(id, candidate)| BannerEntry {
            label: id.clone(),
            display_path: format!("./{}", candidate.storage_path),
            id,
        })
        .collect();
    entries.sort_by(|a, b| compare_ids(&a.id, &b.id));
    entries
}

/// Size ids first, by area then width then height; everything else after, lexicographically.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (SizeKey::parse(a), SizeKey::parse(b)) {
        (Some(sa), Some(sb)) => sa
            .area()
            .cmp(&sb.area())
            .then(sa.width.cmp(&sb.width))
            .then(sa.height.cmp(&sb.height))
            .then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
