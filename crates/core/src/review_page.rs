//! Review page rendering.
//!
//! The page is a single self-contained HTML document. The catalog is embedded as a JSON array
//! inside an inline `<script>`, so the JSON is escaped to stay inert in that context.

use crate::catalog::BannerEntry;
use crate::{ReviewError, ReviewResult};
use bannershare_id::ReviewId;

const TEMPLATE: &str = include_str!("../templates/review.html");
const BANNERS_PLACEHOLDER: &str = "{{BANNERS_JSON}}";
const REVIEW_ID_PLACEHOLDER: &str = "{{REVIEW_ID}}";

/// Renders the review page for `catalog`.
///
/// An empty catalog still renders; the page then shows its empty state.
pub fn render(catalog: &[BannerEntry], id: &ReviewId) -> ReviewResult<String> {
    let json = serde_json::to_string(catalog).map_err(ReviewError::Serialization)?;
    Ok(TEMPLATE
        .replace(REVIEW_ID_PLACEHOLDER, id.as_str())
        .replace(BANNERS_PLACEHOLDER, &script_safe(&json)))
}

/// Escapes characters that could end a `<script>` element or break a JS string literal.
fn script_safe(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            other => out.push(other),
        }
    }
    out
}
