//! Utility functions and helpers.

pub mod date;
pub mod report;
pub mod text;

use url::Url;

/// Append a path segment to a base URL, rejecting blank identifiers.
///
/// Returns `None` when `id` is empty after trimming, so callers never build
/// a URL that points at a listing page instead of a posting.
pub fn join_id(base: &str, id: &str) -> Option<String> {
    let id = id.trim();
    if id.is_empty() {
        return None;
    }
    let mut url = Url::parse(base).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(id);
    Some(url.to_string())
}

/// Accept an absolute http(s) URL.
pub fn valid_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
