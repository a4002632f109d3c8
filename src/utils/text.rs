// src/utils/text.rs

//! Text cleanup for upstream payloads.

use scraper::Html;
use unicode_segmentation::UnicodeSegmentation;

/// Longest description kept on a record, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "br", "div", "li", "ul", "ol", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "section",
    "article", "blockquote", "pre", "table",
];

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Convert an HTML fragment to plain text.
///
/// Link targets and images disappear with the markup; block elements become
/// line breaks and runs of whitespace collapse to single spaces.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut raw = String::with_capacity(html.len());

    for node in fragment.root_element().descendants() {
        if let Some(element) = node.value().as_element() {
            if BLOCK_ELEMENTS.contains(&element.name()) {
                raw.push('\n');
            }
        } else if let Some(text) = node.value().as_text() {
            let skipped = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
            });
            if !skipped {
                raw.push_str(text);
            }
        }
    }

    raw.lines()
        .map(normalize_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep at most `max` user-perceived characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.graphemes(true).take(max).collect()
}

/// HTML description to bounded plain text; `None` when nothing is left.
pub fn clean_description(html: &str) -> Option<String> {
    let text = html_to_text(html);
    if text.is_empty() {
        None
    } else {
        Some(truncate_chars(&text, MAX_DESCRIPTION_CHARS))
    }
}

/// Trimmed value or `None` when blank.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
