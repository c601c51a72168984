#![deny(missing_docs)]

//! # Media Types
//!
//! Media type normalization and wildcard matching against declared `content` maps.

use indexmap::IndexMap;

/// Lowercases a media type and strips its parameters (`; charset=...`).
pub fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or(media_type)
        .trim()
        .to_ascii_lowercase()
}

/// Returns true for `application/json` and `+json` structured syntax suffixes.
pub fn is_json_media_type(media_type: &str) -> bool {
    let normalized = normalize_media_type(media_type);
    normalized == "application/json"
        || normalized == "application/*+json"
        || normalized.ends_with("+json")
}

/// Returns true for textual media types validated as a JSON string.
pub fn is_text_media_type(media_type: &str) -> bool {
    let normalized = normalize_media_type(media_type);
    normalized.starts_with("text/")
        || normalized == "application/xml"
        || normalized.ends_with("+xml")
}

/// Scores how specifically `pattern` matches `actual`.
///
/// Exact match scores 3, `type/*+suffix` style patterns 2, `type/*` 1, `*/*` 0.
/// Returns `None` when the pattern does not match.
pub fn media_type_specificity(pattern: &str, actual: &str) -> Option<i32> {
    let pattern = normalize_media_type(pattern);
    let actual = normalize_media_type(actual);

    if pattern == actual {
        return Some(3);
    }
    if pattern == "*/*" {
        return Some(0);
    }
    if let Some(idx) = pattern.find('*') {
        let (prefix, rest) = pattern.split_at(idx);
        let suffix = &rest[1..];
        if !prefix.is_empty() && !actual.starts_with(prefix) {
            return None;
        }
        if !suffix.is_empty() && !actual.ends_with(suffix) {
            return None;
        }
        let score = if !prefix.is_empty() && !suffix.is_empty() { 2 } else { 1 };
        return Some(score);
    }
    None
}

/// Picks the most specific declared media type matching `content_type`.
pub fn select_media_type<'a, V>(
    content: &'a IndexMap<String, V>,
    content_type: &str,
) -> Option<(&'a str, &'a V)> {
    let mut best: Option<(&'a str, &'a V, i32)> = None;
    for (key, value) in content.iter() {
        if let Some(score) = media_type_specificity(key, content_type) {
            let replace = match best.as_ref() {
                Some((_, _, best_score)) => score > *best_score,
                None => true,
            };
            if replace {
                best = Some((key.as_str(), value, score));
            }
        }
    }
    best.map(|(k, v, _)| (k, v))
}
