//! Best-effort file extension inference from a URL.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static FILE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_0-9.\-()%]+$").expect("valid file name regex"));

/// Extract the file extension from the last path segment of `url`.
///
/// The fragment and query are ignored. Returns `None` when the segment
/// contains characters outside the safe file-name set or has no extension.
pub fn file_extension_from_url(url: &str) -> Option<&str> {
    let mut rest = url;
    if let Some(pos) = rest.rfind('#').filter(|&p| p > 0) {
        rest = &rest[..pos];
    }
    if let Some(pos) = rest.rfind('?').filter(|&p| p > 0) {
        rest = &rest[..pos];
    }

    let file_name = match rest.rfind('/') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };

    if file_name.is_empty() || !FILE_NAME.is_match(file_name) {
        return None;
    }

    file_name
        .rfind('.')
        .map(|dot| &file_name[dot + 1..])
        .filter(|ext| !ext.is_empty())
}

/// Like [`file_extension_from_url`], falling back to `default` when nothing is inferable.
pub fn extension_or<'a>(url: &'a str, default: &'a str) -> &'a str {
    file_extension_from_url(url).unwrap_or(default)
}
