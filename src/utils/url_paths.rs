//! URL path resolution for extra file references.
//!
//! Extra files are addressed two ways: by a *relative key* (what consumers see in
//! `extraFiles`) and by an *absolute URL* (what is fetched and what cycle
//! detection compares). This module converts between the two.
//!
//! Keys handed to consumers are always relative to the entrypoint, no matter
//! how deep in the graph a file was discovered. A file found two hops away is
//! resolved to an absolute URL against the file that declared it, and then
//! re-keyed against the entrypoint with [`make_relative_key`].

use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use url::Url;

/// Returns true if `reference` has a `scheme://` prefix.
#[must_use]
pub fn has_scheme(reference: &str) -> bool {
    let Some(index) = reference.find("://") else {
        return false;
    };
    let scheme = &reference[..index];
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Returns true if `reference` is rooted at the filesystem root.
#[must_use]
pub fn is_filesystem_absolute(reference: &str) -> bool {
    reference.starts_with('/')
}

/// Returns true if `reference` is absolute: it has a URI scheme or starts with `/`.
///
/// # Examples
///
/// ```
/// use codevar::utils::url_paths::is_absolute;
///
/// assert!(is_absolute("https://example.com/a.js"));
/// assert!(is_absolute("file:///a.js"));
/// assert!(is_absolute("/a.js"));
/// assert!(!is_absolute("../a.js"));
/// assert!(!is_absolute("a.js"));
/// ```
#[must_use]
pub fn is_absolute(reference: &str) -> bool {
    has_scheme(reference) || is_filesystem_absolute(reference)
}

/// Resolve `reference` against `base_url` using standard URL resolution.
///
/// Absolute references are returned unchanged.
///
/// # Errors
///
/// Returns the URL parser's error when `base_url` is not a valid URL or the
/// joined result cannot be constructed.
///
/// # Examples
///
/// ```
/// use codevar::utils::url_paths::resolve_against;
///
/// let url = resolve_against("file:///a/b/entry.js", "../a.js").unwrap();
/// assert_eq!(url, "file:///a/a.js");
/// ```
pub fn resolve_against(base_url: &str, reference: &str) -> Result<String, url::ParseError> {
    if is_absolute(reference) {
        return Ok(reference.to_string());
    }
    Ok(Url::parse(base_url)?.join(reference)?.to_string())
}

/// Express `resolved_url` relative to the directory of `base_url`.
///
/// Returns `None` when the two URLs do not share scheme, host and port, or
/// when either is not a hierarchical URL. Same-directory files come back as a
/// bare file name (`util.js`), parents as `../` chains.
///
/// # Examples
///
/// ```
/// use codevar::utils::url_paths::make_relative_key;
///
/// let key = make_relative_key("file:///a/b/entry.js", "file:///index.js");
/// assert_eq!(key.as_deref(), Some("../../index.js"));
/// ```
#[must_use]
pub fn make_relative_key(base_url: &str, resolved_url: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    let target = Url::parse(resolved_url).ok()?;

    if base.scheme() != target.scheme()
        || base.host_str() != target.host_str()
        || base.port_or_known_default() != target.port_or_known_default()
    {
        return None;
    }

    // Keys are file names, so compare and emit decoded segments
    let base_segments: Vec<Cow<'_, str>> = base.path_segments()?.map(decode_segment).collect();
    let target_segments: Vec<Cow<'_, str>> =
        target.path_segments()?.map(decode_segment).collect();

    // Last segment of the base is its file name (empty for directory URLs)
    let base_dir = &base_segments[..base_segments.len().saturating_sub(1)];
    let (target_name, target_dir) = target_segments.split_last()?;

    let common = base_dir.iter().zip(target_dir.iter()).take_while(|(a, b)| a == b).count();

    let mut key = "../".repeat(base_dir.len() - common);
    for segment in &target_dir[common..] {
        key.push_str(segment);
        key.push('/');
    }
    key.push_str(target_name);

    if let Some(query) = target.query() {
        key.push('?');
        key.push_str(query);
    }

    Some(key)
}

fn decode_segment(segment: &str) -> Cow<'_, str> {
    percent_decode_str(segment).decode_utf8_lossy()
}

/// Last path segment of a URL, used as a display file name.
///
/// Falls back to splitting on `/` when the input is not a valid URL.
#[must_use]
pub fn file_name_from_url(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url)
        && let Some(name) = parsed.path_segments().and_then(|mut s| s.next_back())
        && !name.is_empty()
    {
        return decode_segment(name).into_owned();
    }
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url).to_string()
}

/// Extension of a file name without the leading dot.
#[must_use]
pub fn extension_of(file_name: &str) -> Option<&str> {
    let name = file_name.rsplit('/').next().unwrap_or(file_name);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(index) => Some(&name[index + 1..]),
    }
}
