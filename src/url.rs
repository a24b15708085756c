//! Helpers for composing permalinks and absolute links out of path segments.

use chrono::{DateTime, Utc};

/// Joins URL segments with exactly one `/` between them. A scheme prefix on
/// the first segment (e.g., `https://`) is preserved, leading slashes on later
/// segments and runs of slashes anywhere in the path are collapsed, and a
/// trailing slash on the final segment is kept. Empty segments are skipped
/// and an empty result becomes `/`.
pub fn normalize_url<S: AsRef<str>>(parts: &[S]) -> String {
    let mut joined = String::new();
    for part in parts.iter().map(AsRef::as_ref).filter(|p| !p.is_empty()) {
        if !joined.is_empty() && !joined.ends_with('/') {
            joined.push('/');
        }
        joined.push_str(part);
    }

    let (scheme, path) = match joined.find("://") {
        Some(i) => joined.split_at(i + 3),
        None => ("", joined.as_str()),
    };

    let mut normalized = String::with_capacity(joined.len());
    normalized.push_str(scheme);
    let mut last_was_slash = false;
    for c in path.chars() {
        if c == '/' && last_was_slash {
            continue;
        }
        last_was_slash = c == '/';
        normalized.push(c);
    }

    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Builds the date-and-slug path used for posts without an explicit `id`,
/// e.g. `2021/03/01/hello-world`.
pub fn date_path(date: &DateTime<Utc>, slug: &str) -> String {
    format!("{}/{}", date.format("%Y/%m/%d"), slug)
}
