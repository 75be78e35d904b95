//! URL to filesystem path resolution.

use percent_encoding::percent_decode_str;
use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

/// Resolve a request URL to a file under `root`.
///
/// Directories resolve to `index.html`, then to `index.<feed_extension>` so
/// `/rss/` serves the renamed feed.
pub fn resolve_path(url: &str, root: &Path, feed_extension: &str) -> Option<PathBuf> {
    let clean = normalize_url(url);

    // Reject paths with suspicious patterns early
    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    // Canonicalize to resolve symlinks and verify path is under root
    let canonical = root.join(&clean).canonicalize().ok()?;
    let root_canonical = root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    if canonical.is_dir() {
        return ["html", feed_extension]
            .iter()
            .map(|ext| canonical.join(format!("index.{ext}")))
            .find(|index| index.is_file());
    }

    None
}

/// Decode, strip query string and fragment, trim slashes.
fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(Cow::into_owned)
        .unwrap_or_default();
    decoded.trim_matches('/').to_string()
}
