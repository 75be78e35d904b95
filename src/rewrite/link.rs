//! `<link>` and `<a>` href rewriting.
//!
//! | href | `<a>` | `<link>` |
//! |------|-------|----------|
//! | `http://localhost:2368/foo/` | `/foo/` | `http://example.com/blog/foo/` |
//! | `/posts/x/index.html` | `/posts/x/` | `/posts/x/` |
//! | `/rss/index.html` | `/rss/index.rss` | `/rss/index.rss` |
//! | `https://other.org/` | unchanged | unchanged |
//!
//! Anchors become host-relative so the site works from any host; `<link>`
//! elements (canonical, alternate, feeds) need an absolute URL and are
//! reattached to the target.

use super::markup::{Attr, ElementKind, edit_elements};
use super::{Change, ParseMode, Pass, RewriteConfig, RewriteError};
use crate::utils::path::is_external_link;

const INDEX_FILE: &str = "index.html";

pub fn rewrite_links(
    text: &str,
    mode: ParseMode,
    config: &RewriteConfig,
    changes: &mut Vec<Change>,
) -> Result<String, RewriteError> {
    edit_elements(text, mode, |element| {
        let kind = element.kind();
        if kind == ElementKind::Meta {
            return Ok(());
        }
        let Some(href) = element.get(Attr::Href).filter(|h| !h.is_empty()) else {
            return Ok(());
        };
        let old = href.to_string();

        let Some(new) = rewrite_href(kind, &old, config)? else {
            return Ok(());
        };
        if new == old {
            return Ok(());
        }

        element.set(Attr::Href, new.clone());
        changes.push(Change {
            pass: Pass::Link,
            element: kind,
            old,
            new,
        });
        Ok(())
    })
}

fn rewrite_href(
    kind: ElementKind,
    href: &str,
    config: &RewriteConfig,
) -> Result<Option<String>, RewriteError> {
    if let Some(suffix) = config.source().strip(href) {
        return match kind {
            ElementKind::Anchor => Ok(Some(suffix.to_string())),
            _ => {
                let target = config.require_target("<link> references to the source domain")?;
                Ok(Some(target.join(suffix)))
            }
        };
    }

    if is_absolute(href) {
        return Ok(None);
    }
    Ok(clean_index(href, config.feed_dir(), config.feed_extension()))
}

/// Absolute means a scheme (`https:`, `mailto:`) or protocol-relative `//`.
pub fn is_absolute(href: &str) -> bool {
    href.starts_with("//") || is_external_link(href)
}

/// Drop a trailing `/index.html`, or point the feed index at its renamed
/// file. Query and fragment are kept. Returns `None` when nothing applies.
pub fn clean_index(href: &str, feed_dir: &str, feed_extension: &str) -> Option<String> {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    let (path, rest) = href.split_at(end);

    let prefix = path.strip_suffix(INDEX_FILE)?;
    if !prefix.is_empty() && !prefix.ends_with('/') {
        return None;
    }

    let feed_suffix = format!("{feed_dir}/");
    let is_feed = prefix
        .strip_suffix(&feed_suffix)
        .is_some_and(|p| p.is_empty() || p.ends_with('/'));

    if is_feed {
        return Some(format!("{prefix}index.{feed_extension}{rest}"));
    }
    if prefix.is_empty() {
        // Bare `index.html`: no directory to collapse to
        return None;
    }
    Some(format!("{prefix}{rest}"))
}
