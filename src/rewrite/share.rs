//! Absolute-to-absolute retargeting for share links and social meta tags.
//!
//! All three passes need a target domain and fail before touching the
//! document when it is missing.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use super::markup::{Attr, Element, ElementKind, MetaKind, edit_elements};
use super::{BaseUrl, Change, ParseMode, Pass, RewriteConfig, RewriteError};

/// Anchors inside `.share_links`. Share services carry the page URL either
/// as the href itself or as a query parameter (`?url=...`, possibly
/// percent-encoded).
pub fn rewrite_share_links(
    text: &str,
    mode: ParseMode,
    config: &RewriteConfig,
    changes: &mut Vec<Change>,
) -> Result<String, RewriteError> {
    let target = config.require_target("share links")?;
    retarget(text, mode, changes, Pass::Share, config.source(), target, |e| {
        (e.kind() == ElementKind::Anchor && e.in_share_links()).then_some(Attr::Href)
    })
}

/// `og:url` / `twitter:url`.
pub fn rewrite_meta_urls(
    text: &str,
    mode: ParseMode,
    config: &RewriteConfig,
    changes: &mut Vec<Change>,
) -> Result<String, RewriteError> {
    let target = config.require_target("og:url meta tags")?;
    retarget(text, mode, changes, Pass::MetaUrl, config.source(), target, |e| {
        (e.meta_kind() == Some(MetaKind::Url)).then_some(Attr::Content)
    })
}

/// `og:image` / `twitter:image`, pointed at the target without its static
/// segment.
pub fn rewrite_meta_images(
    text: &str,
    mode: ParseMode,
    config: &RewriteConfig,
    changes: &mut Vec<Change>,
) -> Result<String, RewriteError> {
    let base = config.require_image_base()?;
    retarget(text, mode, changes, Pass::MetaImage, config.source(), base, |e| {
        (e.meta_kind() == Some(MetaKind::Image)).then_some(Attr::Content)
    })
}

fn retarget<S>(
    text: &str,
    mode: ParseMode,
    changes: &mut Vec<Change>,
    pass: Pass,
    source: &BaseUrl,
    target: &BaseUrl,
    select: S,
) -> Result<String, RewriteError>
where
    S: Fn(&Element) -> Option<Attr>,
{
    edit_elements(text, mode, |element| {
        let Some(attr) = select(element) else {
            return Ok(());
        };
        let Some(old) = element.get(attr).filter(|v| !v.is_empty()) else {
            return Ok(());
        };
        let old = old.to_string();

        let new = match source.strip(&old) {
            Some(suffix) => target.join(suffix),
            None => match retarget_query(&old, source, target) {
                Some(new) => new,
                None => return Ok(()),
            },
        };

        element.set(attr, new.clone());
        changes.push(Change {
            pass,
            element: element.kind(),
            old,
            new,
        });
        Ok(())
    })
}

/// Retarget query parameter values that point at `source`.
fn retarget_query(url: &str, source: &BaseUrl, target: &BaseUrl) -> Option<String> {
    let (base, rest) = url.split_once('?')?;
    let (query, fragment) = match rest.split_once('#') {
        Some((query, fragment)) => (query, Some(fragment)),
        None => (rest, None),
    };

    let mut changed = false;
    let params: Vec<String> = query
        .split('&')
        .map(|param| {
            let retargeted = param.split_once('=').and_then(|(key, value)| {
                retarget_value(value, source, target).map(|value| format!("{key}={value}"))
            });
            match retargeted {
                Some(param) => {
                    changed = true;
                    param
                }
                None => param.to_string(),
            }
        })
        .collect();

    if !changed {
        return None;
    }
    let mut out = format!("{base}?{}", params.join("&"));
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    Some(out)
}

/// Everything but the unreserved characters of RFC 3986.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn retarget_value(value: &str, source: &BaseUrl, target: &BaseUrl) -> Option<String> {
    if let Some(suffix) = source.strip(value) {
        return Some(target.join(suffix));
    }

    let decoded = percent_decode_str(value).decode_utf8().ok()?;
    if decoded == value {
        return None;
    }
    let suffix = source.strip(&decoded)?;
    Some(utf8_percent_encode(&target.join(suffix), QUERY_VALUE).to_string())
}
