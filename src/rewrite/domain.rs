//! Base URLs for the mirrored origin and the deployment destination.
//!
//! A [`BaseUrl`] is parsed once from configuration and then used to
//! recognize and rebuild references:
//!
//! | Operation | Example |
//! |-----------|---------|
//! | [`BaseUrl::parse`] | `localhost:2368` → `http://localhost:2368` |
//! | [`BaseUrl::strip`] | `http://localhost:2368/foo/` → `/foo/` |
//! | [`BaseUrl::join`] | `/foo/` → `http://example.com/blog/foo/` |
//! | [`BaseUrl::without_segment`] | `http://example.com/static` → `http://example.com` |
//!
//! Matching compares the parsed host and port rather than searching for a
//! substring, so a source address that merely appears inside another URL's
//! path or query is not mistaken for a reference to the mirrored site.

use std::fmt;

use url::Url;

use super::RewriteError;

/// Scheme assumed when a domain is given as a bare host (`localhost:2368`).
const DEFAULT_SCHEME: &str = "http";

/// A parsed base URL: scheme, host, optional explicit port and a path
/// prefix without trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    scheme: String,
    host: String,
    port: Option<u16>,
    path: String,
    serialized: String,
}

impl BaseUrl {
    /// Parse a base URL, prefixing `http://` when no scheme is present.
    pub fn parse(input: &str) -> Result<Self, RewriteError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RewriteError::InvalidDomain {
                value: input.to_string(),
                reason: "domain is empty".to_string(),
            });
        }

        let with_scheme = if input.contains("://") {
            input.to_string()
        } else {
            format!("{DEFAULT_SCHEME}://{input}")
        };

        let url = Url::parse(&with_scheme).map_err(|e| RewriteError::InvalidDomain {
            value: input.to_string(),
            reason: e.to_string(),
        })?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| RewriteError::InvalidDomain {
                value: input.to_string(),
                reason: "missing host".to_string(),
            })?
            .to_string();

        Ok(Self::from_parts(
            url.scheme().to_string(),
            host,
            url.port(),
            url.path().trim_end_matches('/').to_string(),
        ))
    }

    fn from_parts(scheme: String, host: String, port: Option<u16>, path: String) -> Self {
        let serialized = match port {
            Some(port) => format!("{scheme}://{host}:{port}{path}"),
            None => format!("{scheme}://{host}{path}"),
        };
        Self {
            scheme,
            host,
            port,
            path,
            serialized,
        }
    }

    /// Serialized form without trailing slash, e.g. `http://example.com/blog`.
    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Path prefix without trailing slash (`""` for a bare host).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Append a host-relative suffix (as returned by [`BaseUrl::strip`]).
    pub fn join(&self, suffix: &str) -> String {
        format!("{}{}", self.serialized, suffix)
    }

    /// Return the part of `reference` that follows this base, if the
    /// reference points at this base.
    ///
    /// Accepts `http://`, `https://` and protocol-relative (`//host`) forms.
    /// The suffix keeps its original text (path, query and fragment), so an
    /// exact match yields `""`.
    pub fn strip<'r>(&self, reference: &'r str) -> Option<&'r str> {
        let rest = split_authority_start(reference)?;
        let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(end);

        if !self.matches_authority(authority) {
            return None;
        }

        if self.path.is_empty() {
            return Some(tail);
        }

        let after = tail.strip_prefix(self.path.as_str())?;
        match after.chars().next() {
            None | Some('/' | '?' | '#') => Some(after),
            Some(_) => None,
        }
    }

    /// Whether `reference` points at this base.
    pub fn contains(&self, reference: &str) -> bool {
        self.strip(reference).is_some()
    }

    /// Copy of this base with every path segment equal to `segment` removed.
    pub fn without_segment(&self, segment: &str) -> Self {
        let path: String = self
            .path
            .split('/')
            .filter(|s| !s.is_empty() && *s != segment)
            .map(|s| format!("/{s}"))
            .collect();
        Self::from_parts(self.scheme.clone(), self.host.clone(), self.port, path)
    }

    fn matches_authority(&self, authority: &str) -> bool {
        if authority.is_empty() {
            return false;
        }
        let Ok(url) = Url::parse(&format!("{}://{authority}", self.scheme)) else {
            return false;
        };
        url.host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(&self.host))
            && url.port() == self.port
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialized)
    }
}

/// Skip the scheme (`http:`/`https:`) and the `//` that introduces the
/// authority. Returns `None` for anything that is not a web URL.
fn split_authority_start(reference: &str) -> Option<&str> {
    if let Some(rest) = reference.strip_prefix("//") {
        return Some(rest);
    }
    let (scheme, rest) = reference.split_once("://")?;
    (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")).then_some(rest)
}
