//! Pure per-document rewrite core.
//!
//! [`rewrite_document`] takes the text of one mirrored document and returns
//! the rewritten text plus a log of every reference it changed. No I/O
//! happens here; the pipeline driver reads and writes files.
//!
//! Passes run in a fixed order, each re-parsing the output of the previous:
//!
//! | Pass | Elements | Attribute |
//! |------|----------|-----------|
//! | link | `<link>`, `<a>` | `href` |
//! | share | `<a>` inside `.share_links` | `href` |
//! | meta url | `og:url`, `twitter:url` | `content` |
//! | meta image | `og:image`, `twitter:image` | `content` |

pub mod domain;
mod link;
pub mod markup;
mod share;

use std::fmt;

use thiserror::Error;

pub use domain::BaseUrl;
use markup::ElementKind;

/// Path segment dropped from the target when building image URLs.
pub const DEFAULT_STATIC_SEGMENT: &str = "static";
/// Directory holding the feed document.
pub const DEFAULT_FEED_DIR: &str = "rss";
/// Extension the feed document is renamed to.
pub const DEFAULT_FEED_EXTENSION: &str = "rss";

// ============================================================================
// Errors
// ============================================================================

/// How a document is tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// HTML: lenient about void elements, unquoted attributes and bare `&`.
    Markup,
    /// RSS/Atom: well-formed XML.
    Feed,
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Markup => "markup",
            Self::Feed => "feed",
        })
    }
}

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("target domain is required to rewrite {0} (set `site.target` or pass --target-domain)")]
    MissingTarget(&'static str),

    #[error("invalid domain `{value}`: {reason}")]
    InvalidDomain { value: String, reason: String },

    #[error("{mode} parse error at byte {position}")]
    Parse {
        mode: ParseMode,
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("malformed attribute on <{element}>")]
    Attribute {
        element: String,
        #[source]
        source: quick_xml::events::attributes::AttrError,
    },

    #[error("rewritten document is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("failed to serialize document")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize document")]
    Xml(#[from] quick_xml::Error),
}

impl RewriteError {
    /// Errors scoped to a single document (the run may continue).
    pub const fn is_document_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::Attribute { .. } | Self::Encoding(_)
        )
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Immutable settings shared by every pass.
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    source: BaseUrl,
    target: Option<BaseUrl>,
    /// Target with the static segment removed, for `og:image` values.
    image_base: Option<BaseUrl>,
    static_segment: String,
    feed_dir: String,
    feed_extension: String,
}

impl RewriteConfig {
    /// Build a configuration. An empty `target` counts as absent.
    pub fn new(source: &str, target: Option<&str>) -> Result<Self, RewriteError> {
        let source = BaseUrl::parse(source)?;
        let target = target
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(BaseUrl::parse)
            .transpose()?;

        let mut config = Self {
            source,
            target,
            image_base: None,
            static_segment: DEFAULT_STATIC_SEGMENT.to_string(),
            feed_dir: DEFAULT_FEED_DIR.to_string(),
            feed_extension: DEFAULT_FEED_EXTENSION.to_string(),
        };
        config.refresh_image_base();
        Ok(config)
    }

    pub fn with_static_segment(mut self, segment: &str) -> Self {
        self.static_segment = segment.trim_matches('/').to_string();
        self.refresh_image_base();
        self
    }

    pub fn with_feed(mut self, dir: &str, extension: &str) -> Self {
        self.feed_dir = dir.trim_matches('/').to_string();
        self.feed_extension = extension.trim_start_matches('.').to_string();
        self
    }

    fn refresh_image_base(&mut self) {
        self.image_base = self
            .target
            .as_ref()
            .map(|t| t.without_segment(&self.static_segment));
    }

    pub fn source(&self) -> &BaseUrl {
        &self.source
    }

    pub fn target(&self) -> Option<&BaseUrl> {
        self.target.as_ref()
    }

    /// The target, or a configuration error naming what needed it.
    pub fn require_target(&self, purpose: &'static str) -> Result<&BaseUrl, RewriteError> {
        self.target.as_ref().ok_or(RewriteError::MissingTarget(purpose))
    }

    pub fn require_image_base(&self) -> Result<&BaseUrl, RewriteError> {
        self.image_base
            .as_ref()
            .ok_or(RewriteError::MissingTarget("og:image meta tags"))
    }

    pub fn feed_dir(&self) -> &str {
        &self.feed_dir
    }

    pub fn feed_extension(&self) -> &str {
        &self.feed_extension
    }
}

// ============================================================================
// Change log
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Link,
    Share,
    MetaUrl,
    MetaImage,
}

impl Pass {
    /// Log module name for this pass.
    pub const fn module(self) -> &'static str {
        match self {
            Self::Link => "link",
            Self::Share => "share",
            Self::MetaUrl | Self::MetaImage => "meta",
        }
    }
}

/// One rewritten reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub pass: Pass,
    pub element: ElementKind,
    pub old: String,
    pub new: String,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.old, self.new)
    }
}

#[derive(Debug)]
pub struct Rewritten {
    pub text: String,
    pub changes: Vec<Change>,
}

/// Run all passes over one document.
pub fn rewrite_document(
    text: &str,
    mode: ParseMode,
    config: &RewriteConfig,
) -> Result<Rewritten, RewriteError> {
    let mut changes = Vec::new();
    let text = link::rewrite_links(text, mode, config, &mut changes)?;
    let text = share::rewrite_share_links(&text, mode, config, &mut changes)?;
    let text = share::rewrite_meta_urls(&text, mode, config, &mut changes)?;
    let text = share::rewrite_meta_images(&text, mode, config, &mut changes)?;
    Ok(Rewritten { text, changes })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RewriteConfig {
        RewriteConfig::new("localhost:2368", Some("http://example.com/blog")).unwrap()
    }

    #[test]
    fn test_empty_target_is_absent() {
        let config = RewriteConfig::new("localhost:2368", Some("  ")).unwrap();
        assert!(config.target().is_none());
        assert!(matches!(
            config.require_target("x"),
            Err(RewriteError::MissingTarget("x"))
        ));
    }

    #[test]
    fn test_image_base_follows_static_segment() {
        let config = RewriteConfig::new("localhost:2368", Some("http://example.com/static"))
            .unwrap();
        assert_eq!(config.require_image_base().unwrap().as_str(), "http://example.com");

        let config = config.with_static_segment("assets");
        assert_eq!(
            config.require_image_base().unwrap().as_str(),
            "http://example.com/static"
        );
    }

    #[test]
    fn test_rewrite_document_runs_all_passes() {
        let html = r#"<html><head>
<link rel="canonical" href="http://localhost:2368/post/">
<meta property="og:url" content="http://localhost:2368/post/">
<meta property="og:image" content="http://localhost:2368/content/images/a.png">
</head><body>
<a href="http://localhost:2368/about/">About</a>
<a href="/tag/rust/index.html">Rust</a>
<div class="share_links"><a href="https://twitter.com/share?url=http://localhost:2368/post/">t</a></div>
</body></html>"#;
        let out = rewrite_document(html, ParseMode::Markup, &config()).unwrap();

        assert!(out.text.contains(r#"<link rel="canonical" href="http://example.com/blog/post/">"#));
        assert!(out.text.contains(r#"<a href="/about/">"#));
        assert!(out.text.contains(r#"<a href="/tag/rust/">"#));
        assert!(out.text.contains(r#"content="http://example.com/blog/post/""#));
        assert!(out.text.contains(r#"content="http://example.com/blog/content/images/a.png""#));
        assert!(out.text.contains("url=http://example.com/blog/post/"));
        assert!(!out.text.contains("localhost:2368"));

        let passes: Vec<_> = out.changes.iter().map(|c| c.pass).collect();
        assert_eq!(
            passes,
            [Pass::Link, Pass::Link, Pass::Link, Pass::Share, Pass::MetaUrl, Pass::MetaImage]
        );
    }

    #[test]
    fn test_rewrite_document_is_idempotent() {
        let html = r#"<a href="http://localhost:2368/x/">x</a><a href="y/index.html">y</a>
<link href="/rss/index.html"><link href="http://localhost:2368/feed/">"#;
        let once = rewrite_document(html, ParseMode::Markup, &config()).unwrap();
        let twice = rewrite_document(&once.text, ParseMode::Markup, &config()).unwrap();
        assert_eq!(once.text, twice.text);
    }

    #[test]
    fn test_rewrite_document_requires_target() {
        let config = RewriteConfig::new("localhost:2368", None).unwrap();
        let err = rewrite_document("<p>hi</p>", ParseMode::Markup, &config).unwrap_err();
        assert!(matches!(err, RewriteError::MissingTarget(_)));
        assert!(!err.is_document_error());
    }

    #[test]
    fn test_change_display() {
        let change = Change {
            pass: Pass::Link,
            element: ElementKind::Anchor,
            old: "a".into(),
            new: "b".into(),
        };
        assert_eq!(change.to_string(), "a => b");
    }
}
