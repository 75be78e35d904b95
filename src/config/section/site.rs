//! `[site]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [site]
//! source = "localhost:2368"           # Address the blog is mirrored from
//! target = "https://blog.example.com" # Where the static copy is served
//! output = "static"                   # Mirrored tree (relative to buster.toml)
//! static_segment = "static"           # Dropped from target for og:image URLs
//! feed_dir = "rss"                    # Directory holding the feed index
//! feed_extension = "rss"              # Feed index is renamed to index.<ext>
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::rewrite::{
    BaseUrl, DEFAULT_FEED_DIR, DEFAULT_FEED_EXTENSION, DEFAULT_STATIC_SEGMENT, RewriteConfig,
};

/// Default mirror source (a local Ghost instance).
pub const DEFAULT_SOURCE: &str = "localhost:2368";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL the blog is mirrored from. `http://` is assumed without a scheme.
    pub source: String,

    /// Public base URL of the static copy. Required to rewrite `<link>`,
    /// share and meta references.
    pub target: Option<String>,

    /// Directory holding the mirrored tree.
    pub output: PathBuf,

    /// Path segment removed from the target for `og:image` URLs.
    pub static_segment: String,

    /// Directory whose `*.html` documents are feeds.
    pub feed_dir: String,

    /// Extension feed documents are renamed to.
    pub feed_extension: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            target: None,
            output: PathBuf::from("static"),
            static_segment: DEFAULT_STATIC_SEGMENT.to_string(),
            feed_dir: DEFAULT_FEED_DIR.to_string(),
            feed_extension: DEFAULT_FEED_EXTENSION.to_string(),
        }
    }
}

impl SiteConfig {
    /// Build the immutable configuration shared by every rewrite pass.
    pub fn rewrite_config(&self) -> Result<RewriteConfig, ConfigError> {
        let config = RewriteConfig::new(&self.source, self.target.as_deref())
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        Ok(config
            .with_static_segment(&self.static_segment)
            .with_feed(&self.feed_dir, &self.feed_extension))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        BaseUrl::parse(&self.source)
            .map_err(|e| ConfigError::Validation(format!("site.source: {e}")))?;

        if let Some(target) = self.target.as_deref().filter(|t| !t.trim().is_empty()) {
            BaseUrl::parse(target)
                .map_err(|e| ConfigError::Validation(format!("site.target: {e}")))?;
        }

        let feed_dir = self.feed_dir.trim_matches('/');
        if feed_dir.is_empty() || feed_dir.contains('/') {
            return Err(ConfigError::Validation(format!(
                "site.feed_dir must be a single directory name, got `{}`",
                self.feed_dir
            )));
        }
        if self.feed_extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::Validation(
                "site.feed_extension must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_site_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.site.source, "localhost:2368");
        assert_eq!(config.site.target, None);
        assert_eq!(config.site.output.to_str(), Some("static"));
        assert_eq!(config.site.feed_dir, "rss");
        assert_eq!(config.site.feed_extension, "rss");
        assert_eq!(config.site.static_segment, "static");
    }

    #[test]
    fn test_site_custom() {
        let config = test_parse_config(
            "[site]\nsource = \"http://127.0.0.1:2368\"\ntarget = \"https://blog.example.com\"\noutput = \"public\"",
        );
        assert_eq!(config.site.source, "http://127.0.0.1:2368");
        assert_eq!(config.site.target.as_deref(), Some("https://blog.example.com"));
        assert_eq!(config.site.output.to_str(), Some("public"));
    }

    #[test]
    fn test_rewrite_config() {
        let config = test_parse_config(
            "[site]\ntarget = \"https://example.com/static\"\nfeed_extension = \".xml\"",
        );
        let rewrite = config.site.rewrite_config().unwrap();
        assert_eq!(rewrite.source().as_str(), "http://localhost:2368");
        assert_eq!(rewrite.target().unwrap().as_str(), "https://example.com/static");
        assert_eq!(rewrite.require_image_base().unwrap().as_str(), "https://example.com");
        assert_eq!(rewrite.feed_extension(), "xml");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = test_parse_config("[site]\nsource = \"\"");
        assert!(config.site.validate().is_err());

        let config = test_parse_config("[site]\nfeed_dir = \"a/b\"");
        assert!(config.site.validate().is_err());

        let config = test_parse_config("[site]\ntarget = \"\"");
        assert!(config.site.validate().is_ok());
    }
}
