//! Content types for files in a mirrored blog.
//!
//! Covers what a mirrored Ghost theme and its content ship: pages, feeds,
//! sitemaps, theme assets, fonts and uploaded media.

use std::path::Path;

pub mod types {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const XSL: &str = "text/xsl; charset=utf-8";

    pub const RSS: &str = "application/rss+xml";
    pub const ATOM: &str = "application/atom+xml";

    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";

    pub const WOFF: &str = "font/woff";
    pub const WOFF2: &str = "font/woff2";
    pub const TTF: &str = "font/ttf";
    pub const EOT: &str = "application/vnd.ms-fontobject";

    pub const MP4: &str = "video/mp4";
    pub const MP3: &str = "audio/mpeg";
    pub const PDF: &str = "application/pdf";

    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Content type for `path`, judged by its (case-insensitive) extension.
pub fn from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    from_extension(ext.as_deref())
}

pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        Some("html" | "htm") => types::HTML,
        Some("txt") => types::PLAIN,
        Some("css") => types::CSS,
        Some("js" | "mjs") => types::JAVASCRIPT,
        Some("json") => types::JSON,
        // Ghost sitemaps link a stylesheet (`sitemap.xsl`)
        Some("xml") => types::XML,
        Some("xsl") => types::XSL,

        Some("rss") => types::RSS,
        Some("atom") => types::ATOM,

        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("gif") => types::GIF,
        Some("webp") => types::WEBP,
        Some("svg") => types::SVG,
        Some("ico") => types::ICO,

        Some("woff") => types::WOFF,
        Some("woff2") => types::WOFF2,
        Some("ttf") => types::TTF,
        Some("eot") => types::EOT,

        Some("mp4") => types::MP4,
        Some("mp3") => types::MP3,
        Some("pdf") => types::PDF,

        _ => types::OCTET_STREAM,
    }
}
