//! Mirrored-tree rewrite pipeline.
//!
//! All filesystem I/O of a rewrite run happens here; the per-document work
//! is delegated to [`crate::rewrite::rewrite_document`].
//!
//! # Flow
//!
//! ```text
//! check target ─► normalize names ─► rename feeds ─► per document:
//!                                                    read ─► rewrite ─► write
//! ```
//!
//! A document that fails to decode or parse is reported and left untouched;
//! every other document is still processed. Configuration and filesystem
//! errors abort the run.

pub mod normalize;

use std::{
    collections::HashSet,
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use jwalk::WalkDir;

use crate::{
    log,
    logger::ProgressLine,
    rewrite::{Change, ParseMode, RewriteConfig, RewriteError, rewrite_document},
};

pub use normalize::{Rename, normalize_filenames};

const HTML_EXTENSION: &str = "html";

// ============================================================================
// Types
// ============================================================================

/// A document the pipeline will rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub mode: ParseMode,
}

/// A document left unmodified because it could not be rewritten.
#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: RewriteError,
}

/// Outcome of a rewrite run.
#[derive(Debug, Default)]
pub struct Report {
    /// Query-string and feed renames, in the order they happened.
    pub renamed: Vec<Rename>,
    /// Query-string names that could not be normalized.
    pub skipped: Vec<PathBuf>,
    /// Documents visited.
    pub documents: usize,
    /// Documents whose content changed on disk.
    pub rewritten: usize,
    /// Total rewritten references.
    pub changes: usize,
    pub failures: Vec<Failure>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

enum Outcome {
    Unchanged,
    Rewritten(Vec<Change>),
    Failed(RewriteError),
}

// ============================================================================
// Driver
// ============================================================================

/// Rewrite the mirrored tree at `root` in place.
///
/// The target domain is checked before anything on disk is touched, so a
/// missing target leaves the tree byte-for-byte unchanged. The returned error
/// then downcasts to [`RewriteError::MissingTarget`].
pub fn run(root: &Path, config: &RewriteConfig) -> Result<Report> {
    config
        .require_target("share links and meta tags")
        .with_context(|| {
            format!(
                "Cannot rewrite {} from {}",
                root.display(),
                config.source()
            )
        })?;

    if !root.is_dir() {
        bail!("Mirrored tree {} does not exist", root.display());
    }

    let normalized = normalize_filenames(root)?;
    let mut report = Report {
        renamed: normalized.renamed,
        skipped: normalized.skipped,
        ..Report::default()
    };

    let documents = rename_feeds(collect_documents(root, config)?, config, &mut report.renamed)?;
    report.documents = documents.len();

    let feeds = documents.iter().filter(|d| d.mode == ParseMode::Feed).count();
    let progress = ProgressLine::new(
        "rewrite",
        &[("documents", documents.len() - feeds), ("feeds", feeds)],
    );

    for document in &documents {
        match rewrite_file(document, config)? {
            Outcome::Unchanged => {}
            Outcome::Rewritten(changes) => {
                for change in &changes {
                    crate::debug!(change.pass.module(); "{}", change);
                }
                log!("rewrite"; "{} ({} references)", display_relative(&document.path, root), changes.len());
                report.rewritten += 1;
                report.changes += changes.len();
            }
            Outcome::Failed(error) => {
                log!("failed"; "{}: {}", display_relative(&document.path, root), error);
                report.failures.push(Failure {
                    path: document.path.clone(),
                    error,
                });
            }
        }
        progress.inc(match document.mode {
            ParseMode::Markup => "documents",
            ParseMode::Feed => "feeds",
        });
    }
    progress.finish();

    Ok(report)
}

/// Rewrite one document, writing it back only when its text changed.
fn rewrite_file(document: &Document, config: &RewriteConfig) -> Result<Outcome> {
    let path = &document.path;
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => return Ok(Outcome::Failed(RewriteError::Encoding(err))),
    };

    match rewrite_document(&text, document.mode, config) {
        Ok(rewritten) if rewritten.text == text => Ok(Outcome::Unchanged),
        Ok(rewritten) => {
            write_atomic(path, rewritten.text.as_bytes())?;
            Ok(Outcome::Rewritten(rewritten.changes))
        }
        Err(err) if err.is_document_error() => Ok(Outcome::Failed(err)),
        Err(err) => Err(err).with_context(|| {
            format!(
                "Failed to rewrite {} ({} => {})",
                path.display(),
                config.source(),
                config.target().map_or_else(String::new, ToString::to_string)
            )
        }),
    }
}

/// Replace `path` via a sibling temp file so readers never see a partial write.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let name = path
        .file_name()
        .map(OsStr::to_string_lossy)
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{name}.buster-tmp"));

    fs::write(&tmp, bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
    if let Err(err) = fs::rename(&tmp, path) {
        fs::remove_file(&tmp).ok();
        return Err(err).with_context(|| format!("Failed to replace {}", path.display()));
    }
    Ok(())
}

// ============================================================================
// Discovery
// ============================================================================

/// Every `*.html` document under `root`, plus already-renamed feeds.
///
/// Documents directly inside a directory named like the feed directory are
/// feeds and parse as XML.
pub fn collect_documents(root: &Path, config: &RewriteConfig) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    for entry in WalkDir::new(root).skip_hidden(false).sort(true) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_feed = in_feed_dir(&path, config);
        let extension = path.extension().and_then(OsStr::to_str);

        let mode = match extension {
            Some(HTML_EXTENSION) if is_feed => ParseMode::Feed,
            Some(HTML_EXTENSION) => ParseMode::Markup,
            Some(ext) if is_feed && ext == config.feed_extension() => ParseMode::Feed,
            _ => continue,
        };
        documents.push(Document { path, mode });
    }

    documents.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(documents)
}

fn in_feed_dir(path: &Path, config: &RewriteConfig) -> bool {
    path.parent()
        .and_then(Path::file_name)
        .is_some_and(|dir| dir == config.feed_dir())
}

/// Rename feed documents from `.html` to the feed extension.
fn rename_feeds(
    documents: Vec<Document>,
    config: &RewriteConfig,
    renamed: &mut Vec<Rename>,
) -> Result<Vec<Document>> {
    let mut out = Vec::with_capacity(documents.len());

    for document in documents {
        let is_html = document.path.extension() == Some(OsStr::new(HTML_EXTENSION));
        if document.mode != ParseMode::Feed || !is_html {
            out.push(document);
            continue;
        }

        let to = document.path.with_extension(config.feed_extension());
        fs::rename(&document.path, &to).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                document.path.display(),
                to.display()
            )
        })?;
        log!("rename"; "{} => {}", document.path.display(), to.display());

        renamed.push(Rename {
            from: document.path,
            to: to.clone(),
        });
        out.push(Document {
            path: to,
            mode: ParseMode::Feed,
        });
    }

    // A feed renamed over an existing one is visited once
    let mut seen = HashSet::new();
    out.retain(|d| seen.insert(d.path.clone()));
    Ok(out)
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SOURCE: &str = "localhost:2368";
    const TARGET: &str = "http://example.com/blog";

    const POST: &str = r#"<!DOCTYPE html>
<html><head>
<link rel="stylesheet" href="http://localhost:2368/assets/css/screen.css">
<link rel="alternate" type="application/rss+xml" href="http://localhost:2368/rss/">
<meta property="og:url" content="http://localhost:2368/hello/">
<meta property="og:image" content="http://localhost:2368/content/images/cover.png">
</head><body>
<a href="http://localhost:2368/about/">About</a>
<a href="../tag/news/index.html">News</a>
<div class="share_links"><a href="https://twitter.com/share?url=http://localhost:2368/hello/">Tweet</a></div>
</body></html>
"#;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom"><channel>
<title>Blog</title>
<link>http://localhost:2368/</link>
<atom:link href="http://localhost:2368/rss/" rel="self" type="application/rss+xml"/>
</channel></rss>
"#;

    fn config(target: Option<&str>) -> RewriteConfig {
        RewriteConfig::new(SOURCE, target)
            .unwrap()
            .with_static_segment("static")
    }

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("hello")).unwrap();
        fs::create_dir_all(root.join("rss")).unwrap();
        fs::create_dir_all(root.join("assets/css")).unwrap();
        fs::write(root.join("hello/index.html"), POST).unwrap();
        fs::write(root.join("rss/index.html"), FEED).unwrap();
        fs::write(root.join("assets/css/screen.css?v=9f2c"), "body{}").unwrap();
        dir
    }

    fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let mut files: Vec<_> = WalkDir::new(root)
            .skip_hidden(false)
            .sort(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let path = e.path();
                let bytes = fs::read(&path).unwrap();
                (path, bytes)
            })
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_run_rewrites_tree() {
        let dir = site();
        let root = dir.path();

        let report = run(root, &config(Some(TARGET))).unwrap();

        assert!(report.is_success());
        assert_eq!(report.documents, 2);
        assert_eq!(report.rewritten, 2);
        assert_eq!(report.renamed.len(), 2);
        assert!(root.join("assets/css/screen.css").is_file());

        let post = fs::read_to_string(root.join("hello/index.html")).unwrap();
        assert!(post.contains(r#"href="http://example.com/blog/assets/css/screen.css""#));
        assert!(post.contains(r#"<a href="/about/">"#));
        assert!(post.contains(r#"<a href="../tag/news/">"#));
        assert!(post.contains(r#"content="http://example.com/blog/hello/""#));
        assert!(post.contains(r#"content="http://example.com/blog/content/images/cover.png""#));
        assert!(post.contains("url=http://example.com/blog/hello/"));
        assert!(post.starts_with("<!DOCTYPE"));
    }

    #[test]
    fn test_run_renames_and_rewrites_feed() {
        let dir = site();
        let root = dir.path();

        run(root, &config(Some(TARGET))).unwrap();

        assert!(!root.join("rss/index.html").exists());
        let feed = fs::read_to_string(root.join("rss/index.rss")).unwrap();
        assert!(feed.contains(r#"<atom:link href="http://example.com/blog/rss/""#));
        assert!(feed.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    }

    #[test]
    fn test_run_leaves_no_source_references() {
        let dir = site();
        let root = dir.path();

        run(root, &config(Some(TARGET))).unwrap();

        let post = fs::read_to_string(root.join("hello/index.html")).unwrap();
        assert!(!post.contains("localhost:2368"));
    }

    #[test]
    fn test_run_is_idempotent() {
        let dir = site();
        let root = dir.path();

        run(root, &config(Some(TARGET))).unwrap();
        let first = snapshot(root);

        let report = run(root, &config(Some(TARGET))).unwrap();
        assert!(report.renamed.is_empty());
        assert_eq!(report.rewritten, 0);
        assert_eq!(snapshot(root), first);
    }

    #[test]
    fn test_run_reports_unnormalizable_names() {
        let dir = site();
        let root = dir.path();
        fs::write(root.join("?v=1"), "x").unwrap();

        let report = run(root, &config(Some(TARGET))).unwrap();

        assert!(report.is_success());
        assert_eq!(report.skipped, [root.join("?v=1")]);
        assert!(root.join("?v=1").is_file());
    }

    #[test]
    fn test_run_without_target_fails_closed() {
        let dir = site();
        let root = dir.path();
        let before = snapshot(root);

        let err = run(root, &config(None)).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RewriteError>(),
            Some(RewriteError::MissingTarget(_))
        ));
        assert_eq!(snapshot(root), before);
    }

    #[test]
    fn test_run_isolates_failed_documents() {
        let dir = site();
        let root = dir.path();
        let broken_feed = "<rss><channel><link href=\"http://localhost:2368/\"></rss>";
        fs::write(root.join("rss/index.html"), broken_feed).unwrap();
        let binary = b"<a href=\"http://localhost:2368/x/\">\xff\xfe</a>";
        fs::write(root.join("binary.html"), binary).unwrap();

        let report = run(root, &config(Some(TARGET))).unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(
            report
                .failures
                .iter()
                .find(|f| f.path.ends_with("binary.html"))
                .map(|f| &f.error),
            Some(RewriteError::Encoding(_))
        ));
        assert_eq!(fs::read_to_string(root.join("rss/index.rss")).unwrap(), broken_feed);
        assert_eq!(fs::read(root.join("binary.html")).unwrap(), binary);

        let post = fs::read_to_string(root.join("hello/index.html")).unwrap();
        assert!(post.contains(r#"<a href="/about/">"#));
    }

    #[test]
    fn test_run_missing_root() {
        let dir = TempDir::new().unwrap();
        assert!(run(&dir.path().join("absent"), &config(Some(TARGET))).is_err());
    }

    #[test]
    fn test_collect_documents_modes() {
        let dir = site();
        let root = dir.path();
        fs::write(root.join("rss/index.rss"), FEED).unwrap();
        fs::write(root.join("notes.rss"), FEED).unwrap();

        let docs = collect_documents(root, &config(None)).unwrap();
        let modes: Vec<_> = docs
            .iter()
            .map(|d| (display_relative(&d.path, root), d.mode))
            .collect();

        assert_eq!(
            modes,
            [
                ("hello/index.html".to_string(), ParseMode::Markup),
                ("rss/index.html".to_string(), ParseMode::Feed),
                ("rss/index.rss".to_string(), ParseMode::Feed),
            ]
        );
    }

    #[test]
    fn test_rename_feed_over_existing() {
        let dir = site();
        let root = dir.path();
        fs::write(root.join("rss/index.rss"), "old").unwrap();
        let config = config(Some(TARGET));

        let mut renamed = Vec::new();
        let docs = rename_feeds(collect_documents(root, &config).unwrap(), &config, &mut renamed)
            .unwrap();

        assert_eq!(renamed.len(), 1);
        let feeds: Vec<_> = docs.iter().filter(|d| d.mode == ParseMode::Feed).collect();
        assert_eq!(feeds.len(), 1);
        assert_eq!(fs::read_to_string(root.join("rss/index.rss")).unwrap(), FEED);
    }

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.html");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
