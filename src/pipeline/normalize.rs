//! Filename normalization for mirrored trees.
//!
//! Mirroring keeps query strings in saved names (`screen.css?v=1a2b`).
//! Served from a static host those files would never match their
//! references, so the query part is dropped: `screen.css?v=1a2b` becomes
//! `screen.css`.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use jwalk::WalkDir;

use crate::log;

/// One file moved by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Result of one normalization pass.
#[derive(Debug, Default)]
pub struct Normalized {
    pub renamed: Vec<Rename>,
    /// Names with nothing before `?`, left in place with their query.
    pub skipped: Vec<PathBuf>,
}

impl fmt::Display for Rename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.from.display(), self.to.display())
    }
}

/// Strip `?query` suffixes from every file name under `root`.
///
/// Names are visited in sorted order, so when two names collapse onto the
/// same file the one sorting last wins. Names that would become empty
/// (`?v=1`) are left alone and reported as skipped. Running this twice
/// renames nothing the second time.
pub fn normalize_filenames(root: &Path) -> Result<Normalized> {
    let mut normalized = Normalized::default();

    for path in collect_query_files(root)? {
        let Some(to) = normalized_path(&path) else {
            log!("skip"; "{}: nothing left before `?`, name kept", display_relative(&path, root));
            normalized.skipped.push(path);
            continue;
        };

        fs::rename(&path, &to).with_context(|| {
            format!("Failed to rename {} to {}", path.display(), to.display())
        })?;

        let rename = Rename { from: path, to };
        log!("rename"; "{}", relative(&rename, root));
        normalized.renamed.push(rename);
    }

    Ok(normalized)
}

/// Files whose name carries a query string, in sorted walk order.
fn collect_query_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).skip_hidden(false).sort(true) {
        let entry =
            entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(|name| name.contains('?')) {
            files.push(entry.path());
        }
    }
    Ok(files)
}

/// `dir/name?query` → `dir/name`, or `None` when no name remains.
fn normalized_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let (stem, _) = name.split_once('?')?;
    (!stem.is_empty()).then(|| path.with_file_name(stem))
}

fn relative(rename: &Rename, root: &Path) -> String {
    format!(
        "{} => {}",
        display_relative(&rename.from, root),
        display_relative(&rename.to, root)
    )
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_normalized_path() {
        assert_eq!(
            normalized_path(Path::new("/t/screen.css?v=1a2b")),
            Some(PathBuf::from("/t/screen.css"))
        );
        assert_eq!(
            normalized_path(Path::new("/t/a.js?v=1?x=2")),
            Some(PathBuf::from("/t/a.js"))
        );
        assert_eq!(normalized_path(Path::new("/t/?v=1")), None);
        assert_eq!(normalized_path(Path::new("/t/plain.css")), None);
    }

    #[test]
    fn test_normalize_renames_nested_files() {
        let dir = TempDir::new().unwrap();
        let assets = dir.path().join("assets/css");
        fs::create_dir_all(&assets).unwrap();
        fs::write(assets.join("screen.css?v=1a2b"), "body{}").unwrap();
        fs::write(assets.join("plain.css"), "p{}").unwrap();

        let renames = normalize_filenames(dir.path()).unwrap().renamed;

        assert_eq!(renames.len(), 1);
        assert_eq!(renames[0].to, assets.join("screen.css"));
        assert_eq!(names(&assets), ["plain.css", "screen.css"]);
        assert_eq!(fs::read_to_string(assets.join("screen.css")).unwrap(), "body{}");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.js?v=3"), "x").unwrap();

        assert_eq!(normalize_filenames(dir.path()).unwrap().renamed.len(), 1);
        assert!(normalize_filenames(dir.path()).unwrap().renamed.is_empty());
        assert_eq!(names(dir.path()), ["app.js"]);
    }

    #[test]
    fn test_normalize_collision_last_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.css?v=1"), "one").unwrap();
        fs::write(dir.path().join("a.css?v=2"), "two").unwrap();

        let renames = normalize_filenames(dir.path()).unwrap().renamed;

        assert_eq!(renames.len(), 2);
        assert_eq!(names(dir.path()), ["a.css"]);
        assert_eq!(fs::read_to_string(dir.path().join("a.css")).unwrap(), "two");
    }

    #[test]
    fn test_normalize_skips_empty_stem() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("?v=1"), "x").unwrap();
        fs::write(dir.path().join("app.js?v=1"), "x").unwrap();

        let normalized = normalize_filenames(dir.path()).unwrap();
        assert_eq!(normalized.renamed.len(), 1);
        assert_eq!(normalized.skipped, [dir.path().join("?v=1")]);
        assert_eq!(names(dir.path()), ["?v=1", "app.js"]);

        // Still reported on the next pass
        let again = normalize_filenames(dir.path()).unwrap();
        assert!(again.renamed.is_empty());
        assert_eq!(again.skipped.len(), 1);
    }

    #[test]
    fn test_normalize_includes_hidden_dirs() {
        let dir = TempDir::new().unwrap();
        let hidden = dir.path().join(".well-known");
        fs::create_dir(&hidden).unwrap();
        fs::write(hidden.join("x.txt?y"), "x").unwrap();

        normalize_filenames(dir.path()).unwrap();
        assert_eq!(names(&hidden), ["x.txt"]);
    }
}
