//! `buster add-domain`: custom domain for the published site.

use crate::log;
use anyhow::{Context, Result, bail};
use std::{fs, path::Path};

/// Write `CNAME` containing `domain` into the output directory.
pub fn add_domain(dir: &Path, domain: &str) -> Result<()> {
    let domain = domain.trim();
    if domain.is_empty() || domain.contains(char::is_whitespace) {
        bail!("Invalid domain `{domain}`");
    }
    if !dir.is_dir() {
        bail!("{} does not exist, run `buster setup` first", dir.display());
    }

    let path = dir.join("CNAME");
    fs::write(&path, format!("{domain}\n"))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    log!("domain"; "added CNAME {}, run `buster deploy` to publish it", domain);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_domain_writes_cname() {
        let dir = TempDir::new().unwrap();
        add_domain(dir.path(), " blog.example.com ").unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("CNAME")).unwrap(),
            "blog.example.com\n"
        );
    }

    #[test]
    fn test_add_domain_rejects_missing_dir() {
        let dir = TempDir::new().unwrap();
        assert!(add_domain(&dir.path().join("absent"), "blog.example.com").is_err());
    }

    #[test]
    fn test_add_domain_rejects_blank() {
        let dir = TempDir::new().unwrap();
        assert!(add_domain(dir.path(), "  ").is_err());
        assert!(!dir.path().join("CNAME").exists());
    }
}
