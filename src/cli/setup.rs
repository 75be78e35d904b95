//! `buster setup`: prepare the static directory as a publishable repository.

use crate::{config::BusterConfig, exec, log};
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::{
    fs,
    io::{self, Write},
    path::Path,
    sync::OnceLock,
};

/// Branch served for project pages.
const PROJECT_BRANCH: &str = "gh-pages";
/// Branch served for user and organization pages.
const USER_BRANCH: &str = "master";

const README: &str = "# Blog\nPowered by [Ghost](http://ghost.org) and [Buster](https://github.com/axitkhurana/buster/).\n";

/// Recreate the output directory as a git repository pointing at `gh_repo`.
///
/// Returns `Ok(false)` when the user declines to replace an existing directory.
pub fn setup_site(config: &BusterConfig, gh_repo: Option<&str>, yes: bool) -> Result<bool> {
    let repo_url = match gh_repo {
        Some(url) => url.trim().to_string(),
        None => prompt("Enter the repository URL:")?,
    };
    if repo_url.is_empty() {
        bail!("A repository URL is required");
    }

    let dir = config.output_dir();
    if dir.exists() {
        let question = format!(
            "This will destroy everything inside {}. Continue? [y/N]",
            dir.display()
        );
        if !yes && !confirm(&question)? {
            return Ok(false);
        }
        fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let branch = publish_branch(&repo_url);
    init_repo(dir, branch, &config.deploy.remote, &repo_url)?;

    fs::write(dir.join("README.md"), README)
        .with_context(|| format!("Failed to write README in {}", dir.display()))?;

    log!("setup"; "{} ready on branch {}", dir.display(), branch);
    log!("done"; "all set, you can generate and deploy now");
    Ok(true)
}

/// `master` for `<name>.github.io` / `.github.com` repositories, else `gh-pages`.
pub fn publish_branch(repo_url: &str) -> &'static str {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let is_user_page = RE
        .get_or_init(|| Regex::new(r"[A-Za-z0-9_-]+\.github\.(?:io|com)").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(repo_url));

    if is_user_page { USER_BRANCH } else { PROJECT_BRANCH }
}

fn init_repo(dir: &Path, branch: &str, remote: &str, url: &str) -> Result<()> {
    exec!(dir; ["git"]; "init", "--quiet")?;
    // Repository has no commits yet, so pointing HEAD is enough to pick the branch
    let head = format!("refs/heads/{branch}");
    exec!(dir; ["git"]; "symbolic-ref", "HEAD", &head)?;
    exec!(dir; ["git"]; "remote", "add", remote, url)?;
    Ok(())
}

fn prompt(question: &str) -> Result<String> {
    eprintln!("{question}");
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn confirm(question: &str) -> Result<bool> {
    eprint!("{question} ");
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_branch_user_pages() {
        assert_eq!(publish_branch("git@github.com:alice/alice.github.io.git"), "master");
        assert_eq!(publish_branch("https://github.com/org/org.github.com"), "master");
    }

    #[test]
    fn test_publish_branch_project_pages() {
        assert_eq!(publish_branch("git@github.com:alice/blog.git"), "gh-pages");
        assert_eq!(publish_branch("https://gitlab.com/alice/blog"), "gh-pages");
    }
}
