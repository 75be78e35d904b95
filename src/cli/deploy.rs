//! `buster deploy`: commit the static site and push it.

use crate::{config::BusterConfig, exec, log, utils::date::DateTimeUtc};
use anyhow::{Result, bail};
use std::path::Path;

/// Stage everything, commit with a timestamped message and push.
pub fn deploy_site(config: &BusterConfig) -> Result<()> {
    let dir = config.output_dir();
    if !dir.join(".git").exists() {
        bail!("{} is not a git repository, run `buster setup` first", dir.display());
    }

    exec!(dir; ["git"]; "add", "--all", ".")?;

    if has_staged_changes(dir)? {
        let message = config.deploy.commit_message(&DateTimeUtc::now().to_string());
        exec!(dir; ["git"]; "commit", "--quiet", "-m", &message)?;
        log!("deploy"; "committed: {}", message);
    } else {
        log!("deploy"; "nothing new to commit");
    }

    let branch = match &config.deploy.branch {
        Some(branch) => branch.clone(),
        None => current_branch(dir)?,
    };
    let remote = &config.deploy.remote;

    log!("deploy"; "pushing to {} {}", remote, branch);
    exec!(pty=true; dir; ["git"]; "push", "-u", remote, &branch)?;

    log!("done"; "deployed {} to {}", dir.display(), remote);
    Ok(())
}

fn has_staged_changes(dir: &Path) -> Result<bool> {
    let output = exec!(dir; ["git"]; "status", "--porcelain")?;
    Ok(!output.stdout.iter().all(u8::is_ascii_whitespace))
}

fn current_branch(dir: &Path) -> Result<String> {
    let output = exec!(dir; ["git"]; "rev-parse", "--abbrev-ref", "HEAD")?;
    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if branch.is_empty() || branch == "HEAD" {
        bail!("{} has no checked-out branch, set `deploy.branch`", dir.display());
    }
    Ok(branch)
}
