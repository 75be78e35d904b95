//! `buster generate`: mirror the running blog, then rewrite it in place.

use crate::{
    config::{BusterConfig, section::MIRROR_ARGS},
    log,
    logger::is_verbose,
    pipeline::{self, Report},
    utils::exec::{Cmd, EMPTY_FILTER, MIRROR_FILTER},
};
use anyhow::{Context, Result};
use std::{ffi::OsString, fs};

/// `wget` exit status for server error responses (broken links on the blog).
const WGET_SERVER_ERROR: i32 = 8;

/// Mirror (unless `skip_mirror`) and run the rewrite pipeline.
///
/// Returns the pipeline report; documents that failed to rewrite are listed
/// there and left untouched on disk.
pub fn generate_site(config: &BusterConfig, skip_mirror: bool) -> Result<Report> {
    // Check domains before the mirror runs so config mistakes fail fast
    let rewrite = config.site.rewrite_config()?;
    rewrite
        .require_target("share links and meta tags")
        .with_context(|| format!("Cannot generate from {}", rewrite.source()))?;
    let dir = config.output_dir();

    if skip_mirror {
        log!("mirror"; "skipped, rewriting {}", dir.display());
    } else {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        log!("mirror"; "{} -> {}", rewrite.source(), dir.display());

        let filter = if is_verbose() { &EMPTY_FILTER } else { &MIRROR_FILTER };
        Cmd::from_slice(&config.mirror.command)
            .args(mirror_args(config, rewrite.source().as_str()))
            .filter(filter)
            .accept_codes(&[WGET_SERVER_ERROR])
            .run()
            .with_context(|| format!("Failed to mirror {}", rewrite.source()))?;
    }

    let report = pipeline::run(dir, &rewrite)?;
    summarize(&report);
    Ok(report)
}

/// Arguments after the configured mirror command.
fn mirror_args(config: &BusterConfig, source: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = MIRROR_ARGS.iter().map(OsString::from).collect();
    args.push("--directory-prefix".into());
    args.push(config.output_dir().as_os_str().to_owned());
    args.push("--no-host-directories".into());
    args.push("--restrict-file-name=unix".into());
    args.extend(config.mirror.extra_args.iter().map(OsString::from));
    args.push(source.into());
    args
}

fn summarize(report: &Report) {
    for path in &report.skipped {
        log!("skip"; "{} still carries a query string", path.display());
    }
    for failure in &report.failures {
        log!("error"; "{}: {}", failure.path.display(), error_chain(&failure.error));
    }
    log!(
        if report.is_success() { "done" } else { "failed" };
        "{} documents, {} rewritten ({} references), {} renamed, {} skipped, {} failed",
        report.documents,
        report.rewritten,
        report.changes,
        report.renamed.len(),
        report.skipped.len(),
        report.failures.len()
    );
}

/// `error: cause: cause` on one line.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
