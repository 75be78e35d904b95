//! Local preview server for the static site.
//!
//! Blocking `tiny_http` loop serving the output directory, stopped with
//! Ctrl+C.

mod lifecycle;
mod path;
mod response;

use crate::{config::BusterConfig, debug, log};
use anyhow::{Result, bail};
use std::{path::Path, sync::Arc};
use tiny_http::{Method, Request, Server};

/// Serve the output directory until interrupted.
pub fn preview_site(config: &BusterConfig) -> Result<()> {
    let root = config.output_dir();
    if !root.is_dir() {
        bail!("{} does not exist, run `buster generate` first", root.display());
    }

    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    lifecycle::register_shutdown(Arc::clone(&server))?;

    log!("preview"; "http://{} (Ctrl+C to stop)", addr);
    run_request_loop(&server, root, &config.site.feed_extension);
    Ok(())
}

fn run_request_loop(server: &Server, root: &Path, feed_extension: &str) {
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, root, feed_extension) {
            log!("preview"; "request error: {e}");
        }
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, root: &Path, feed_extension: &str) -> Result<()> {
    if lifecycle::is_shutdown() {
        return response::respond_unavailable(request);
    }

    if !matches!(request.method(), Method::Get | Method::Head) {
        return response::respond_method_not_allowed(request);
    }

    debug!("preview"; "{} {}", request.method(), request.url());

    match path::resolve_path(request.url(), root, feed_extension) {
        Some(path) => response::respond_file(request, &path),
        None => response::respond_not_found(request, root),
    }
}
