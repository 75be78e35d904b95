//! Buster - turn a Ghost blog into a static site.

mod cli;
mod config;
mod logger;
mod pipeline;
mod rewrite;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::BusterConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = BusterConfig::load(&cli)?;

    match &cli.command {
        Commands::Setup { gh_repo, yes } => {
            if !cli::setup::setup_site(&config, gh_repo.as_deref(), *yes)? {
                log!("setup"; "aborted");
            }
            Ok(())
        }
        Commands::Generate { skip_mirror, .. } => {
            let report = cli::generate::generate_site(&config, *skip_mirror)?;
            if !report.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Preview { .. } => cli::preview::preview_site(&config),
        Commands::Deploy => cli::deploy::deploy_site(&config),
        Commands::AddDomain { domain } => cli::domain::add_domain(config.output_dir(), domain),
    }
}
