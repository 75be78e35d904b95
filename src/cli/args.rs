//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::{net::IpAddr, path::PathBuf};

/// Turn a Ghost blog into a static site
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Print every rewritten reference
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// Config file path (default: search upward for buster.toml)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Static site directory (relative to current directory)
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create the static site directory as a git repository
    Setup {
        /// Repository to publish to (e.g. git@github.com:user/blog.git)
        #[arg(long, value_hint = clap::ValueHint::Url)]
        gh_repo: Option<String>,

        /// Replace an existing directory without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Mirror the blog and rewrite it for static hosting
    #[command(visible_alias = "g")]
    Generate {
        /// Address of the running blog (default: localhost:2368)
        #[arg(long)]
        domain: Option<String>,

        /// Public base URL of the static copy
        #[arg(long, value_hint = clap::ValueHint::Url)]
        target_domain: Option<String>,

        /// Rewrite the existing tree without mirroring again
        #[arg(long)]
        skip_mirror: bool,
    },

    /// Serve the static site locally
    #[command(visible_alias = "p")]
    Preview {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Commit the static site and push it
    #[command(visible_alias = "d")]
    Deploy,

    /// Serve the site from a custom domain (writes CNAME)
    AddDomain {
        /// Domain name, e.g. blog.example.com
        domain: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["buster", "deploy", "--dir", "out", "-V"]).unwrap();
        assert!(matches!(cli.command, Commands::Deploy));
        assert_eq!(cli.dir, Some(PathBuf::from("out")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_generate_args() {
        let cli = Cli::try_parse_from([
            "buster",
            "generate",
            "--domain",
            "127.0.0.1:2368",
            "--skip-mirror",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate {
                domain,
                target_domain,
                skip_mirror,
            } => {
                assert_eq!(domain.as_deref(), Some("127.0.0.1:2368"));
                assert_eq!(target_domain, None);
                assert!(skip_mirror);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_add_domain_requires_value() {
        assert!(Cli::try_parse_from(["buster", "add-domain"]).is_err());
        let cli = Cli::try_parse_from(["buster", "add-domain", "blog.example.com"]).unwrap();
        assert!(matches!(cli.command, Commands::AddDomain { domain } if domain == "blog.example.com"));
    }
}
