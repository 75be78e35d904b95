//! Project configuration management for `buster.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── deploy     # [deploy]
//! │   ├── mirror     # [mirror]
//! │   ├── serve      # [serve]
//! │   └── site       # [site]
//! ├── error          # ConfigError
//! ├── util           # Config file discovery
//! └── mod.rs         # BusterConfig (this file)
//! ```
//!
//! The file is optional: without one every section takes its defaults and
//! the project root is the current directory. CLI flags override file values.

mod error;
pub mod section;
mod util;

pub use error::ConfigError;
pub use section::{DeployConfig, MirrorConfig, ServeConfig, SiteConfig};

use util::find_config_file;

use crate::{
    cli::{Cli, Commands},
    log,
    utils::path::{expand_path, normalize_path},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Config file name searched for when `--config` is not given.
pub const CONFIG_FILE: &str = "buster.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing buster.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusterConfig {
    /// Absolute path to the config file, if one was found (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Project root directory - parent of config file or cwd (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Domains, output directory and feed naming
    #[serde(default)]
    pub site: SiteConfig,

    /// External mirroring tool
    #[serde(default)]
    pub mirror: MirrorConfig,

    /// Preview server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// Git publishing settings
    #[serde(default)]
    pub deploy: DeployConfig,
}

impl BusterConfig {
    /// Load configuration for the parsed command line.
    ///
    /// An explicit `--config` must exist; otherwise `buster.toml` is searched
    /// upward from cwd and defaults are used when none is found.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let config_path = match &cli.config {
            Some(path) => {
                let path = expand_path(path, &cwd);
                if !path.is_file() {
                    return Err(ConfigError::Io(
                        path,
                        std::io::Error::from(std::io::ErrorKind::NotFound),
                    )
                    .into());
                }
                Some(path)
            }
            None => find_config_file(Path::new(CONFIG_FILE), &cwd),
        };

        let mut config = match &config_path {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };

        let root = config_path
            .as_deref()
            .and_then(Path::parent)
            .map_or_else(|| cwd.clone(), Path::to_path_buf);

        config.config_path = config_path.as_deref().map(normalize_path);
        config.finalize(cli, &root, &cwd);
        config.validate()?;

        if let Some(path) = &config.config_path {
            crate::debug!("config"; "loaded {}", path.display());
        }
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} are ignored: {}", display_path, fields.join(", "));
    }

    /// Resolve paths and apply command-line overrides.
    fn finalize(&mut self, cli: &Cli, root: &Path, cwd: &Path) {
        self.root = normalize_path(root);

        // `--dir` is relative to where the user typed it, file values to the root
        self.site.output = match &cli.dir {
            Some(dir) => normalize_path(&expand_path(dir, cwd)),
            None => normalize_path(&expand_path(&self.site.output, &self.root)),
        };

        self.apply_command_options(cli);
    }

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Generate {
                domain,
                target_domain,
                ..
            } => {
                Self::update_option(&mut self.site.source, domain.as_ref());
                if target_domain.is_some() {
                    self.site.target = target_domain.clone();
                }
            }
            Commands::Preview { interface, port } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
            }
            Commands::Setup { .. } | Commands::Deploy | Commands::AddDomain { .. } => {}
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.site.validate()?;
        if self.mirror.command.first().is_none_or(|c| c.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "mirror.command must name a program".into(),
            ));
        }
        if self.deploy.remote.trim().is_empty() {
            return Err(ConfigError::Validation(
                "deploy.remote must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Mirrored tree directory (absolute after loading).
    pub fn output_dir(&self) -> &Path {
        &self.site.output
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config content.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> BusterConfig {
    let (parsed, ignored) = BusterConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("buster").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(matches!(
            BusterConfig::parse_with_ignored("[site\nsource = \"x\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (config, ignored) =
            BusterConfig::parse_with_ignored("[site]\nsourse = \"typo\"\n[extra]\nkey = 1").unwrap();
        assert_eq!(config.site.source, "localhost:2368");
        assert_eq!(ignored, vec!["site.sourse", "extra"]);
    }

    #[test]
    fn test_output_relative_to_root() {
        let mut config = test_parse_config("[site]\noutput = \"public\"");
        config.finalize(&cli(&["deploy"]), Path::new("/blog"), Path::new("/elsewhere"));
        assert_eq!(config.output_dir(), Path::new("/blog/public"));
    }

    #[test]
    fn test_dir_flag_relative_to_cwd() {
        let mut config = test_parse_config("");
        config.finalize(
            &cli(&["--dir", "out", "deploy"]),
            Path::new("/blog"),
            Path::new("/elsewhere"),
        );
        assert_eq!(config.output_dir(), Path::new("/elsewhere/out"));
    }

    #[test]
    fn test_generate_overrides_domains() {
        let mut config = test_parse_config("[site]\ntarget = \"https://old.example.com\"");
        config.finalize(
            &cli(&[
                "generate",
                "--domain",
                "127.0.0.1:2368",
                "--target-domain",
                "https://new.example.com",
            ]),
            Path::new("/blog"),
            Path::new("/blog"),
        );
        assert_eq!(config.site.source, "127.0.0.1:2368");
        assert_eq!(config.site.target.as_deref(), Some("https://new.example.com"));
    }

    #[test]
    fn test_generate_keeps_file_target() {
        let mut config = test_parse_config("[site]\ntarget = \"https://old.example.com\"");
        config.finalize(&cli(&["generate"]), Path::new("/blog"), Path::new("/blog"));
        assert_eq!(config.site.target.as_deref(), Some("https://old.example.com"));
    }

    #[test]
    fn test_preview_overrides_port() {
        let mut config = test_parse_config("[serve]\nport = 8000");
        config.finalize(&cli(&["preview", "--port", "9100"]), Path::new("/b"), Path::new("/b"));
        assert_eq!(config.serve.port, 9100);
    }

    #[test]
    fn test_validate_empty_mirror_command() {
        let config = test_parse_config("[mirror]\ncommand = []");
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
