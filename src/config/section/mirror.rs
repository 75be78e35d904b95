//! `[mirror]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [mirror]
//! command = ["wget"]              # Program (and leading args) to run
//! extra_args = ["--no-verbose"]   # Appended before the source address
//! ```

use serde::{Deserialize, Serialize};

/// Flags that make `wget` produce a browsable local copy of the site.
pub const MIRROR_ARGS: &[&str] = &[
    "--recursive",
    "--convert-links",
    "--page-requisites",
    "--no-parent",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Mirroring program followed by any fixed arguments.
    pub command: Vec<String>,

    /// Additional arguments passed to the mirroring program.
    pub extra_args: Vec<String>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            command: vec!["wget".to_string()],
            extra_args: Vec::new(),
        }
    }
}
