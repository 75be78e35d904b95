//! `[deploy]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [deploy]
//! remote = "origin"                    # Remote to push to
//! branch = "gh-pages"                  # Defaults to the checked-out branch
//! message = "Blog update at {time}"    # `{time}` is replaced with UTC time
//! ```

use serde::{Deserialize, Serialize};

/// Placeholder replaced with the commit timestamp.
pub const TIME_PLACEHOLDER: &str = "{time}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Remote name.
    pub remote: String,

    /// Branch to push. `None` pushes the current branch.
    pub branch: Option<String>,

    /// Commit message template.
    pub message: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            branch: None,
            message: format!("Blog update at {TIME_PLACEHOLDER}"),
        }
    }
}

impl DeployConfig {
    /// Render the commit message for `time`.
    pub fn commit_message(&self, time: &str) -> String {
        self.message.replace(TIME_PLACEHOLDER, time)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_deploy_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.deploy.remote, "origin");
        assert_eq!(config.deploy.branch, None);
        assert_eq!(
            config.deploy.commit_message("2024-01-01 00:00:00 UTC"),
            "Blog update at 2024-01-01 00:00:00 UTC"
        );
    }

    #[test]
    fn test_deploy_custom_message() {
        let config = test_parse_config("[deploy]\nbranch = \"master\"\nmessage = \"publish\"");
        assert_eq!(config.deploy.branch.as_deref(), Some("master"));
        assert_eq!(config.deploy.commit_message("now"), "publish");
    }
}
