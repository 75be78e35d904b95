//! Command-line interface module.
//!
//! One module per subcommand; [`args`] holds the clap definitions.

mod args;
pub mod deploy;
pub mod domain;
pub mod generate;
pub mod preview;
pub mod setup;

pub use args::{Cli, Commands};
