//! Configuration section definitions.
//!
//! Each module corresponds to a section in `buster.toml`:
//!
//! | Module   | TOML Section | Purpose                                   |
//! |----------|--------------|-------------------------------------------|
//! | `site`   | `[site]`     | Source/target domains, output, feed names |
//! | `mirror` | `[mirror]`   | External mirroring tool                   |
//! | `serve`  | `[serve]`    | Preview server                            |
//! | `deploy` | `[deploy]`   | Git remote, branch, commit message        |

mod deploy;
mod mirror;
mod serve;
mod site;

pub use deploy::DeployConfig;
pub use mirror::{MIRROR_ARGS, MirrorConfig};
pub use serve::ServeConfig;
pub use site::SiteConfig;
