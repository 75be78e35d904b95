//! Path and URL utilities.
//!
//! Pure functions for path manipulation. No side effects.
//!
//! - [`fs`]: Filesystem path normalization (`normalize_path`, `expand_path`)
//! - [`route`]: URL utilities (`is_external_link`)

pub mod fs;
pub mod route;

pub use fs::{expand_path, normalize_path};
pub use route::is_external_link;
