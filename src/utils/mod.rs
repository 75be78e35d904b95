//! Utility modules shared by the commands.

pub mod date;
pub mod exec;
pub mod html;
pub mod mime;
pub mod path;
