//! I/O adapters used by the provisioning stages.

pub mod conda;
pub mod config;
pub mod confirm;
pub mod fetch;
pub mod git;
pub mod launcher;
pub mod process;
pub mod terminal;
