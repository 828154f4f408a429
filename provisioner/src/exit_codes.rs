//! Stable exit codes for the `provision` CLI.

/// Every planned stage completed (warnings allowed).
pub const OK: i32 = 0;
/// An external command, config file, or filesystem operation failed.
pub const FAILED: i32 = 1;
/// A hard prerequisite (the CUDA toolkit) is missing; nothing was modified.
pub const MISSING_PREREQUISITE: i32 = 3;
