//! Provisioner for a conda-based voice-cloning toolkit install.
//!
//! The crate turns a machine with a CUDA toolkit into a working install of a
//! third-party voice-cloning repository: conda env, cloned sources, Python
//! dependencies, pretrained checkpoints, and launcher scripts. The layout
//! keeps the same split throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (stage planning, version parsing,
//!   path expansion). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (child processes, prompts, config
//!   files, generated scripts). Each external capability sits behind a trait so
//!   tests can substitute fakes.
//!
//! [`stages`] implements each provisioning step on top of `io`, and
//! [`pipeline`] composes them for a given [`core::plan::Mode`].

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod stages;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
