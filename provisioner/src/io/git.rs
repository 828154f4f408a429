//! Git adapter for fetching the toolkit sources.
//!
//! Only the two operations the source stage needs, routed through a
//! [`CommandRunner`] so tests see exact arguments.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, instrument};

use super::process::{CommandRunner, CommandSpec, run_checked};

/// Wrapper for executing git commands from a working directory.
pub struct Git<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    workdir: PathBuf,
}

impl<'a, R: CommandRunner + ?Sized> Git<'a, R> {
    pub fn new(runner: &'a R, workdir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            workdir: workdir.into(),
        }
    }

    /// Clone `url` into `dest`.
    #[instrument(skip_all, fields(url))]
    pub fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        debug!(dest = %dest.display(), "cloning repository");
        run_checked(
            self.runner,
            &self.command().arg("clone").arg(url).path_arg(dest),
        )?;
        Ok(())
    }

    /// Fast-forward the checkout at `repo` from its upstream.
    #[instrument(skip_all)]
    pub fn pull(&self, repo: &Path) -> Result<()> {
        debug!(repo = %repo.display(), "pulling repository");
        run_checked(
            self.runner,
            &self.command().arg("-C").path_arg(repo).arg("pull"),
        )?;
        Ok(())
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new("git").current_dir(&self.workdir)
    }
}
