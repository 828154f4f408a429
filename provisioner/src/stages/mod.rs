//! Provisioning stages.
//!
//! Each stage takes the shared [`StageContext`] plus the mutable
//! [`ProvisionState`] and reports a [`StageOutcome`]. Stages never talk to the
//! outside world directly: processes go through [`CommandRunner`] and
//! questions through [`Confirm`].

pub mod assets;
pub mod bootstrap;
pub mod dependencies;
pub mod launchers;
pub mod preflight;
pub mod source;
pub mod summary;
pub mod system_packages;

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::core::home::expand_path;
use crate::core::plan::Stage;
use crate::core::types::{ProvisionState, StageOutcome};
use crate::io::conda::conda_bin_in;
use crate::io::config::ProvisionConfig;
use crate::io::confirm::Confirm;
use crate::io::process::CommandRunner;

/// Collaborators shared by every stage of a run.
pub struct StageContext<'a, R: CommandRunner + ?Sized, C: Confirm + ?Sized> {
    pub config: &'a ProvisionConfig,
    pub runner: &'a R,
    pub confirm: &'a C,
}

/// Resolve configured paths against `workdir` and the environment.
pub fn resolve_state<F>(config: &ProvisionConfig, workdir: &Path, lookup: F) -> Result<ProvisionState>
where
    F: Fn(&str) -> Option<String>,
{
    let conda_root = expand_path(&config.conda.root, lookup)?;
    let install_dir = workdir.join(&config.source.dir);
    let checkpoint_dirs = config
        .checkpoints
        .iter()
        .map(|checkpoint| install_dir.join(&checkpoint.dir))
        .collect();
    Ok(ProvisionState {
        workdir: workdir.to_path_buf(),
        conda_root,
        conda_bin: None,
        install_dir,
        checkpoint_dirs,
        launchers: Vec::new(),
        reports: Vec::new(),
    })
}

/// Dispatch a single stage.
pub fn run_stage<R, C>(
    stage: Stage,
    ctx: &StageContext<'_, R, C>,
    state: &mut ProvisionState,
) -> Result<StageOutcome>
where
    R: CommandRunner + ?Sized,
    C: Confirm + ?Sized,
{
    match stage {
        Stage::Preflight => preflight::run(ctx, state),
        Stage::Bootstrap => bootstrap::run(ctx, state),
        Stage::SystemPackages => system_packages::run(ctx, state),
        Stage::Source => source::run(ctx, state),
        Stage::Dependencies => dependencies::run(ctx, state),
        Stage::Assets => assets::run(ctx, state),
        Stage::SmokeTest => smoke_test::run(ctx, state),
        Stage::Launchers => launchers::run(ctx, state),
        Stage::Summary => summary::run(ctx, state),
    }
}

/// Find an existing conda: on `PATH` first, then inside `conda_root`.
pub(crate) fn find_conda<R: CommandRunner + ?Sized>(runner: &R, conda_root: &Path) -> Option<PathBuf> {
    runner.locate("conda").or_else(|| {
        let bin = conda_bin_in(conda_root);
        bin.is_file().then_some(bin)
    })
}

/// The conda resolved by bootstrap, or an existing one for partial runs.
pub(crate) fn require_conda<R: CommandRunner + ?Sized>(
    runner: &R,
    state: &mut ProvisionState,
) -> Result<PathBuf> {
    if let Some(bin) = &state.conda_bin {
        return Ok(bin.clone());
    }
    let bin = find_conda(runner, &state.conda_root).ok_or_else(|| {
        anyhow!(
            "conda not found on PATH or in {} (run the full setup first)",
            state.conda_root.display()
        )
    })?;
    state.conda_bin = Some(bin.clone());
    Ok(bin)
}
