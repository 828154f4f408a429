//! Orchestration: run the planned stages for a mode, in order, fail-fast.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::core::plan::{Mode, plan};
use crate::core::types::ProvisionState;
use crate::io::confirm::Confirm;
use crate::io::process::CommandRunner;
use crate::io::terminal;
use crate::stages::{StageContext, resolve_state, run_stage};

/// Reminder printed after a `--no-models` run.
pub const NO_MODELS_REMINDER: &str =
    "checkpoints were not downloaded (--no-models); rerun without --no-models to fetch them";

/// Provision `workdir` for `mode`.
///
/// Paths are resolved against the process environment (`HOME`). The first
/// failing stage aborts the run; earlier stages are not rolled back.
pub fn run_pipeline<R, C>(mode: Mode, ctx: &StageContext<'_, R, C>, workdir: &Path) -> Result<ProvisionState>
where
    R: CommandRunner + ?Sized,
    C: Confirm + ?Sized,
{
    let state = resolve_state(ctx.config, workdir, |name| std::env::var(name).ok())?;
    run_with_state(mode, ctx, state)
}

/// Like [`run_pipeline`] with a pre-resolved state.
pub fn run_with_state<R, C>(
    mode: Mode,
    ctx: &StageContext<'_, R, C>,
    mut state: ProvisionState,
) -> Result<ProvisionState>
where
    R: CommandRunner + ?Sized,
    C: Confirm + ?Sized,
{
    let stages = plan(mode);
    debug!(?mode, stages = stages.len(), "starting pipeline");

    for stage in stages {
        terminal::stage(stage);
        let outcome =
            run_stage(stage, ctx, &mut state).with_context(|| format!("stage {stage} failed"))?;
        info!(%stage, outcome = outcome.label(), "stage finished");
        state.record(stage, outcome);
    }

    if mode == Mode::NoModels {
        terminal::warn(NO_MODELS_REMINDER);
    }
    Ok(state)
}
