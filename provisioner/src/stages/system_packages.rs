//! apt packages needed by the toolkit (ffmpeg, libsndfile, espeak-ng, ...).

use anyhow::Result;
use tracing::instrument;

use super::StageContext;
use crate::core::types::{ProvisionState, StageOutcome};
use crate::io::confirm::Confirm;
use crate::io::process::{CommandRunner, CommandSpec, run_checked};

#[instrument(skip_all)]
pub fn run<R, C>(ctx: &StageContext<'_, R, C>, _state: &mut ProvisionState) -> Result<StageOutcome>
where
    R: CommandRunner + ?Sized,
    C: Confirm + ?Sized,
{
    let system = &ctx.config.system;
    if system.packages.is_empty() {
        return Ok(StageOutcome::skipped("no system packages configured"));
    }
    run_checked(ctx.runner, &apt(system.use_sudo).arg("update"))?;
    run_checked(
        ctx.runner,
        &apt(system.use_sudo)
            .args(["install", "-y"])
            .args(system.packages.iter().cloned()),
    )?;
    Ok(StageOutcome::Ran)
}

fn apt(use_sudo: bool) -> CommandSpec {
    if use_sudo {
        CommandSpec::new("sudo").arg("apt-get")
    } else {
        CommandSpec::new("apt-get")
    }
}
