//! Launcher scripts for the web UI and the notebook server.

use anyhow::Result;
use tracing::instrument;

use super::StageContext;
use crate::core::types::{ProvisionState, StageOutcome};
use crate::io::confirm::Confirm;
use crate::io::launcher::{LauncherParams, render_launcher, write_executable};
use crate::io::process::CommandRunner;
use crate::io::terminal;

#[instrument(skip_all)]
pub fn run<R, C>(ctx: &StageContext<'_, R, C>, state: &mut ProvisionState) -> Result<StageOutcome>
where
    R: CommandRunner + ?Sized,
    C: Confirm + ?Sized,
{
    let launchers = &ctx.config.launchers;
    for launcher in [&launchers.webui, &launchers.notebook] {
        let script = render_launcher(&LauncherParams {
            conda_root: &state.conda_root,
            env_name: &ctx.config.conda.env_name,
            install_dir: &state.install_dir,
            command: &launcher.command,
        })?;
        let path = state.workdir.join(&launcher.file_name);
        write_executable(&path, &script)?;
        terminal::info(&format!("wrote {}", path.display()));
        state.launchers.push(path);
    }
    Ok(StageOutcome::Ran)
}
