//! Conda bootstrap: install conda if needed, then create or reuse the env.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, instrument};

use super::{StageContext, find_conda};
use crate::core::types::{ProvisionState, StageOutcome};
use crate::io::conda::{Conda, install_miniconda};
use crate::io::confirm::Confirm;
use crate::io::process::CommandRunner;
use crate::io::terminal;

const INSTALLER_FALLBACK_NAME: &str = "miniconda-installer.sh";

#[instrument(skip_all)]
pub fn run<R, C>(ctx: &StageContext<'_, R, C>, state: &mut ProvisionState) -> Result<StageOutcome>
where
    R: CommandRunner + ?Sized,
    C: Confirm + ?Sized,
{
    let conda_cfg = &ctx.config.conda;
    let mut installed = false;

    let bin = match find_conda(ctx.runner, &state.conda_root) {
        Some(bin) => {
            terminal::info(&format!("using conda at {}", bin.display()));
            bin
        }
        None => {
            terminal::info(&format!(
                "conda not found, installing Miniconda to {}",
                state.conda_root.display()
            ));
            let installer = state.workdir.join(installer_name(&conda_cfg.installer_url));
            installed = true;
            install_miniconda(
                ctx.runner,
                &conda_cfg.installer_url,
                &installer,
                &state.conda_root,
            )
            .context("install miniconda")?
        }
    };
    if let Some(prefix) = conda_prefix(&bin) {
        if prefix != state.conda_root {
            info!(prefix = %prefix.display(), "conda prefix differs from configured root");
        }
        state.conda_root = prefix;
    }
    state.conda_bin = Some(bin.clone());

    let conda = Conda::new(ctx.runner, &bin);
    let env = conda_cfg.env_name.as_str();
    if conda.env_exists(env)? {
        let question = format!("Conda environment '{env}' already exists. Remove and recreate it?");
        if !ctx.confirm.confirm(&question)? {
            info!(env, "reusing existing env");
            terminal::info(&format!("reusing existing environment '{env}'"));
            if installed {
                return Ok(StageOutcome::Ran);
            }
            return Ok(StageOutcome::skipped(format!("reused existing env '{env}'")));
        }
        conda.remove_env(env)?;
    }
    conda.create_env(env, &conda_cfg.python_version)?;
    terminal::info(&format!(
        "created environment '{env}' (python {})",
        conda_cfg.python_version
    ));
    Ok(StageOutcome::Ran)
}

/// Install prefix of a conda executable: `<prefix>/bin/conda` or
/// `<prefix>/condabin/conda`, following a symlinked entry on `PATH`.
fn conda_prefix(bin: &Path) -> Option<PathBuf> {
    let resolved = fs::canonicalize(bin).unwrap_or_else(|_| bin.to_path_buf());
    resolved
        .parent()
        .and_then(Path::parent)
        .filter(|prefix| !prefix.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

fn installer_name(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|name| name.ends_with(".sh"))
        .unwrap_or(INSTALLER_FALLBACK_NAME)
        .to_string()
}
