//! Conda adapter: installer bootstrap, env management, and running commands
//! inside an env.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::fetch::{download, remove_file_if_exists};
use super::process::{CommandRunner, CommandSpec, run_checked};

/// Wrapper around a specific conda executable.
pub struct Conda<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    bin: PathBuf,
}

impl<'a, R: CommandRunner + ?Sized> Conda<'a, R> {
    pub fn new(runner: &'a R, bin: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            bin: bin.into(),
        }
    }

    /// Names of all known envs (final component of each env prefix).
    pub fn env_names(&self) -> Result<Vec<String>> {
        let out = run_checked(
            self.runner,
            &self.command().args(["env", "list", "--json"]).capture(),
        )?;
        parse_env_list(&out.stdout)
    }

    pub fn env_exists(&self, name: &str) -> Result<bool> {
        Ok(self.env_names()?.iter().any(|env| env == name))
    }

    #[instrument(skip_all, fields(name, python_version))]
    pub fn create_env(&self, name: &str, python_version: &str) -> Result<()> {
        info!("creating conda env");
        run_checked(
            self.runner,
            &self
                .command()
                .args(["create", "-y", "-n", name])
                .arg(format!("python={python_version}")),
        )?;
        Ok(())
    }

    #[instrument(skip_all, fields(name))]
    pub fn remove_env(&self, name: &str) -> Result<()> {
        info!("removing conda env");
        run_checked(
            self.runner,
            &self.command().args(["env", "remove", "-y", "-n", name]),
        )?;
        Ok(())
    }

    /// Register conda's shell hook for `shell` (`conda init bash`).
    pub fn init_shell(&self, shell: &str) -> Result<()> {
        run_checked(self.runner, &self.command().args(["init", shell]))?;
        Ok(())
    }

    /// Run `args` inside `env`, streaming output to the terminal.
    pub fn run_in_env(&self, env: &str, args: &[String], cwd: Option<&Path>) -> Result<()> {
        let mut spec = self
            .command()
            .args(["run", "-n", env, "--no-capture-output"])
            .args(args.iter().cloned());
        if let Some(dir) = cwd {
            spec = spec.current_dir(dir);
        }
        debug!(command = %spec, "running inside env");
        run_checked(self.runner, &spec)?;
        Ok(())
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(self.bin.display().to_string())
    }
}

#[derive(Debug, Deserialize)]
struct EnvList {
    envs: Vec<PathBuf>,
}

/// Parse `conda env list --json` output into env names.
pub fn parse_env_list(json: &str) -> Result<Vec<String>> {
    let list: EnvList = serde_json::from_str(json).context("parse conda env list")?;
    Ok(list
        .envs
        .iter()
        .filter_map(|prefix| prefix.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect())
}

/// Non-interactively install Miniconda into `root`.
///
/// The installer script is downloaded to `installer`, run in batch mode,
/// conda's bash hook is registered, and the installer is deleted. Returns the
/// path of the new conda executable.
#[instrument(skip_all, fields(url = installer_url))]
pub fn install_miniconda<R: CommandRunner + ?Sized>(
    runner: &R,
    installer_url: &str,
    installer: &Path,
    root: &Path,
) -> Result<PathBuf> {
    info!(root = %root.display(), "installing miniconda");
    download(runner, installer_url, installer)?;
    let spec = CommandSpec::new("bash")
        .path_arg(installer)
        .arg("-b")
        .arg("-p")
        .path_arg(root);
    run_checked(runner, &spec).context("run conda installer")?;

    let bin = conda_bin_in(root);
    Conda::new(runner, &bin).init_shell("bash")?;
    remove_file_if_exists(installer)?;
    Ok(bin)
}

/// Location of the conda executable inside an install prefix.
pub fn conda_bin_in(root: &Path) -> PathBuf {
    root.join("bin").join("conda")
}
