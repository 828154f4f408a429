//! Host checks: OS release and CUDA toolkit.
//!
//! Only a missing `nvcc` is fatal. It is reported as [`MissingPrerequisite`]
//! before any other stage has touched the machine.

use std::fmt;
use std::fs;

use anyhow::Result;
use tracing::{debug, instrument, warn};

use super::StageContext;
use crate::core::platform::{cuda_mismatch, os_mismatch, parse_nvcc_release, parse_os_release};
use crate::core::types::{ProvisionState, StageOutcome};
use crate::io::confirm::Confirm;
use crate::io::process::{CommandRunner, CommandSpec, run_checked};
use crate::io::terminal;

/// A hard requirement the provisioner cannot install itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPrerequisite {
    pub what: String,
    pub hint: String,
}

impl fmt::Display for MissingPrerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} not found. {}", self.what, self.hint)
    }
}

impl std::error::Error for MissingPrerequisite {}

#[instrument(skip_all)]
pub fn run<R, C>(ctx: &StageContext<'_, R, C>, _state: &mut ProvisionState) -> Result<StageOutcome>
where
    R: CommandRunner + ?Sized,
    C: Confirm + ?Sized,
{
    let platform = &ctx.config.platform;
    let mut warnings = Vec::new();

    match fs::read_to_string(&platform.os_release_path) {
        Ok(contents) => {
            let release = parse_os_release(&contents);
            debug!(name = ?release.name, version = ?release.version_id, "detected os");
            if let Some(message) =
                os_mismatch(&release, &platform.expected_os, &platform.expected_os_version)
            {
                note(&mut warnings, message);
            }
        }
        Err(err) => {
            warn!(err = %err, "cannot read os-release");
            note(&mut warnings, format!(
                "cannot read {} ({err}); unable to verify the OS",
                platform.os_release_path.display()
            ));
        }
    }

    let Some(nvcc) = ctx.runner.locate("nvcc") else {
        return Err(MissingPrerequisite {
            what: "CUDA toolkit (nvcc)".to_string(),
            hint: format!(
                "Install CUDA {} and make sure nvcc is on PATH.",
                platform.expected_cuda
            ),
        }
        .into());
    };
    let output = run_checked(
        ctx.runner,
        &CommandSpec::new(nvcc.display().to_string())
            .arg("--version")
            .capture(),
    )?;
    let detected = parse_nvcc_release(&output.stdout);
    debug!(cuda = ?detected, "detected cuda toolkit");
    if let Some(message) = cuda_mismatch(detected.as_deref(), &platform.expected_cuda) {
        note(&mut warnings, message);
    } else if let Some(version) = &detected {
        terminal::info(&format!("CUDA {version} detected"));
    }

    Ok(StageOutcome::from_warnings(warnings))
}

/// Print a warning right away so it is shown even if a later check aborts.
fn note(warnings: &mut Vec<String>, message: String) {
    terminal::warn(&message);
    warnings.push(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::process::CommandOutput;
    use crate::stages::resolve_state;
    use crate::test_support::{RecordingRunner, ScriptedConfirm, TestWorkspace};

    const NVCC_118: &str = "Cuda compilation tools, release 11.8, V11.8.89\n";

    #[test]
    fn matching_platform_runs_clean() {
        let ws = TestWorkspace::new().expect("ws");
        let cfg = ws.config().expect("cfg");
        let runner = RecordingRunner::new()
            .with_programs(&["nvcc"])
            .respond(&["nvcc"], CommandOutput::ok_with_stdout(NVCC_118));
        let confirm = ScriptedConfirm::new(&[]);
        let ctx = StageContext { config: &cfg, runner: &runner, confirm: &confirm };
        let mut state = resolve_state(&cfg, ws.path(), |_| None).expect("state");

        let outcome = run(&ctx, &mut state).expect("preflight");
        assert_eq!(outcome, StageOutcome::Ran);
        assert_eq!(runner.command_lines(), vec!["nvcc --version"]);
    }

    #[test]
    fn mismatches_only_warn() {
        let ws = TestWorkspace::new().expect("ws");
        let cfg = ws.config().expect("cfg");
        ws.write("os-release", "NAME=\"Fedora Linux\"\nVERSION_ID=40\n")
            .expect("write");
        let runner = RecordingRunner::new().with_programs(&["nvcc"]).respond(
            &["nvcc"],
            CommandOutput::ok_with_stdout("Cuda compilation tools, release 12.4, V12.4.131\n"),
        );
        let confirm = ScriptedConfirm::new(&[]);
        let ctx = StageContext { config: &cfg, runner: &runner, confirm: &confirm };
        let mut state = resolve_state(&cfg, ws.path(), |_| None).expect("state");

        let StageOutcome::Warned { warnings } = run(&ctx, &mut state).expect("preflight") else {
            panic!("expected warnings");
        };
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("Fedora Linux 40"));
        assert!(warnings[1].contains("CUDA 12.4"));
    }

    #[test]
    fn missing_os_release_warns() {
        let ws = TestWorkspace::new().expect("ws");
        let mut cfg = ws.config().expect("cfg");
        cfg.platform.os_release_path = ws.path().join("absent");
        let runner = RecordingRunner::new()
            .with_programs(&["nvcc"])
            .respond(&["nvcc"], CommandOutput::ok_with_stdout(NVCC_118));
        let confirm = ScriptedConfirm::new(&[]);
        let ctx = StageContext { config: &cfg, runner: &runner, confirm: &confirm };
        let mut state = resolve_state(&cfg, ws.path(), |_| None).expect("state");

        let outcome = run(&ctx, &mut state).expect("preflight");
        assert!(matches!(outcome, StageOutcome::Warned { .. }));
    }

    #[test]
    fn missing_nvcc_is_a_typed_error_without_commands() {
        let ws = TestWorkspace::new().expect("ws");
        let cfg = ws.config().expect("cfg");
        let runner = RecordingRunner::new();
        let confirm = ScriptedConfirm::new(&[]);
        let ctx = StageContext { config: &cfg, runner: &runner, confirm: &confirm };
        let mut state = resolve_state(&cfg, ws.path(), |_| None).expect("state");

        let err = run(&ctx, &mut state).unwrap_err();
        let missing = err
            .downcast_ref::<MissingPrerequisite>()
            .expect("missing prerequisite");
        assert!(missing.to_string().contains("CUDA toolkit"));
        assert!(runner.calls().is_empty());
    }
}
