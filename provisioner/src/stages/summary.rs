//! Final usage summary.

use std::fmt::Write as _;

use anyhow::Result;

use super::StageContext;
use crate::core::types::{ProvisionState, StageOutcome};
use crate::io::config::ProvisionConfig;
use crate::io::confirm::Confirm;
use crate::io::process::CommandRunner;

pub fn run<R, C>(ctx: &StageContext<'_, R, C>, state: &mut ProvisionState) -> Result<StageOutcome>
where
    R: CommandRunner + ?Sized,
    C: Confirm + ?Sized,
{
    print!("{}", render_summary(ctx.config, state));
    Ok(StageOutcome::Ran)
}

/// Human-readable summary of what was provisioned and how to use it.
pub fn render_summary(config: &ProvisionConfig, state: &ProvisionState) -> String {
    let env = &config.conda.env_name;
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "Installation directory: {}", state.install_dir.display());
    let _ = writeln!(out, "Conda environment:      {env}");

    if !state.reports.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Stages:");
        for report in &state.reports {
            let _ = write!(out, "  {:<16} {}", report.stage.as_str(), report.outcome.label());
            if let StageOutcome::Skipped { reason } = &report.outcome {
                let _ = write!(out, " ({reason})");
            }
            let _ = writeln!(out);
        }
    }

    let warnings = state.warnings();
    if !warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Warnings:");
        for warning in &warnings {
            let _ = writeln!(out, "  {warning}");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Usage:");
    for launcher in &state.launchers {
        let _ = writeln!(out, "  {}", launcher.display());
    }
    let _ = writeln!(out, "  or manually:");
    let _ = writeln!(
        out,
        "    source {}/etc/profile.d/conda.sh",
        state.conda_root.display()
    );
    let _ = writeln!(out, "    conda activate {env}");
    let _ = writeln!(out, "    cd {}", state.install_dir.display());

    let missing: Vec<_> = state
        .checkpoint_dirs
        .iter()
        .filter(|dir| !dir.exists())
        .collect();
    if !missing.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Checkpoints not installed:");
        for dir in missing {
            let _ = writeln!(out, "  {}", dir.display());
        }
    }
    out
}
