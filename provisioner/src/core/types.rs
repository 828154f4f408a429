//! Shared deterministic types for stage results.

use std::path::PathBuf;

use crate::core::plan::Stage;

/// What a stage did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage performed its work.
    Ran,
    /// The idempotency marker was already present (or there was nothing to do).
    Skipped { reason: String },
    /// The stage completed but raised non-fatal warnings.
    Warned { warnings: Vec<String> },
}

impl StageOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        StageOutcome::Skipped {
            reason: reason.into(),
        }
    }

    /// `Ran` when `warnings` is empty, `Warned` otherwise.
    pub fn from_warnings(warnings: Vec<String>) -> Self {
        if warnings.is_empty() {
            StageOutcome::Ran
        } else {
            StageOutcome::Warned { warnings }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StageOutcome::Ran => "ok",
            StageOutcome::Skipped { .. } => "skipped",
            StageOutcome::Warned { .. } => "ok (warnings)",
        }
    }
}

/// Outcome recorded for one stage of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

/// Resolved paths and decisions threaded through the stages of one run.
#[derive(Debug, Clone)]
pub struct ProvisionState {
    /// Directory launchers and downloaded installers are written to.
    pub workdir: PathBuf,
    /// Conda install prefix: the expanded configured root until bootstrap
    /// replaces it with the prefix of the conda it found or installed.
    pub conda_root: PathBuf,
    /// Conda executable, once located or installed.
    pub conda_bin: Option<PathBuf>,
    /// Clone target for the toolkit repository.
    pub install_dir: PathBuf,
    /// Extraction directory for each configured checkpoint, in config order.
    pub checkpoint_dirs: Vec<PathBuf>,
    /// Launcher scripts written during this run.
    pub launchers: Vec<PathBuf>,
    pub reports: Vec<StageReport>,
}

impl ProvisionState {
    pub fn record(&mut self, stage: Stage, outcome: StageOutcome) {
        self.reports.push(StageReport { stage, outcome });
    }

    pub fn outcome_of(&self, stage: Stage) -> Option<&StageOutcome> {
        self.reports
            .iter()
            .find(|report| report.stage == stage)
            .map(|report| &report.outcome)
    }

    /// Every warning raised so far, prefixed with its stage name.
    pub fn warnings(&self) -> Vec<String> {
        self.reports
            .iter()
            .filter_map(|report| match &report.outcome {
                StageOutcome::Warned { warnings } => Some(
                    warnings
                        .iter()
                        .map(|w| format!("{}: {}", report.stage, w))
                        .collect::<Vec<_>>(),
                ),
                _ => None,
            })
            .flatten()
            .collect()
    }
}
