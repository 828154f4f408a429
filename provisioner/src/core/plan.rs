//! Stage planning: which stages run, in which order, for a CLI mode.

use std::fmt;

/// Entry mode selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every stage.
    Full,
    /// Every stage except checkpoint downloads.
    NoModels,
    /// Only the smoke test against an existing install.
    TestOnly,
}

/// A named provisioning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Preflight,
    Bootstrap,
    SystemPackages,
    Source,
    Dependencies,
    Assets,
    SmokeTest,
    Launchers,
    Summary,
}

impl Stage {
    /// Canonical pipeline order.
    pub const ALL: [Stage; 9] = [
        Stage::Preflight,
        Stage::Bootstrap,
        Stage::SystemPackages,
        Stage::Source,
        Stage::Dependencies,
        Stage::Assets,
        Stage::SmokeTest,
        Stage::Launchers,
        Stage::Summary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Preflight => "preflight",
            Stage::Bootstrap => "bootstrap",
            Stage::SystemPackages => "system-packages",
            Stage::Source => "source",
            Stage::Dependencies => "dependencies",
            Stage::Assets => "assets",
            Stage::SmokeTest => "smoke-test",
            Stage::Launchers => "launchers",
            Stage::Summary => "summary",
        }
    }

    /// Human-readable banner printed before the stage runs.
    pub fn banner(&self) -> &'static str {
        match self {
            Stage::Preflight => "Checking system prerequisites",
            Stage::Bootstrap => "Preparing conda environment",
            Stage::SystemPackages => "Installing system packages",
            Stage::Source => "Fetching source repository",
            Stage::Dependencies => "Installing Python dependencies",
            Stage::Assets => "Downloading model checkpoints",
            Stage::SmokeTest => "Testing installation",
            Stage::Launchers => "Writing launcher scripts",
            Stage::Summary => "Done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages to run for `mode`, in execution order.
///
/// Every mode is a filter over [`Stage::ALL`], so the ordering of shared
/// stages can never drift between modes.
pub fn plan(mode: Mode) -> Vec<Stage> {
    Stage::ALL
        .into_iter()
        .filter(|stage| match mode {
            Mode::Full => true,
            Mode::NoModels => *stage != Stage::Assets,
            Mode::TestOnly => *stage == Stage::SmokeTest,
        })
        .collect()
}
