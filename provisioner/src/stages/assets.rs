//! Pretrained checkpoint archives.
//!
//! A checkpoint whose extraction directory already exists is considered
//! installed and is never downloaded again.

use std::fs;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use super::StageContext;
use crate::core::types::{ProvisionState, StageOutcome};
use crate::io::confirm::Confirm;
use crate::io::fetch::fetch_archive;
use crate::io::process::CommandRunner;
use crate::io::terminal;

#[instrument(skip_all)]
pub fn run<R, C>(ctx: &StageContext<'_, R, C>, state: &mut ProvisionState) -> Result<StageOutcome>
where
    R: CommandRunner + ?Sized,
    C: Confirm + ?Sized,
{
    let mut warnings = Vec::new();
    let mut fetched = 0usize;

    for (checkpoint, dir) in ctx.config.checkpoints.iter().zip(&state.checkpoint_dirs) {
        if dir.exists() {
            debug!(name = %checkpoint.name, dir = %dir.display(), "checkpoint present");
            terminal::info(&format!(
                "{} already present at {}, skipping",
                checkpoint.name,
                dir.display()
            ));
            continue;
        }

        let into = dir.parent().unwrap_or(state.install_dir.as_path());
        fs::create_dir_all(into).with_context(|| format!("create {}", into.display()))?;
        let archive = into.join(checkpoint.archive_name());
        terminal::info(&format!("downloading {} from {}", checkpoint.name, checkpoint.url));
        fetch_archive(ctx.runner, &checkpoint.url, &archive, into)
            .with_context(|| format!("fetch checkpoint {}", checkpoint.name))?;
        fetched += 1;

        if !dir.exists() {
            let message = format!(
                "{} archive did not unpack to {}; it will be downloaded again next run",
                checkpoint.name,
                dir.display()
            );
            terminal::warn(&message);
            warnings.push(message);
        }
    }

    if fetched == 0 {
        return Ok(StageOutcome::skipped("all checkpoints present"));
    }
    Ok(StageOutcome::from_warnings(warnings))
}
