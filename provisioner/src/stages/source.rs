//! Clone the toolkit repository, or update an existing checkout.

use std::fs;

use anyhow::{Context, Result, bail};
use tracing::{info, instrument};

use super::StageContext;
use crate::core::types::{ProvisionState, StageOutcome};
use crate::io::confirm::Confirm;
use crate::io::git::Git;
use crate::io::process::CommandRunner;
use crate::io::terminal;

#[instrument(skip_all)]
pub fn run<R, C>(ctx: &StageContext<'_, R, C>, state: &mut ProvisionState) -> Result<StageOutcome>
where
    R: CommandRunner + ?Sized,
    C: Confirm + ?Sized,
{
    let url = ctx.config.source.repo_url.as_str();
    let dir = state.install_dir.as_path();
    let git = Git::new(ctx.runner, &state.workdir);

    if dir.exists() {
        if !dir.is_dir() {
            bail!("{} exists but is not a directory", dir.display());
        }
        let question = format!("Directory {} already exists. Remove it and clone again?", dir.display());
        if !ctx.confirm.confirm(&question)? {
            info!(dir = %dir.display(), "keeping existing checkout");
            terminal::info("keeping existing checkout, pulling latest changes");
            git.pull(dir)?;
            return Ok(StageOutcome::skipped("kept existing checkout (pulled)"));
        }
        fs::remove_dir_all(dir).with_context(|| format!("remove {}", dir.display()))?;
    }

    git.clone_repo(url, dir)?;
    terminal::info(&format!("cloned {url} into {}", dir.display()));
    Ok(StageOutcome::Ran)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::resolve_state;
    use crate::test_support::{RecordingRunner, ScriptedConfirm, TestWorkspace};

    #[test]
    fn clones_when_absent() {
        let ws = TestWorkspace::new().expect("ws");
        let cfg = ws.config().expect("cfg");
        let runner = RecordingRunner::new();
        let confirm = ScriptedConfirm::new(&[]);
        let ctx = StageContext { config: &cfg, runner: &runner, confirm: &confirm };
        let mut state = resolve_state(&cfg, ws.path(), |_| None).expect("state");

        assert_eq!(run(&ctx, &mut state).expect("source"), StageOutcome::Ran);
        assert_eq!(
            runner.command_lines(),
            vec![format!(
                "git clone https://github.com/myshell-ai/OpenVoice.git {}",
                state.install_dir.display()
            )]
        );
    }

    #[test]
    fn declining_reclone_pulls_and_keeps_files() {
        let ws = TestWorkspace::new().expect("ws");
        let cfg = ws.config().expect("cfg");
        let marker = ws.write("OpenVoice/local.txt", "keep me").expect("write");
        let runner = RecordingRunner::new();
        let confirm = ScriptedConfirm::new(&[false]);
        let ctx = StageContext { config: &cfg, runner: &runner, confirm: &confirm };
        let mut state = resolve_state(&cfg, ws.path(), |_| None).expect("state");

        let outcome = run(&ctx, &mut state).expect("source");
        assert!(matches!(outcome, StageOutcome::Skipped { .. }));
        assert!(marker.exists());
        assert_eq!(runner.calls_to("git").len(), 1);
        assert_eq!(runner.calls()[0].args[2], "pull");
    }

    #[test]
    fn accepting_reclone_removes_directory_first() {
        let ws = TestWorkspace::new().expect("ws");
        let cfg = ws.config().expect("cfg");
        let marker = ws.write("OpenVoice/local.txt", "stale").expect("write");
        let runner = RecordingRunner::new();
        let confirm = ScriptedConfirm::new(&[true]);
        let ctx = StageContext { config: &cfg, runner: &runner, confirm: &confirm };
        let mut state = resolve_state(&cfg, ws.path(), |_| None).expect("state");

        assert_eq!(run(&ctx, &mut state).expect("source"), StageOutcome::Ran);
        assert!(!marker.exists());
        assert_eq!(runner.calls()[0].args[0], "clone");
    }

    #[test]
    fn file_in_place_of_directory_is_an_error() {
        let ws = TestWorkspace::new().expect("ws");
        let cfg = ws.config().expect("cfg");
        ws.write("OpenVoice", "not a dir").expect("write");
        let runner = RecordingRunner::new();
        let confirm = ScriptedConfirm::new(&[]);
        let ctx = StageContext { config: &cfg, runner: &runner, confirm: &confirm };
        let mut state = resolve_state(&cfg, ws.path(), |_| None).expect("state");

        assert!(run(&ctx, &mut state).is_err());
        assert!(runner.calls().is_empty());
    }
}
