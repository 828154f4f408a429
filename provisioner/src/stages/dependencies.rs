//! Python dependencies, installed inside the conda env with `conda run`.

use anyhow::{Context, Result};
use tracing::instrument;

use super::{StageContext, require_conda};
use crate::core::types::{ProvisionState, StageOutcome};
use crate::io::conda::Conda;
use crate::io::confirm::Confirm;
use crate::io::process::CommandRunner;
use crate::io::terminal;

#[instrument(skip_all)]
pub fn run<R, C>(ctx: &StageContext<'_, R, C>, state: &mut ProvisionState) -> Result<StageOutcome>
where
    R: CommandRunner + ?Sized,
    C: Confirm + ?Sized,
{
    let deps = &ctx.config.dependencies;
    let env = ctx.config.conda.env_name.as_str();
    let bin = require_conda(ctx.runner, state)?;
    let conda = Conda::new(ctx.runner, bin);
    let mut ran_any = false;

    if !deps.framework_packages.is_empty() {
        let mut args = pip_install(deps.framework_packages.iter().cloned());
        if !deps.framework_index_url.is_empty() {
            args.push("--index-url".to_string());
            args.push(deps.framework_index_url.clone());
        }
        terminal::info(&format!("installing {}", deps.framework_packages.join(", ")));
        conda
            .run_in_env(env, &args, None)
            .context("install framework packages")?;
        ran_any = true;
    }

    if deps.editable_install {
        terminal::info(&format!("installing {} in editable mode", state.install_dir.display()));
        conda
            .run_in_env(
                env,
                &pip_install(["-e".to_string(), ".".to_string()]),
                Some(state.install_dir.as_path()),
            )
            .context("install toolkit package")?;
        ran_any = true;
    }

    if !deps.extra_packages.is_empty() {
        terminal::info(&format!("installing {}", deps.extra_packages.join(", ")));
        conda
            .run_in_env(env, &pip_install(deps.extra_packages.iter().cloned()), None)
            .context("install extra packages")?;
        ran_any = true;
    }

    for command in &deps.data_commands {
        terminal::info(&format!("running {}", command.join(" ")));
        conda
            .run_in_env(env, command, None)
            .with_context(|| format!("run `{}`", command.join(" ")))?;
        ran_any = true;
    }

    if !ran_any {
        return Ok(StageOutcome::skipped("no dependencies configured"));
    }
    Ok(StageOutcome::Ran)
}

fn pip_install(packages: impl IntoIterator<Item = String>) -> Vec<String> {
    ["pip".to_string(), "install".to_string()]
        .into_iter()
        .chain(packages)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::resolve_state;
    use crate::test_support::{RecordingRunner, ScriptedConfirm, TestWorkspace};

    #[test]
    fn installs_in_order_inside_env() {
        let ws = TestWorkspace::new().expect("ws");
        let cfg = ws.config().expect("cfg");
        let runner = RecordingRunner::new().with_programs(&["conda"]);
        let confirm = ScriptedConfirm::new(&[]);
        let ctx = StageContext { config: &cfg, runner: &runner, confirm: &confirm };
        let mut state = resolve_state(&cfg, ws.path(), |_| None).expect("state");

        assert_eq!(run(&ctx, &mut state).expect("deps"), StageOutcome::Ran);
        let prefix = "conda run -n openvoice --no-capture-output";
        assert_eq!(
            runner.command_lines(),
            vec![
                format!(
                    "{prefix} pip install torch torchvision torchaudio --index-url https://download.pytorch.org/whl/cu118"
                ),
                format!("{prefix} pip install -e ."),
                format!("{prefix} pip install git+https://github.com/myshell-ai/MeloTTS.git"),
                format!("{prefix} python -m unidic download"),
            ]
        );
        assert_eq!(runner.calls()[1].cwd.as_ref(), Some(&state.install_dir));
    }

    #[test]
    fn nothing_configured_skips() {
        let ws = TestWorkspace::new().expect("ws");
        let mut cfg = ws.config().expect("cfg");
        cfg.dependencies.framework_packages.clear();
        cfg.dependencies.editable_install = false;
        cfg.dependencies.extra_packages.clear();
        cfg.dependencies.data_commands.clear();
        let runner = RecordingRunner::new().with_programs(&["conda"]);
        let confirm = ScriptedConfirm::new(&[]);
        let ctx = StageContext { config: &cfg, runner: &runner, confirm: &confirm };
        let mut state = resolve_state(&cfg, ws.path(), |_| None).expect("state");

        assert!(matches!(
            run(&ctx, &mut state).expect("deps"),
            StageOutcome::Skipped { .. }
        ));
        assert!(runner.calls().is_empty());
    }
}
