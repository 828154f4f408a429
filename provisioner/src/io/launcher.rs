//! Generated artifacts: launcher scripts and the smoke-test snippet.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::debug;

const LAUNCHER_TEMPLATE: &str = include_str!("templates/launcher.sh.j2");
const SMOKE_TEST_TEMPLATE: &str = include_str!("templates/smoke_test.py.j2");

/// Values substituted into a launcher script.
#[derive(Debug, Clone)]
pub struct LauncherParams<'a> {
    pub conda_root: &'a Path,
    pub env_name: &'a str,
    pub install_dir: &'a Path,
    pub command: &'a [String],
}

/// Template engine wrapper around minijinja.
struct Templates {
    env: Environment<'static>,
}

impl Templates {
    fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("launcher", LAUNCHER_TEMPLATE)
            .context("load launcher template")?;
        env.add_template("smoke_test", SMOKE_TEST_TEMPLATE)
            .context("load smoke test template")?;
        Ok(Self { env })
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let template = self.env.get_template(name)?;
        let mut rendered = template
            .render(ctx)
            .with_context(|| format!("render {name} template"))?;
        if !rendered.ends_with('\n') {
            rendered.push('\n');
        }
        Ok(rendered)
    }
}

/// Render a bash launcher that activates the env and execs `params.command`.
pub fn render_launcher(params: &LauncherParams<'_>) -> Result<String> {
    let command = params
        .command
        .iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ");
    let conda_sh = params.conda_root.join("etc/profile.d/conda.sh");
    Templates::new()?.render(
        "launcher",
        context! {
            conda_sh => shell_quote(&conda_sh.display().to_string()),
            env_name => shell_quote(params.env_name),
            install_dir => shell_quote(&params.install_dir.display().to_string()),
            command => command,
        },
    )
}

/// Render the inline Python used by the smoke test.
pub fn render_smoke_test(framework: &str, modules: &[String]) -> Result<String> {
    Templates::new()?.render(
        "smoke_test",
        context! {
            framework => framework,
            modules => modules,
        },
    )
}

/// Write `contents` to `path` and mark it executable (0755).
pub fn write_executable(path: &Path, contents: &str) -> Result<()> {
    debug!(path = %path.display(), "writing executable script");
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
    set_executable(path)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("chmod {}", path.display()))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Single-quote `arg` for bash unless it is made of plainly safe characters.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launcher_activates_env_and_execs_command() {
        let command = vec![
            "python".to_string(),
            "-m".to_string(),
            "openvoice_app".to_string(),
            "--share".to_string(),
        ];
        let script = render_launcher(&LauncherParams {
            conda_root: Path::new("/home/alice/miniconda3"),
            env_name: "openvoice",
            install_dir: Path::new("/work/OpenVoice"),
            command: &command,
        })
        .expect("render");

        assert!(script.starts_with("#!/usr/bin/env bash\n"));
        assert!(script.contains("source /home/alice/miniconda3/etc/profile.d/conda.sh\n"));
        assert!(script.contains("conda activate openvoice\n"));
        assert!(script.contains("cd /work/OpenVoice\n"));
        assert!(script.contains("exec python -m openvoice_app --share \"$@\""));
    }

    #[test]
    fn launcher_quotes_paths_with_shell_metacharacters() {
        let command = vec!["jupyter".to_string(), "notebook".to_string()];
        let script = render_launcher(&LauncherParams {
            conda_root: Path::new("/home/al ice/$conda`x`"),
            env_name: "openvoice",
            install_dir: Path::new("/work/\"Open Voice\""),
            command: &command,
        })
        .expect("render");

        assert!(script.contains("source '/home/al ice/$conda`x`/etc/profile.d/conda.sh'\n"));
        assert!(script.contains("cd '/work/\"Open Voice\"'\n"));
        assert!(script.contains("exec jupyter notebook \"$@\""));
    }

    #[test]
    fn smoke_test_imports_framework_and_modules() {
        let snippet =
            render_smoke_test("torch", &["openvoice".to_string(), "melo".to_string()])
                .expect("render");
        assert!(snippet.starts_with("import torch\n"));
        assert!(snippet.contains("torch.cuda.is_available()"));
        assert!(snippet.contains("import openvoice\n"));
        assert!(snippet.contains("import melo\n"));
        assert!(snippet.trim_end().ends_with("print(\"Installation test passed\")"));
    }

    #[test]
    fn shell_quote_wraps_unsafe_args() {
        assert_eq!(shell_quote("--share"), "--share");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[cfg(unix)]
    #[test]
    fn write_executable_sets_mode() {
        use std::os::unix::fs::PermissionsExt;
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("start.sh");
        write_executable(&path, "#!/bin/sh\n").expect("write");
        let mode = fs::metadata(&path).expect("meta").permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
