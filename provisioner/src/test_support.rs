//! Test-only fakes for the runner, prompts, and a scratch workspace.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::io::config::ProvisionConfig;
use crate::io::confirm::Confirm;
use crate::io::process::{CommandOutput, CommandRunner, CommandSpec};

/// Fake [`CommandRunner`] that records every invocation.
///
/// Commands succeed with empty output unless a response was registered for a
/// matching prefix of `[program_name, args...]`. `locate` only finds
/// programs registered with [`RecordingRunner::with_programs`].
#[derive(Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<CommandSpec>>,
    responses: Vec<(Vec<String>, CommandOutput)>,
    programs: HashSet<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `output` to commands whose words start with `prefix`.
    /// Earlier registrations win.
    pub fn respond(mut self, prefix: &[&str], output: CommandOutput) -> Self {
        self.responses
            .push((prefix.iter().map(|s| s.to_string()).collect(), output));
        self
    }

    /// Make `programs` discoverable on the fake `PATH` under `/fake/bin`.
    pub fn with_programs(mut self, programs: &[&str]) -> Self {
        self.programs
            .extend(programs.iter().map(|p| p.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Calls whose program file name is `program`.
    pub fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
        self.calls
            .borrow()
            .iter()
            .filter(|spec| spec.program_name() == program)
            .cloned()
            .collect()
    }

    /// Each call rendered as `program_name arg1 arg2 ...`.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(command_line).collect()
    }
}

fn command_line(spec: &CommandSpec) -> String {
    std::iter::once(spec.program_name().to_string())
        .chain(spec.args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn words(spec: &CommandSpec) -> Vec<String> {
    std::iter::once(spec.program_name().to_string())
        .chain(spec.args.iter().cloned())
        .collect()
}

impl CommandRunner for RecordingRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(spec.clone());
        let words = words(spec);
        let output = self
            .responses
            .iter()
            .find(|(prefix, _)| words.starts_with(prefix))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CommandOutput::ok_with_stdout(""));
        Ok(output)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.programs
            .contains(program)
            .then(|| PathBuf::from("/fake/bin").join(program))
    }
}

/// [`Confirm`] that replays scripted answers and records the questions.
///
/// Running out of answers is an error so tests notice unexpected prompts.
#[derive(Default)]
pub struct ScriptedConfirm {
    answers: RefCell<VecDeque<bool>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().copied().collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, question: &str) -> Result<bool> {
        self.asked.borrow_mut().push(question.to_string());
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("unexpected prompt: {question}"))
    }
}

/// Conda env listing in `conda env list --json` format.
pub fn env_list_json(conda_root: &Path, envs: &[&str]) -> String {
    let mut prefixes = vec![conda_root.display().to_string()];
    prefixes.extend(
        envs.iter()
            .map(|env| conda_root.join("envs").join(env).display().to_string()),
    );
    serde_json::json!({ "envs": prefixes }).to_string()
}

/// Temporary working directory with a config pointing inside it.
pub struct TestWorkspace {
    temp: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        Ok(Self { temp })
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Default config with os-release and the conda root redirected into the
    /// workspace so nothing outside it is read.
    pub fn config(&self) -> Result<ProvisionConfig> {
        let mut cfg = ProvisionConfig::default();
        cfg.platform.os_release_path = self.path().join("os-release");
        cfg.conda.root = self.conda_root().display().to_string();
        self.write("os-release", "NAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\n")?;
        Ok(cfg)
    }

    pub fn conda_root(&self) -> PathBuf {
        self.path().join("miniconda3")
    }

    pub fn write(&self, rel: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn mkdir(&self, rel: impl AsRef<Path>) -> Result<PathBuf> {
        let path = self.path().join(rel);
        fs::create_dir_all(&path).with_context(|| format!("create {}", path.display()))?;
        Ok(path)
    }
}
