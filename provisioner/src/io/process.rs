//! Child-process execution behind the [`CommandRunner`] trait.
//!
//! Stages describe what to run as a [`CommandSpec`]; the runner decides how.
//! [`SystemRunner`] spawns real processes, and tests substitute a recording
//! fake so invocation arguments can be asserted without side effects.

use std::env;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Bytes of captured stdout/stderr kept in memory per stream.
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 1_000_000;

/// A single external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Capture stdout/stderr instead of streaming them to the terminal.
    pub capture: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            capture: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Final path component of `program` (`/opt/conda/bin/conda` -> `conda`).
    pub fn program_name(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(self.program.as_str())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Captured stdout (empty unless capture was requested).
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0) && !self.timed_out
    }

    /// Successful output carrying `stdout`.
    pub fn ok_with_stdout(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    pub fn failed(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Self::default()
        }
    }
}

/// Capability to run external programs.
pub trait CommandRunner {
    /// Run `spec` to completion. A non-zero exit is reported in the output, not
    /// as an error; errors are reserved for spawn/wait failures.
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Resolve `program` on `PATH`, like `command -v`.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Run `spec` and turn any non-zero exit into an error naming the command.
pub fn run_checked<R: CommandRunner + ?Sized>(
    runner: &R,
    spec: &CommandSpec,
) -> Result<CommandOutput> {
    let output = runner.run(spec)?;
    if output.timed_out {
        return Err(anyhow!("`{spec}` timed out"));
    }
    if !output.success() {
        let stderr = output.stderr.trim();
        let code = output
            .code
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        if stderr.is_empty() {
            return Err(anyhow!("`{spec}` failed with exit code {code}"));
        }
        return Err(anyhow!("`{spec}` failed with exit code {code}: {stderr}"));
    }
    Ok(output)
}

/// Runner that spawns real processes.
///
/// Uncaptured commands inherit the terminal (stdin included, so `sudo` can
/// ask for a password); captured commands get a null stdin and piped output.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Option<Duration>,
    output_limit_bytes: usize,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
        }
    }

    pub fn with_output_limit(mut self, bytes: usize) -> Self {
        self.output_limit_bytes = bytes;
        self
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CommandRunner for SystemRunner {
    #[instrument(skip_all, fields(program = %spec.program, capture = spec.capture))]
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        if spec.capture {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        } else {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        }

        debug!(command = %spec, "spawning child process");
        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                error!(err = %e, "failed to spawn command");
                return Err(e).with_context(|| format!("spawn `{spec}`"));
            }
        };

        let readers = if spec.capture {
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| anyhow!("stdout was not piped"))?;
            let stderr = child
                .stderr
                .take()
                .ok_or_else(|| anyhow!("stderr was not piped"))?;
            let limit = self.output_limit_bytes;
            Some((
                thread::spawn(move || read_stream_limited(stdout, limit)),
                thread::spawn(move || read_stream_limited(stderr, limit)),
            ))
        } else {
            None
        };

        let (status, timed_out) = wait_child(&mut child, self.timeout)
            .with_context(|| format!("wait for `{spec}`"))?;

        let (stdout, stderr) = match readers {
            Some((out, err)) => (
                join_output(out).context("join stdout")?,
                join_output(err).context("join stderr")?,
            ),
            None => (String::new(), String::new()),
        };

        debug!(exit_code = ?status.code(), timed_out, "command finished");
        Ok(CommandOutput {
            code: status.code(),
            stdout,
            stderr,
            timed_out,
        })
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        if program.contains('/') {
            let path = PathBuf::from(program);
            return is_executable(&path).then_some(path);
        }
        let paths = env::var_os("PATH")?;
        env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
    }
}

fn wait_child(child: &mut Child, timeout: Option<Duration>) -> Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        return Ok((child.wait().context("wait for command")?, false));
    };
    match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => Ok((status, false)),
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            child.kill().context("kill command")?;
            Ok((child.wait().context("wait command after kill")?, true))
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn join_output(handle: thread::JoinHandle<Result<String>>) -> Result<String> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

/// Drain `reader` fully, keeping at most `limit` bytes.
fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<String> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        let keep = n.min(remaining);
        buf.extend_from_slice(&chunk[..keep]);
        truncated += n - keep;
    }

    if truncated > 0 {
        warn!(truncated, "captured output truncated");
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
