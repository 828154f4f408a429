//! Provisioner configuration, optionally loaded from `provision.toml`.
//!
//! Every URL, name, and version the pipeline touches lives here so tests (and
//! operators) can point the stages at local fixtures or alternate mirrors.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "provision.toml";

/// Provisioner configuration (TOML).
///
/// Missing fields default to the OpenVoice install the tool was written for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Kill any single external command that runs longer than this. Unset
    /// means wait indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,

    pub platform: PlatformConfig,
    pub conda: CondaConfig,
    pub system: SystemConfig,
    pub source: SourceConfig,
    pub dependencies: DependenciesConfig,
    pub checkpoints: Vec<CheckpointConfig>,
    pub smoke_test: SmokeTestConfig,
    pub launchers: LaunchersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlatformConfig {
    pub os_release_path: PathBuf,
    /// Matched case-insensitively against `NAME` in os-release.
    pub expected_os: String,
    pub expected_os_version: String,
    /// Compared component-wise against the `nvcc` release.
    pub expected_cuda: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CondaConfig {
    /// Install prefix; `~`, `$HOME` and `${VAR}` are expanded.
    pub root: String,
    pub installer_url: String,
    pub env_name: String,
    pub python_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SystemConfig {
    /// Prefix apt commands with `sudo`.
    pub use_sudo: bool,
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceConfig {
    pub repo_url: String,
    /// Clone target, relative to the working directory.
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DependenciesConfig {
    pub framework_packages: Vec<String>,
    pub framework_index_url: String,
    /// Run `pip install -e .` inside the cloned repository.
    pub editable_install: bool,
    /// Extra pip requirement specs (names or `git+` URLs).
    pub extra_packages: Vec<String>,
    /// Commands run inside the env after installation (e.g. data downloads).
    pub data_commands: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckpointConfig {
    pub name: String,
    pub url: String,
    /// Directory the archive unpacks to, relative to the install dir. Its
    /// presence marks the checkpoint as installed.
    pub dir: PathBuf,
}

impl CheckpointConfig {
    /// File name the archive is saved under (last URL path segment).
    pub fn archive_name(&self) -> String {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        match path.rsplit('/').next().filter(|s| !s.is_empty()) {
            Some(segment) => segment.to_string(),
            None => format!("{}.zip", self.name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SmokeTestConfig {
    /// Numeric framework module; must expose `__version__` and `cuda.is_available()`.
    pub framework_module: String,
    /// Modules of the installed package that must import cleanly.
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LaunchersConfig {
    pub webui: LauncherConfig,
    pub notebook: LauncherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LauncherConfig {
    /// Script name, written to the working directory.
    pub file_name: String,
    /// Command executed inside the install dir with the env active.
    pub command: Vec<String>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            os_release_path: PathBuf::from("/etc/os-release"),
            expected_os: "Ubuntu".to_string(),
            expected_os_version: "22.04".to_string(),
            expected_cuda: "11.8".to_string(),
        }
    }
}

impl Default for CondaConfig {
    fn default() -> Self {
        Self {
            root: "$HOME/miniconda3".to_string(),
            installer_url: "https://repo.anaconda.com/miniconda/Miniconda3-latest-Linux-x86_64.sh"
                .to_string(),
            env_name: "openvoice".to_string(),
            python_version: "3.9".to_string(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            use_sudo: true,
            packages: ["ffmpeg", "libsndfile1", "espeak-ng", "git", "wget", "unzip"]
                .map(str::to_string)
                .to_vec(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repo_url: "https://github.com/myshell-ai/OpenVoice.git".to_string(),
            dir: PathBuf::from("OpenVoice"),
        }
    }
}

impl Default for DependenciesConfig {
    fn default() -> Self {
        Self {
            framework_packages: ["torch", "torchvision", "torchaudio"]
                .map(str::to_string)
                .to_vec(),
            framework_index_url: "https://download.pytorch.org/whl/cu118".to_string(),
            editable_install: true,
            extra_packages: vec!["git+https://github.com/myshell-ai/MeloTTS.git".to_string()],
            data_commands: vec![
                ["python", "-m", "unidic", "download"]
                    .map(str::to_string)
                    .to_vec(),
            ],
        }
    }
}

impl Default for SmokeTestConfig {
    fn default() -> Self {
        Self {
            framework_module: "torch".to_string(),
            modules: vec!["openvoice".to_string()],
        }
    }
}

impl Default for LaunchersConfig {
    fn default() -> Self {
        Self {
            webui: LauncherConfig {
                file_name: "start_webui.sh".to_string(),
                command: ["python", "-m", "openvoice_app", "--share"]
                    .map(str::to_string)
                    .to_vec(),
            },
            notebook: LauncherConfig {
                file_name: "start_notebook.sh".to_string(),
                command: ["jupyter", "notebook"].map(str::to_string).to_vec(),
            },
        }
    }
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: None,
            platform: PlatformConfig::default(),
            conda: CondaConfig::default(),
            system: SystemConfig::default(),
            source: SourceConfig::default(),
            dependencies: DependenciesConfig::default(),
            checkpoints: default_checkpoints(),
            smoke_test: SmokeTestConfig::default(),
            launchers: LaunchersConfig::default(),
        }
    }
}

fn default_checkpoints() -> Vec<CheckpointConfig> {
    const HOST: &str = "https://myshell-public-repo-host.s3.amazonaws.com/openvoice";
    vec![
        CheckpointConfig {
            name: "openvoice-v1".to_string(),
            url: format!("{HOST}/checkpoints_1226.zip"),
            dir: PathBuf::from("checkpoints"),
        },
        CheckpointConfig {
            name: "openvoice-v2".to_string(),
            url: format!("{HOST}/checkpoints_v2_0417.zip"),
            dir: PathBuf::from("checkpoints_v2"),
        },
    ]
}

impl ProvisionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_secs == Some(0) {
            return Err(anyhow!("command_timeout_secs must be > 0 when set"));
        }
        if self.conda.root.trim().is_empty() {
            return Err(anyhow!("conda.root must not be empty"));
        }
        let env_name = self.conda.env_name.trim();
        if env_name.is_empty() || env_name.contains(char::is_whitespace) || env_name.contains('/') {
            return Err(anyhow!(
                "conda.env_name must be a single path-free word, got '{}'",
                self.conda.env_name
            ));
        }
        if self.conda.python_version.trim().is_empty() {
            return Err(anyhow!("conda.python_version must not be empty"));
        }
        if self.source.repo_url.trim().is_empty() {
            return Err(anyhow!("source.repo_url must not be empty"));
        }
        ensure_relative("source.dir", &self.source.dir)?;

        let mut names = HashSet::new();
        let mut dirs = HashSet::new();
        for checkpoint in &self.checkpoints {
            if checkpoint.name.trim().is_empty() || checkpoint.url.trim().is_empty() {
                return Err(anyhow!("checkpoints entries need a non-empty name and url"));
            }
            if !names.insert(checkpoint.name.as_str()) {
                return Err(anyhow!("duplicate checkpoint name '{}'", checkpoint.name));
            }
            ensure_relative(&format!("checkpoints.{}.dir", checkpoint.name), &checkpoint.dir)?;
            if !dirs.insert(checkpoint.dir.as_path()) {
                return Err(anyhow!(
                    "checkpoints share extraction dir {}",
                    checkpoint.dir.display()
                ));
            }
        }

        if self.smoke_test.framework_module.trim().is_empty() {
            return Err(anyhow!("smoke_test.framework_module must not be empty"));
        }
        for (label, launcher) in [
            ("launchers.webui", &self.launchers.webui),
            ("launchers.notebook", &self.launchers.notebook),
        ] {
            if launcher.file_name.trim().is_empty() || launcher.file_name.contains('/') {
                return Err(anyhow!("{label}.file_name must be a bare file name"));
            }
            if launcher.command.is_empty() || launcher.command[0].trim().is_empty() {
                return Err(anyhow!("{label}.command must be a non-empty array"));
            }
        }
        if self.launchers.webui.file_name == self.launchers.notebook.file_name {
            return Err(anyhow!("launcher scripts must have distinct file names"));
        }
        for command in &self.dependencies.data_commands {
            if command.is_empty() {
                return Err(anyhow!("dependencies.data_commands entries must not be empty"));
            }
        }
        Ok(())
    }
}

fn ensure_relative(label: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || path.is_absolute() {
        return Err(anyhow!(
            "{label} must be a non-empty relative path, got '{}'",
            path.display()
        ));
    }
    Ok(())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ProvisionConfig::default()`.
pub fn load_config(path: &Path) -> Result<ProvisionConfig> {
    if !path.exists() {
        let cfg = ProvisionConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ProvisionConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Serialize config as TOML (trailing newline included).
pub fn render_config(cfg: &ProvisionConfig) -> Result<String> {
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    if !buf.ends_with('\n') {
        buf.push('\n');
    }
    Ok(buf)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ProvisionConfig) -> Result<()> {
    cfg.validate()?;
    let buf = render_config(cfg)?;
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
