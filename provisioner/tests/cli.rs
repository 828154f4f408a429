//! CLI tests for the `provision` binary.
//!
//! Spawns the binary and verifies exit codes and that read-only invocations
//! leave the working directory untouched.

use std::fs;
use std::path::Path;
use std::process::Command;

use provisioner::exit_codes;

fn provision() -> Command {
    Command::new(env!("CARGO_BIN_EXE_provision"))
}

fn entries(dir: &Path) -> usize {
    fs::read_dir(dir).expect("read dir").count()
}

#[test]
fn help_exits_zero_without_side_effects() {
    let temp = tempfile::tempdir().expect("tempdir");
    for flag in ["--help", "-h"] {
        let output = provision()
            .current_dir(temp.path())
            .arg(flag)
            .output()
            .expect("run provision");
        assert_eq!(output.status.code(), Some(exit_codes::OK));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("--test-only"));
        assert!(stdout.contains("--no-models"));
    }
    assert_eq!(entries(temp.path()), 0);
}

#[test]
fn conflicting_modes_are_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let status = provision()
        .current_dir(temp.path())
        .args(["--test-only", "--no-models"])
        .status()
        .expect("run provision");
    assert!(!status.success());
    assert_eq!(entries(temp.path()), 0);
}

#[test]
fn print_config_shows_effective_defaults() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join("provision.toml"),
        "[conda]\nenv_name = \"voices\"\n",
    )
    .expect("write config");

    let output = provision()
        .arg("--workdir")
        .arg(temp.path())
        .arg("--print-config")
        .output()
        .expect("run provision");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("env_name = \"voices\""));
    assert!(stdout.contains("checkpoints_v2_0417.zip"));
}

#[test]
fn explicit_missing_config_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    let status = provision()
        .arg("--workdir")
        .arg(temp.path())
        .arg("--config")
        .arg(temp.path().join("missing.toml"))
        .status()
        .expect("run provision");
    assert_eq!(status.code(), Some(exit_codes::FAILED));
}

#[test]
fn missing_cuda_exits_with_prerequisite_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let empty_path = tempfile::tempdir().expect("empty PATH dir");

    let output = provision()
        .arg("--workdir")
        .arg(temp.path())
        .arg("--non-interactive")
        .env("PATH", empty_path.path())
        .env("HOME", temp.path())
        .output()
        .expect("run provision");

    assert_eq!(output.status.code(), Some(exit_codes::MISSING_PREREQUISITE));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("CUDA toolkit"));
    assert_eq!(entries(temp.path()), 0);
}

#[test]
fn os_warning_is_shown_before_missing_cuda_abort() {
    let temp = tempfile::tempdir().expect("tempdir");
    let empty_path = tempfile::tempdir().expect("empty PATH dir");
    let config_dir = tempfile::tempdir().expect("config dir");
    let config = config_dir.path().join("provision.toml");
    let os_release = config_dir.path().join("absent-os-release");
    fs::write(
        &config,
        format!("[platform]\nos_release_path = {:?}\n", os_release.display().to_string()),
    )
    .expect("write config");

    let output = provision()
        .arg("--workdir")
        .arg(temp.path())
        .arg("--config")
        .arg(&config)
        .arg("--non-interactive")
        .env("PATH", empty_path.path())
        .env("HOME", temp.path())
        .output()
        .expect("run provision");

    assert_eq!(output.status.code(), Some(exit_codes::MISSING_PREREQUISITE));
    let stderr = String::from_utf8_lossy(&output.stderr);
    let warning = stderr.find("warning: cannot read").expect("os-release warning");
    let error = stderr.find("CUDA toolkit").expect("cuda error");
    assert!(warning < error, "{stderr}");
    assert_eq!(entries(temp.path()), 0);
}
