//! Archive download and extraction via `wget` and `unzip`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use super::process::{CommandRunner, CommandSpec, run_checked};

/// Download `url` to `dest` (overwriting it).
#[instrument(skip_all, fields(url))]
pub fn download<R: CommandRunner + ?Sized>(runner: &R, url: &str, dest: &Path) -> Result<()> {
    debug!(dest = %dest.display(), "downloading");
    let spec = CommandSpec::new("wget").arg("-O").path_arg(dest).arg(url);
    run_checked(runner, &spec).with_context(|| format!("download {url}"))?;
    Ok(())
}

/// Extract a zip `archive` into `into`, overwriting existing files.
#[instrument(skip_all)]
pub fn unpack_zip<R: CommandRunner + ?Sized>(runner: &R, archive: &Path, into: &Path) -> Result<()> {
    debug!(archive = %archive.display(), into = %into.display(), "extracting");
    let spec = CommandSpec::new("unzip")
        .arg("-q")
        .arg("-o")
        .path_arg(archive)
        .arg("-d")
        .path_arg(into);
    run_checked(runner, &spec).with_context(|| format!("extract {}", archive.display()))?;
    Ok(())
}

/// Download a zip archive next to `into`, extract it, then delete the archive.
pub fn fetch_archive<R: CommandRunner + ?Sized>(
    runner: &R,
    url: &str,
    archive: &Path,
    into: &Path,
) -> Result<()> {
    download(runner, url, archive)?;
    unpack_zip(runner, archive, into)?;
    remove_file_if_exists(archive)
}

/// Remove `path` if it is present; absence is not an error.
pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("remove {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingRunner;

    #[test]
    fn fetch_archive_downloads_extracts_and_cleans_up() {
        let temp = tempfile::tempdir().expect("tempdir");
        let archive = temp.path().join("weights.zip");
        fs::write(&archive, b"stale").expect("write archive");

        let runner = RecordingRunner::new();
        fetch_archive(&runner, "https://host/weights.zip", &archive, temp.path()).expect("fetch");

        let lines = runner.command_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("wget -O "));
        assert!(lines[0].ends_with(" https://host/weights.zip"));
        assert!(lines[1].starts_with("unzip -q -o "));
        assert!(!archive.exists());
    }

    #[test]
    fn failed_download_skips_extraction() {
        let temp = tempfile::tempdir().expect("tempdir");
        let runner = RecordingRunner::new()
            .respond(&["wget"], crate::io::process::CommandOutput::failed(4));
        let err = fetch_archive(
            &runner,
            "https://host/weights.zip",
            &temp.path().join("weights.zip"),
            temp.path(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("download https://host/weights.zip"));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn remove_missing_file_is_ok() {
        let temp = tempfile::tempdir().expect("tempdir");
        remove_file_if_exists(&temp.path().join("nope")).expect("remove");
    }
}
