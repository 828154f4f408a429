//! Parsing and comparison for host platform facts (os-release, nvcc).

use std::sync::LazyLock;

use regex::Regex;

static NVCC_RELEASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"release\s+(\d+(?:\.\d+)*)").expect("nvcc release pattern should be valid")
});

/// Fields of interest from `/etc/os-release`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub name: Option<String>,
    pub version_id: Option<String>,
}

/// Parse `KEY=value` lines from an os-release file.
///
/// Values may be bare, single-quoted, or double-quoted. Comments and lines
/// without `=` are ignored.
pub fn parse_os_release(contents: &str) -> OsRelease {
    let mut release = OsRelease::default();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = unquote(value.trim()).to_string();
        match key.trim() {
            "NAME" => release.name = Some(value),
            "VERSION_ID" => release.version_id = Some(value),
            _ => {}
        }
    }
    release
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

/// Compare the running OS against the expected name and version.
///
/// Returns a warning message on mismatch; `None` when it matches. The name
/// check is a case-insensitive substring match so `Ubuntu` accepts
/// `"Ubuntu"` as well as derivatives that keep the name in `NAME`.
pub fn os_mismatch(release: &OsRelease, expected_name: &str, expected_version: &str) -> Option<String> {
    let name = release.name.as_deref().unwrap_or("unknown");
    let version = release.version_id.as_deref().unwrap_or("unknown");
    let name_ok = name
        .to_ascii_lowercase()
        .contains(&expected_name.to_ascii_lowercase());
    if name_ok && version == expected_version {
        return None;
    }
    Some(format!(
        "this setup targets {expected_name} {expected_version}, detected {name} {version}; continuing anyway"
    ))
}

/// Extract the CUDA release (`"11.8"`) from `nvcc --version` output.
pub fn parse_nvcc_release(output: &str) -> Option<String> {
    NVCC_RELEASE_RE
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Compare a detected CUDA release against the expected one.
///
/// Only the components present in `expected` are compared, so `"11"` accepts
/// any 11.x toolkit while `"11.8"` requires 11.8.
pub fn cuda_mismatch(detected: Option<&str>, expected: &str) -> Option<String> {
    let Some(detected) = detected else {
        return Some(format!(
            "could not determine CUDA version from nvcc output (expected {expected})"
        ));
    };
    let wanted: Vec<&str> = expected.split('.').collect();
    let found: Vec<&str> = detected.split('.').collect();
    let matches = wanted.len() <= found.len() && wanted.iter().zip(&found).all(|(w, f)| w == f);
    if matches {
        return None;
    }
    Some(format!(
        "CUDA {detected} detected, {expected} recommended; GPU wheels may not match"
    ))
}
