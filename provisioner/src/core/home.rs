//! `~` and `$VAR` expansion for configured paths.

use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use regex::Regex;

static VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("variable pattern should be valid")
});

/// Expand a leading `~` and any `$VAR` / `${VAR}` references in `raw`.
///
/// `lookup` resolves variable names (normally `std::env::var`). An unset
/// variable is an error rather than an empty substitution, so a missing
/// `HOME` cannot silently turn `$HOME/miniconda3` into `/miniconda3`.
pub fn expand_path<F>(raw: &str, lookup: F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let with_home = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            let home = lookup("HOME").ok_or_else(|| anyhow!("HOME is not set (needed for {raw})"))?;
            format!("{home}{rest}")
        }
        _ => raw.to_string(),
    };

    let mut missing = None;
    let expanded = VAR_RE.replace_all(&with_home, |caps: &regex::Captures<'_>| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match lookup(name) {
            Some(value) => value,
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    if let Some(name) = missing {
        return Err(anyhow!("{name} is not set (needed for {raw})"));
    }
    Ok(PathBuf::from(expanded.into_owned()))
}
