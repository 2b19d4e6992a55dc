//! Path confinement for files the CLI writes.
//!
//! Output names come from untrusted input file names, so they are
//! normalized and checked to stay inside the output directory before use.

use crate::error::GuardError;
use std::path::{Path, PathBuf};

/// Normalize a relative path: drop NUL bytes, turn `\` into `/`, collapse
/// repeated separators and trim leading/trailing ones. Any `..` is refused.
pub fn normalize_path(path: &str) -> Result<String, GuardError> {
    let cleaned: String = path
        .chars()
        .filter(|&c| c != '\0')
        .map(|c| if c == '\\' { '/' } else { c })
        .collect();

    let normalized = cleaned
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if normalized.contains("..") {
        return Err(GuardError::Path(format!(
            "Path '{}' contains a parent reference",
            path.replace('\0', "")
        )));
    }

    Ok(normalized)
}

/// Resolve `name` inside the existing directory `base`.
///
/// The result may not exist yet, but its parent must, and both the parent and
/// (if present) the file itself must canonicalize to a location under `base`.
pub fn resolve_within(base: &Path, name: &str) -> Result<PathBuf, GuardError> {
    let real_base = base.canonicalize().map_err(|e| {
        GuardError::Path(format!("Base directory '{}': {}", base.display(), e))
    })?;

    let relative = normalize_path(name)?;
    if relative.is_empty() {
        return Err(GuardError::Path(format!("Empty path name '{}'", name)));
    }

    let candidate = real_base.join(&relative);
    let parent = candidate
        .parent()
        .ok_or_else(|| GuardError::Path(format!("Path '{}' has no parent", relative)))?;
    let real_parent = parent.canonicalize().map_err(|e| {
        GuardError::Path(format!("Parent of '{}': {}", relative, e))
    })?;
    if !real_parent.starts_with(&real_base) {
        return Err(GuardError::Path(format!(
            "Path '{}' escapes '{}'",
            relative,
            real_base.display()
        )));
    }

    if candidate.exists() {
        let real = candidate.canonicalize()?;
        if !real.starts_with(&real_base) {
            return Err(GuardError::Path(format!(
                "Path '{}' resolves outside '{}'",
                relative,
                real_base.display()
            )));
        }
    }

    Ok(candidate)
}
