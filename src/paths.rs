// src/paths.rs

//! Path normalisation helpers and the circular-reference guard.

use std::path::{Component, Path, PathBuf};

use crate::errors::{MirrorError, Result};

/// Lexically clean a path: drop `.` segments and trailing separators, and
/// fold `..` into its parent where possible. Never touches the filesystem.
///
/// An empty result becomes `"."`.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`.
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Absolute, cleaned form of `path`, resolved against the current directory.
pub fn resolve_absolute(path: &Path) -> Result<PathBuf> {
    let abs = std::path::absolute(path)
        .map_err(|e| MirrorError::fs("resolving absolute path of", path, e))?;
    Ok(clean_path(&abs))
}

/// Fail with a configuration error when either root contains the other.
///
/// Equality counts as containment. Comparison is per path component, so
/// `/data/in` and `/data/input` do not overlap.
pub fn check_circular_reference(input: &Path, output: &Path) -> Result<()> {
    let input_abs = resolve_absolute(input)?;
    let output_abs = resolve_absolute(output)?;

    if output_abs.starts_with(&input_abs) {
        return Err(MirrorError::Config(format!(
            "output directory {:?} is inside input directory {:?}, which would create a circular reference",
            output_abs, input_abs
        )));
    }

    if input_abs.starts_with(&output_abs) {
        return Err(MirrorError::Config(format!(
            "input directory {:?} is inside output directory {:?}, which would create a circular reference",
            input_abs, output_abs
        )));
    }

    Ok(())
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. notify reporting `/private/var/...` on macOS for a
///   root under `/var/...`), we canonicalize both paths and try again.
///
/// Returns `None` if the path cannot be related to `root`. The root itself
/// relativizes to the empty string.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(slashed(rel));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(slashed(rel));
        }
    }

    None
}

fn slashed(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
