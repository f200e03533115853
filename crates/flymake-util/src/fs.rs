//! Filesystem utilities for flymake.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::UtilError;

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Remove a directory and all its contents. No error if the directory is absent.
///
/// # Errors
/// Returns an error if the directory exists but cannot be removed.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<(), UtilError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(UtilError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Remove a single file if it exists. No error if the file is absent.
///
/// # Errors
/// Returns an error if the file exists but cannot be removed.
pub fn remove_file_if_exists(path: &Path) -> Result<(), UtilError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(UtilError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Write `contents` to `path`, creating or truncating it.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_file(path: &Path, contents: &str) -> Result<(), UtilError> {
    std::fs::write(path, contents).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Return the modification time of a path.
///
/// # Errors
/// Returns an error if the path does not exist or its metadata cannot be read.
pub fn mtime(path: &Path) -> Result<SystemTime, UtilError> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| UtilError::Io {
            path: path.display().to_string(),
            source,
        })
}

/// Return the extension of a path as a string, without the leading dot, or `None`.
pub fn extension_str(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

/// Collect all regular files under `dir`, recursively up to `max_depth` levels,
/// whose extension is a member of `extensions`, sorted by path.
///
/// `max_depth == 1` scans only `dir` itself (no subdirectories); each additional
/// level of nesting consumes one unit of depth. Returns `None` if `dir` is not
/// a readable directory; an empty `Vec` is a valid, non-error result.
pub fn collect_by_extensions(dir: &Path, extensions: &[String], max_depth: u32) -> Option<Vec<PathBuf>> {
    if !dir.is_dir() {
        return None;
    }
    let mut out = Vec::new();
    collect_recursive(dir, extensions, max_depth, &mut out);
    out.sort();
    Some(out)
}

fn collect_recursive(dir: &Path, extensions: &[String], depth_remaining: u32, out: &mut Vec<PathBuf>) {
    if depth_remaining == 0 {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(&path, extensions, depth_remaining - 1, out);
        } else if extension_str(&path).is_some_and(|e| extensions.iter().any(|x| x == e)) {
            out.push(path);
        }
    }
}

/// Returns `true` if any file under `dir` (top level only) has one of the given
/// extensions. Used by project-root discovery's "simple root" fallback.
pub fn has_files_with_extensions(dir: &Path, extensions: &[String]) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let path = entry.path();
        path.is_file() && extension_str(&path).is_some_and(|e| extensions.iter().any(|x| x == e))
    })
}
