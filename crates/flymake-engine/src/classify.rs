//! Source-file classification: enumerate a folder's sources and group them
//! into prefix-sharing tools.

use std::path::{Path, PathBuf};

/// One executable's worth of source files, sharing a basename prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub name: String,
    pub sources: Vec<PathBuf>,
}

/// Enumerate regular files under `folder`, recursively to `max_depth`, whose
/// extension belongs to `extensions`, in deterministic sorted order.
///
/// Returns `None` if `folder` is not a readable directory; an empty `Vec` is
/// a valid, non-error result.
pub fn classify(folder: &Path, extensions: &[String], max_depth: u32) -> Option<Vec<PathBuf>> {
    flymake_util::fs::collect_by_extensions(folder, extensions, max_depth)
}

/// Group a sorted source list into tools by shared basename-stem prefix.
///
/// Walks left to right; each not-yet-claimed file opens a new tool named by
/// its stem (the filename portion before its extension) and claims every
/// later file whose filename starts with that stem.
pub fn group_into_tools(sources: &[PathBuf]) -> Vec<Tool> {
    let mut claimed = vec![false; sources.len()];
    let mut tools = Vec::new();

    for (i, candidate) in sources.iter().enumerate() {
        if *claimed.get(i).unwrap_or(&true) {
            continue;
        }
        let stem = candidate
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut members = vec![candidate.clone()];
        if let Some(flag) = claimed.get_mut(i) {
            *flag = true;
        }

        for (j, other) in sources.iter().enumerate().skip(i + 1) {
            if *claimed.get(j).unwrap_or(&true) {
                continue;
            }
            let name = other
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            if name.starts_with(&stem) {
                members.push(other.clone());
                if let Some(flag) = claimed.get_mut(j) {
                    *flag = true;
                }
            }
        }

        tools.push(Tool { name: stem, sources: members });
    }

    tools
}
