//! Target resolution: map a user-supplied path argument to a `(folder,
//! optional file, rule)` triple.

use std::path::{Path, PathBuf};

use flymake_config::manifest::{FolderRuleDecl, RuleKind};

use crate::error::TargetError;
use crate::root::discover_root;

/// The rule that applies to a resolved target. A superset of
/// [`RuleKind`] that adds `WholeProject` for a target that equals the
/// active root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRuleKind {
    Library,
    SourceProgram,
    ToolFolder,
    WholeProject,
}

impl From<RuleKind> for TargetRuleKind {
    fn from(kind: RuleKind) -> Self {
        match kind {
            RuleKind::Library => Self::Library,
            RuleKind::SourceProgram => Self::SourceProgram,
            RuleKind::ToolFolder => Self::ToolFolder,
        }
    }
}

/// A resolved build target, derived per invocation argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// The literal argument string as given by the caller.
    pub arg: String,
    /// The resolved, canonicalized folder path.
    pub folder: PathBuf,
    /// The basename of a specific file within `folder`, if the argument
    /// named one (e.g. a single tool inside a tool-folder).
    pub file: Option<String>,
    pub kind: TargetRuleKind,
}

fn canonicalize(path: &Path) -> Result<PathBuf, TargetError> {
    std::fs::canonicalize(path).map_err(|source| TargetError::BadPath {
        path: path.display().to_string(),
        source,
    })
}

fn normalize_arg(user_arg: &str, cwd: &Path) -> (PathBuf, Option<String>) {
    let candidate = cwd.join(user_arg);
    let trailing_sep = user_arg.ends_with('/') || user_arg.ends_with(std::path::MAIN_SEPARATOR);

    if trailing_sep || candidate.is_dir() {
        return (candidate, None);
    }

    let file_name = candidate
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = candidate.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf());
    (parent, Some(file_name))
}

/// Resolve a single command-line target argument.
///
/// `active_root` must already be canonicalized (as returned by
/// [`discover_root`]). `forced_rule` comes from a `--rl`/`--rs`/`--rt` flag,
/// if the caller passed one.
///
/// # Errors
/// Returns [`TargetError::NotSameRoot`] if the argument's enclosing root
/// differs from `active_root`, [`TargetError::NoRule`] if no rule (explicit,
/// default, or forced) applies, or [`TargetError::BadPath`] if a path
/// component cannot be canonicalized.
pub fn resolve(
    user_arg: &str,
    cwd: &Path,
    active_root: &Path,
    folder_rules: &[FolderRuleDecl],
    forced_rule: Option<TargetRuleKind>,
) -> Result<Target, TargetError> {
    let (folder, file) = normalize_arg(user_arg, cwd);
    let folder = canonicalize(&folder)?;

    let enclosing_root = discover_root(&folder)?;
    if enclosing_root != active_root {
        return Err(TargetError::NotSameRoot {
            path: folder.display().to_string(),
            root: active_root.display().to_string(),
        });
    }

    if folder == active_root {
        return Ok(Target {
            arg: user_arg.to_owned(),
            folder,
            file,
            kind: TargetRuleKind::WholeProject,
        });
    }

    if let Some(forced) = forced_rule {
        return Ok(Target {
            arg: user_arg.to_owned(),
            folder,
            file,
            kind: forced,
        });
    }

    let matched = folder_rules.iter().find(|rule| {
        canonicalize(&active_root.join(&rule.folder))
            .map(|p| p == folder)
            .unwrap_or(false)
    });

    match matched {
        Some(rule) => Ok(Target {
            arg: user_arg.to_owned(),
            folder,
            file,
            kind: rule.kind.into(),
        }),
        None => Err(TargetError::NoRule {
            path: folder.display().to_string(),
        }),
    }
}
