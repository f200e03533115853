//! Errors from build orchestration: dependency resolution, compilation,
//! linking, and project scaffolding.

use flymake_config::lockfile::LockfileError;
use flymake_config::manifest::ManifestError;
use flymake_config::semver::SemverError;
use flymake_targets::TargetError;
use flymake_util::error::UtilError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Lockfile(#[from] LockfileError),
    #[error(transparent)]
    Target(#[from] TargetError),
    #[error(transparent)]
    Util(#[from] UtilError),
    #[error(transparent)]
    Semver(#[from] SemverError),

    /// `run`/`test` was asked for a program name that no source-program or
    /// tool-folder rule produces.
    #[error("`{name}` does not correspond to a build output")]
    BadProg { name: String },

    /// `new` was asked to scaffold over a directory that already has a manifest.
    #[error("a project already exists at {path}")]
    ProjectExists { path: String },

    /// A folder rule matched a target containing no compilable sources.
    #[error("no compilable source files in {path}")]
    NoFiles { path: String },

    /// A dependency graph re-entered a project root it was already resolving.
    #[error("dependency cycle detected at `{name}` ({path})")]
    DependencyCycle { name: String, path: String },

    /// A prebuilt or package dependency's path does not exist or is unusable.
    #[error("dependency `{name}` not found: {reason}")]
    DependencyNotFound { name: String, reason: String },

    /// The same name was declared twice with incompatible shapes or versions.
    #[error("{manifest_path}: dependency `{name}` conflict: {reason}")]
    DependencyConflict {
        name: String,
        manifest_path: String,
        reason: String,
    },

    /// A git dependency's requested version range matched no tagged commit.
    #[error("dependency `{name}`: {reason}")]
    VersionMismatch { name: String, reason: String },

    /// `--locked` found the resolved graph no longer matches `flymake.lock`.
    #[error("dependency `{name}` has drifted from flymake.lock: {reason}")]
    LockDrift { name: String, reason: String },

    #[error("compilation of {path} failed:\n{stderr}")]
    CompileFailed { path: String, stderr: String },

    #[error("link of {path} failed:\n{stderr}")]
    LinkFailed { path: String, stderr: String },

    #[error("archive of {path} failed:\n{stderr}")]
    ArchiveFailed { path: String, stderr: String },

    #[error("cloning `{name}` failed: {source}")]
    CloneFailed { name: String, source: UtilError },

    #[error("template `{template}` failed placeholder validation: {reason}")]
    PlaceholderValidation { template: String, reason: String },
}
