//! Errors from project root discovery and target resolution.

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// Root discovery failed: no manifest, no recognized subfolder, and no
    /// source files directly in the starting folder.
    #[error("not a project: {path}")]
    NotAProject { path: String },

    /// A path could not be canonicalized or read.
    #[error("cannot access {path}: {source}")]
    BadPath {
        path: String,
        source: std::io::Error,
    },

    /// The target's enclosing root differs from the active project root.
    #[error("target `{path}` lies outside the active project root `{root}`")]
    NotSameRoot { path: String, root: String },

    /// No folder rule (explicit or forced) could be assigned to the target.
    #[error("no rule for target `{path}`")]
    NoRule { path: String },

    /// More than one of `--rl`/`--rs`/`--rt` was given for a single invocation.
    #[error("at most one of --rl, --rs, --rt may be given")]
    MultipleForcedRules,
}
