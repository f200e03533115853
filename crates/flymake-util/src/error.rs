//! Error types for flymake-util.

/// Errors produced by utility functions.
#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    /// A filesystem operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A glob pattern was invalid.
    #[error("invalid glob pattern `{pattern}`: {message}")]
    GlobPattern { pattern: String, message: String },

    /// A command failed to execute (the binary could not be spawned at all).
    #[error("cannot execute `{program}`: {source}")]
    CommandExec {
        program: String,
        source: std::io::Error,
    },

    /// A git subcommand exited with a non-zero status.
    #[error("git {args} failed: {stderr}")]
    GitFailed { args: String, stderr: String },

    /// A git repository was expected but not found.
    #[error("not a git repository: {path}")]
    NotAGitRepo { path: String },

    /// No commit in the git log satisfied the requested version constraint.
    #[error("no tagged commit in {url} satisfies version `{range}`")]
    VersionNotFound { url: String, range: String },
}
