//! Git plumbing used to materialize git-shaped dependencies.
//!
//! Every operation shells out to the system `git` binary rather than linking
//! a git library, mirroring how the rest of flymake drives external tools
//! (the compiler, the archiver) through [`crate::process::run_command`].

use std::path::Path;
use std::process::Command;

use crate::error::UtilError;
use crate::process::run_command;

/// A single line of `git log --oneline`, split into its leading SHA and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// The abbreviated commit SHA that `git log --oneline` prints first.
    pub sha: String,
    /// The remainder of the log line.
    pub message: String,
}

fn args_display(args: &[&str]) -> String {
    args.join(" ")
}

fn run_git(dir: Option<&Path>, args: &[&str]) -> Result<String, UtilError> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    let output = run_command(&mut cmd)?;
    if !output.success {
        return Err(UtilError::GitFailed {
            args: args_display(args),
            stderr: output.stderr.trim().to_owned(),
        });
    }
    Ok(output.stdout)
}

/// Clone `url` into `dest`, or reuse it if `dest/.git` already exists.
///
/// A fresh clone removes any existing (non-git) contents of `dest` first.
/// When `branch` is given, it is passed to `git clone -b <branch>`.
///
/// # Errors
/// Returns an error if `dest` cannot be cleared, or if `git clone` fails.
pub fn clone_or_reuse(url: &str, dest: &Path, branch: Option<&str>) -> Result<(), UtilError> {
    if dest.join(".git").is_dir() {
        return Ok(());
    }

    crate::fs::remove_dir_all_if_exists(dest)?;
    if let Some(parent) = dest.parent() {
        crate::fs::ensure_dir(parent)?;
    }

    let dest_str = dest.display().to_string();
    let mut args: Vec<&str> = vec!["clone"];
    if let Some(branch) = branch {
        args.push("-b");
        args.push(branch);
    }
    args.push(url);
    args.push(&dest_str);

    run_git(None, &args)?;
    Ok(())
}

/// Run `git log --oneline` in `dir`, returning each line split into SHA and message.
///
/// # Errors
/// Returns an error if `dir` is not a git repository or `git log` fails.
pub fn log_oneline(dir: &Path) -> Result<Vec<LogEntry>, UtilError> {
    if !dir.join(".git").is_dir() {
        return Err(UtilError::NotAGitRepo {
            path: dir.display().to_string(),
        });
    }

    let stdout = run_git(Some(dir), &["log", "--oneline"])?;
    Ok(stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(2, ' ');
            let sha = parts.next()?.to_owned();
            let message = parts.next().unwrap_or("").to_owned();
            Some(LogEntry { sha, message })
        })
        .collect())
}

/// Check out `sha` (or any committish) in `dir`.
///
/// # Errors
/// Returns an error if `dir` is not a git repository or the checkout fails.
pub fn checkout(dir: &Path, sha: &str) -> Result<(), UtilError> {
    if !dir.join(".git").is_dir() {
        return Err(UtilError::NotAGitRepo {
            path: dir.display().to_string(),
        });
    }
    run_git(Some(dir), &["checkout", sha])?;
    Ok(())
}

/// Resolve `HEAD` in `dir` to its full commit SHA.
///
/// # Errors
/// Returns an error if `dir` is not a git repository or `git rev-parse` fails.
pub fn rev_parse_head(dir: &Path) -> Result<String, UtilError> {
    if !dir.join(".git").is_dir() {
        return Err(UtilError::NotAGitRepo {
            path: dir.display().to_string(),
        });
    }
    let stdout = run_git(Some(dir), &["rev-parse", "HEAD"])?;
    Ok(stdout.trim().to_owned())
}

/// Returns `true` if `token` looks like a hexadecimal git SHA (abbreviated or full).
pub fn looks_like_sha(token: &str) -> bool {
    let len = token.len();
    (4..=40).contains(&len) && token.bytes().all(|b| b.is_ascii_hexdigit())
}
