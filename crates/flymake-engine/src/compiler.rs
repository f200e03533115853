//! Incremental compiler driver: mtime-based rebuild decisions, fixed-order
//! placeholder substitution, and the compile/archive/link process calls.

use std::path::{Path, PathBuf};
use std::process::Command;

use flymake_config::manifest::CompilerRule;
use flymake_util::process::{run_command, CommandOutput};

use crate::error::EngineError;

/// Options shared by every build-affecting command (`build`, `run`, `test`,
/// `clean`), threaded down from the CLI's parsed flags.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// `-B`: force rebuild of this project's own files (not dependencies).
    pub force_rebuild: bool,
    /// `--all`: implies `force_rebuild`, and also forces dependency rebuilds.
    pub force_all: bool,
    /// `-n`: print commands instead of running them.
    pub dry_run: bool,
    /// `-v[=N]`: 0 (silent), 1 (progress lines), 2 (progress + commands).
    pub verbosity: u8,
    /// Warnings-as-errors is enabled unless `-w-` was given.
    pub warnings_as_errors: bool,
    /// `-D[=N]`: debug flags enabled, with an optional level.
    pub debug: Option<u32>,
}

impl BuildOptions {
    pub fn force_project(&self) -> bool {
        self.force_rebuild || self.force_all
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileOutcome {
    Compiled,
    UpToDate,
}

fn run_shell(command_line: &str, opts: &BuildOptions) -> Result<CommandOutput, EngineError> {
    if opts.verbosity >= 2 {
        eprintln!("+ {command_line}");
    }
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command_line);
    Ok(run_command(&mut cmd)?)
}

/// Substitute each placeholder exactly once, using the position it first
/// occupies in the *original* template. A value containing placeholder-like
/// text is never rescanned, since every span is located before any
/// replacement text is spliced in.
fn substitute_single_pass(template: &str, pairs: &[(&str, &str)]) -> String {
    let mut spans: Vec<(usize, usize, &str)> = Vec::new();
    for (placeholder, value) in pairs {
        if let Some(pos) = template.find(placeholder) {
            spans.push((pos, pos + placeholder.len(), value));
        }
    }
    spans.sort_by_key(|(start, _, _)| *start);

    let mut out = String::new();
    let mut cursor = 0usize;
    for (start, end, value) in spans {
        out.push_str(template.get(cursor..start).unwrap_or(""));
        out.push_str(value);
        cursor = end;
    }
    out.push_str(template.get(cursor..).unwrap_or(""));
    out
}

fn format_includes(prefix: &str, includes: &[String]) -> String {
    includes
        .iter()
        .map(|inc| format!("{prefix}{inc}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compile one source file per §4.4: skip if the existing object is newer,
/// otherwise format the rule's `cc` template and shell out.
///
/// # Errors
/// Returns [`EngineError::NoFiles`] if `source` is missing or a directory,
/// [`EngineError::Util`] if the output directory cannot be created or the
/// shell cannot be spawned, or [`EngineError::CompileFailed`] on a nonzero
/// exit.
pub fn compile_one(
    rule: &CompilerRule,
    source: &Path,
    out_dir: &Path,
    include_list: &[String],
    opts: &BuildOptions,
) -> Result<CompileOutcome, EngineError> {
    if !source.is_file() {
        return Err(EngineError::NoFiles {
            path: source.display().to_string(),
        });
    }

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let out_path = out_dir.join(format!("{stem}.o"));

    if !opts.force_project() && out_path.is_file() {
        if let (Ok(out_mtime), Ok(src_mtime)) =
            (flymake_util::fs::mtime(&out_path), flymake_util::fs::mtime(source))
        {
            if out_mtime >= src_mtime {
                return Ok(CompileOutcome::UpToDate);
            }
        }
    }

    flymake_util::fs::ensure_dir(out_dir)?;

    let incs = format_includes(&rule.inc_prefix, include_list);
    let warn = if opts.warnings_as_errors {
        rule.warn.clone()
    } else {
        String::new()
    };
    let debug = if opts.debug.is_some() {
        rule.cc_dbg.clone()
    } else {
        String::new()
    };
    let source_str = source.display().to_string();
    let out_str = out_path.display().to_string();

    let command_line = substitute_single_pass(
        &rule.cc,
        &[
            ("{in}", source_str.as_str()),
            ("{incs}", incs.as_str()),
            ("{warn}", warn.as_str()),
            ("{debug}", debug.as_str()),
            ("{out}", out_str.as_str()),
        ],
    );

    if opts.verbosity >= 1 {
        eprintln!("   Compiling {source_str} -> {out_str}");
    }
    if opts.dry_run {
        eprintln!("{command_line}");
        return Ok(CompileOutcome::Compiled);
    }

    let output = run_shell(&command_line, opts)?;
    if !output.success {
        return Err(EngineError::CompileFailed {
            path: source_str,
            stderr: output.stderr,
        });
    }
    Ok(CompileOutcome::Compiled)
}

/// Link object files plus the accumulated library list into an executable.
///
/// # Errors
/// Returns [`EngineError::LinkFailed`] on a nonzero exit, or propagates a
/// spawn failure from the shell.
pub fn link(
    rule: &CompilerRule,
    objects: &[PathBuf],
    library_list: &[PathBuf],
    out_path: &Path,
    opts: &BuildOptions,
) -> Result<(), EngineError> {
    let in_str = join_paths(objects);
    let libs_str = join_paths(library_list);
    let debug = if opts.debug.is_some() {
        rule.ll_dbg.clone()
    } else {
        String::new()
    };
    let out_str = out_path.display().to_string();

    let command_line = substitute_single_pass(
        &rule.ll,
        &[
            ("{in}", in_str.as_str()),
            ("{libs}", libs_str.as_str()),
            ("{debug}", debug.as_str()),
            ("{out}", out_str.as_str()),
        ],
    );

    if opts.verbosity >= 1 {
        eprintln!("   Linking {out_str}");
    }
    if opts.dry_run {
        eprintln!("{command_line}");
        return Ok(());
    }

    let output = run_shell(&command_line, opts)?;
    if !output.success {
        return Err(EngineError::LinkFailed {
            path: out_str,
            stderr: output.stderr,
        });
    }
    Ok(())
}

/// Archive object files into a static library via `ar -crs`.
///
/// # Errors
/// Returns [`EngineError::ArchiveFailed`] on a nonzero exit, or propagates a
/// spawn failure from the shell.
pub fn archive(objects: &[PathBuf], archive_path: &Path, opts: &BuildOptions) -> Result<(), EngineError> {
    let objs_str = join_paths(objects);
    let archive_str = archive_path.display().to_string();
    let command_line = format!("ar -crs {archive_str} {objs_str}");

    if opts.verbosity >= 1 {
        eprintln!("   Archiving {archive_str}");
    }
    if opts.dry_run {
        eprintln!("{command_line}");
        return Ok(());
    }

    let output = run_shell(&command_line, opts)?;
    if !output.success {
        return Err(EngineError::ArchiveFailed {
            path: archive_str,
            stderr: output.stderr,
        });
    }
    Ok(())
}
