#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use flymake_config::lockfile::Lockfile;
use flymake_config::manifest::{Manifest, RuleKind};
use flymake_engine::{BuildOptions, ProjectState, RootState};
use flymake_targets::{discover_root, TargetRuleKind};

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "flymake", about = "A build, test, and package manager for C and C++ projects")]
#[command(version)]
struct Cli {
    /// Force rebuild of this project's own files (not dependencies).
    #[arg(short = 'B', global = true)]
    force: bool,

    /// Enable debug flags; an optional level is passed through `-DDEBUG=N`.
    #[arg(short = 'D', global = true, num_args = 0..=1, default_missing_value = "0", value_name = "N")]
    debug: Option<u32>,

    /// Print commands instead of running them.
    #[arg(short = 'n', global = true)]
    dry_run: bool,

    /// Verbosity: 0 (silent), 1 (progress), 2 (progress + commands).
    #[arg(short = 'v', global = true, num_args = 0..=1, default_missing_value = "1", value_name = "N")]
    verbose: Option<u8>,

    /// Disable warnings-as-errors.
    #[arg(long = "w-", global = true)]
    no_warn: bool,

    /// Rebuild dependencies too (implies `-B`); for `clean`, also removes `deps/`.
    #[arg(long = "all", global = true)]
    all: bool,

    /// Force every resolved target to the library rule.
    #[arg(long = "rl", global = true)]
    rl: bool,

    /// Force every resolved target to the source-program rule.
    #[arg(long = "rs", global = true)]
    rs: bool,

    /// Force every resolved target to the tool-folder rule.
    #[arg(long = "rt", global = true)]
    rt: bool,

    /// Verify the resolved dependency graph against `flymake.lock` and fail
    /// on drift instead of rebuilding it.
    #[arg(long, global = true)]
    locked: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build one or more targets (or the whole project, if none given)
    Build {
        /// Folder or file targets to build
        targets: Vec<String>,
    },
    /// Remove build artifacts
    Clean,
    /// Build, then run the resolved target(s)
    Run {
        /// Folder or file targets to run
        targets: Vec<String>,
        /// Arguments passed through to the child program
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Build, then run the test target(s)
    Test {
        /// Folder or file targets to run as tests
        targets: Vec<String>,
        /// Arguments passed through to the child program
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Scaffold a new project
    New {
        /// Project directory to create
        path: PathBuf,
        /// Scaffold C++ instead of C
        #[arg(long)]
        cpp: bool,
        /// Scaffold a library skeleton instead of a binary
        #[arg(long)]
        lib: bool,
    },
}

impl Cli {
    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            force_rebuild: self.force,
            force_all: self.all,
            dry_run: self.dry_run,
            verbosity: self.verbose.unwrap_or(0),
            warnings_as_errors: !self.no_warn,
            debug: self.debug,
        }
    }

    fn forced_rule(&self) -> Result<Option<TargetRuleKind>, Box<dyn Error>> {
        match (self.rl, self.rs, self.rt) {
            (false, false, false) => Ok(None),
            (true, false, false) => Ok(Some(TargetRuleKind::Library)),
            (false, true, false) => Ok(Some(TargetRuleKind::SourceProgram)),
            (false, false, true) => Ok(Some(TargetRuleKind::ToolFolder)),
            _ => Err("at most one of --rl, --rs, --rt may be given".into()),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Build { targets } => cmd_build(&cli, targets),
        Command::Clean => cmd_clean(&cli),
        Command::Run { targets, args } => cmd_run(&cli, targets, args),
        Command::Test { targets, args } => cmd_test(&cli, targets, args),
        Command::New { path, cpp, lib } => cmd_new(path, *cpp, *lib),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Load the manifest at `root` and fully resolve its dependency graph.
fn load_root_state(root: &PathBuf) -> Result<RootState, Box<dyn Error>> {
    let manifest = Manifest::load(root)?;
    let state = ProjectState::new(root.clone(), manifest);
    let mut root_state = RootState::new(state);
    flymake_engine::resolve_dependencies(&mut root_state)?;
    Ok(root_state)
}

fn report_outcome(files_compiled: usize, files_encountered: usize) {
    if files_encountered == 0 {
        eprintln!("empty project");
    } else if files_compiled == 0 {
        eprintln!("up to date");
    }
}

fn whole_project_target(root: &PathBuf) -> flymake_targets::Target {
    flymake_targets::Target {
        arg: ".".to_owned(),
        folder: root.clone(),
        file: None,
        kind: TargetRuleKind::WholeProject,
    }
}

/// Resolve the command-line target arguments, or a command-specific default
/// when none were given: `build` defaults to the whole project; `run`/`test`
/// prefer the first folder rule in `default_candidates` that exists. When
/// `fallback_any_source_program` is set (only `run` wants this: spec.md's
/// default for `run` is "a source-program folder, preferring one literally
/// named `src/`/`source/`", not those names exclusively), a failed
/// `default_candidates` search falls further back to the first declared
/// `RuleKind::SourceProgram` folder rule of any name. Failing all of that,
/// falls back to the whole project for a "simple" (no-folder-rules) layout.
fn resolve_targets(
    cli: &Cli,
    root_state: &RootState,
    root: &PathBuf,
    targets: &[String],
    default_candidates: &[&str],
    fallback_any_source_program: bool,
) -> Result<Vec<flymake_targets::Target>, Box<dyn Error>> {
    let forced = cli.forced_rule()?;
    let cwd = std::env::current_dir()?;

    if !targets.is_empty() {
        return targets
            .iter()
            .map(|arg| Ok(flymake_targets::resolve(arg, &cwd, root, &root_state.state.manifest.folder_rules, forced)?))
            .collect();
    }

    if default_candidates.is_empty() || root_state.state.manifest.folder_rules.is_empty() {
        return Ok(vec![whole_project_target(root)]);
    }

    for candidate in default_candidates {
        if let Ok(target) = flymake_targets::resolve(candidate, root, root, &root_state.state.manifest.folder_rules, forced) {
            return Ok(vec![target]);
        }
    }

    if fallback_any_source_program {
        let fallback = root_state
            .state
            .manifest
            .folder_rules
            .iter()
            .find(|rule| rule.kind == RuleKind::SourceProgram);
        if let Some(rule) = fallback {
            let target = flymake_targets::resolve(&rule.folder, root, root, &root_state.state.manifest.folder_rules, forced)?;
            return Ok(vec![target]);
        }
    }

    Err("no default target found".into())
}

fn cmd_build(cli: &Cli, targets: &[String]) -> CliResult {
    let cwd = std::env::current_dir()?;
    let root = discover_root(&cwd)?;
    let mut root_state = load_root_state(&root)?;
    let opts = cli.build_options();
    let lock_path = root.join("flymake.lock");

    if cli.locked {
        let lockfile = Lockfile::from_path(&lock_path)?;
        flymake_engine::lockfile::check(&root_state, &lockfile)?;
    }

    let resolved = resolve_targets(cli, &root_state, &root, targets, &[], false)?;
    let mut compiled = 0usize;
    let mut encountered = 0usize;
    for target in &resolved {
        let report = flymake_engine::build_target(&mut root_state, target, &opts)?;
        compiled += report.files_compiled;
        encountered += report.files_encountered;
    }
    report_outcome(compiled, encountered);

    if !cli.locked {
        let lockfile = flymake_engine::lockfile::compute(&root_state)?;
        lockfile.write_to(&lock_path)?;
    }
    Ok(())
}

fn cmd_clean(cli: &Cli) -> CliResult {
    let cwd = std::env::current_dir()?;
    let root = discover_root(&cwd)?;
    let manifest = Manifest::load(&root)?;
    let state = ProjectState::new(root.clone(), manifest);
    let root_state = RootState::new(state);
    let opts = cli.build_options();
    flymake_engine::clean(&root_state, &opts)?;
    Ok(())
}

fn cmd_run(cli: &Cli, targets: &[String], args: &[String]) -> CliResult {
    let cwd = std::env::current_dir()?;
    let root = discover_root(&cwd)?;
    let mut root_state = load_root_state(&root)?;
    let opts = cli.build_options();

    let resolved = resolve_targets(cli, &root_state, &root, targets, &["src", "source"], true)?;
    let mut executables = Vec::new();
    for target in &resolved {
        flymake_engine::build_target(&mut root_state, target, &opts)?;
        executables.extend(flymake_engine::executables_for(&root_state, target)?);
    }

    for exe in executables {
        eprintln!("     Running `{}`", exe.display());
        let status = std::process::Command::new(&exe)
            .args(args)
            .status()
            .map_err(|e| format!("cannot run {}: {e}", exe.display()))?;
        if !status.success() {
            process::exit(status.code().unwrap_or(1));
        }
    }
    Ok(())
}

fn cmd_test(cli: &Cli, targets: &[String], args: &[String]) -> CliResult {
    let cwd = std::env::current_dir()?;
    let root = discover_root(&cwd)?;
    let mut root_state = load_root_state(&root)?;
    let opts = cli.build_options();

    let resolved = resolve_targets(cli, &root_state, &root, targets, &["test"], false)?;
    let mut executables = Vec::new();
    for target in &resolved {
        flymake_engine::build_target(&mut root_state, target, &opts)?;
        executables.extend(flymake_engine::executables_for(&root_state, target)?);
    }

    for exe in executables {
        eprintln!("     Running `{}`", exe.display());
        let status = std::process::Command::new(&exe)
            .args(args)
            .status()
            .map_err(|e| format!("cannot run {}: {e}", exe.display()))?;
        if !status.success() {
            process::exit(status.code().unwrap_or(1));
        }
    }
    Ok(())
}

fn cmd_new(path: &PathBuf, cpp: bool, lib: bool) -> CliResult {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or("project path must have a final component to use as its name")?
        .to_owned();

    flymake_engine::scaffold_project(&name, path, cpp, lib)?;

    let kind_label = if lib { "library" } else { "project" };
    eprintln!("    Created {kind_label} `{name}` at {}", path.display());
    eprintln!();
    eprintln!("  To get started:");
    eprintln!("    cd {}", path.display());
    eprintln!("    flymake build");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_build_defaults() {
        let cli = Cli::try_parse_from(["flymake", "build"]).unwrap();
        assert!(!cli.force);
        assert!(!cli.all);
        match cli.command {
            Command::Build { targets } => assert!(targets.is_empty()),
            other => panic!("expected Build, got {other:?}"),
        }
    }

    #[test]
    fn parse_build_with_targets() {
        let cli = Cli::try_parse_from(["flymake", "build", "lib", "src"]).unwrap();
        match cli.command {
            Command::Build { targets } => assert_eq!(targets, vec!["lib".to_owned(), "src".to_owned()]),
            other => panic!("expected Build, got {other:?}"),
        }
    }

    #[test]
    fn parse_force_flag() {
        let cli = Cli::try_parse_from(["flymake", "-B", "build"]).unwrap();
        assert!(cli.force);
    }

    #[test]
    fn parse_locked_flag() {
        let cli = Cli::try_parse_from(["flymake", "--locked", "build"]).unwrap();
        assert!(cli.locked);
    }

    #[test]
    fn parse_all_implies_force_semantics_at_option_level() {
        let cli = Cli::try_parse_from(["flymake", "--all", "build"]).unwrap();
        assert!(cli.all);
        let opts = cli.build_options();
        assert!(opts.force_project());
    }

    #[test]
    fn parse_debug_with_level() {
        let cli = Cli::try_parse_from(["flymake", "-D", "2", "build"]).unwrap();
        assert_eq!(cli.debug, Some(2));
    }

    #[test]
    fn parse_no_warn() {
        let cli = Cli::try_parse_from(["flymake", "--w-", "build"]).unwrap();
        assert!(cli.no_warn);
        let opts = cli.build_options();
        assert!(!opts.warnings_as_errors);
    }

    #[test]
    fn parse_run_with_passthrough_args() {
        let cli = Cli::try_parse_from(["flymake", "run", "--", "--flag", "value"]).unwrap();
        match cli.command {
            Command::Run { targets, args } => {
                assert!(targets.is_empty());
                assert_eq!(args, vec!["--flag".to_owned(), "value".to_owned()]);
            }
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn parse_new_with_flags() {
        let cli = Cli::try_parse_from(["flymake", "new", "my-app", "--cpp", "--lib"]).unwrap();
        match cli.command {
            Command::New { path, cpp, lib } => {
                assert_eq!(path, PathBuf::from("my-app"));
                assert!(cpp);
                assert!(lib);
            }
            other => panic!("expected New, got {other:?}"),
        }
    }

    #[test]
    fn conflicting_forced_rules_rejected() {
        let cli = Cli::try_parse_from(["flymake", "--rl", "--rs", "build"]).unwrap();
        assert!(cli.forced_rule().is_err());
    }

    #[test]
    fn single_forced_rule_accepted() {
        let cli = Cli::try_parse_from(["flymake", "--rt", "build"]).unwrap();
        assert_eq!(cli.forced_rule().unwrap(), Some(TargetRuleKind::ToolFolder));
    }

    #[test]
    fn run_default_falls_back_to_any_source_program_folder() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("app")).unwrap();
        std::fs::write(tmp.path().join("flymake.toml"), "[folders]\n\"app\" = \"--rs\"\n").unwrap();
        let root = tmp.path().canonicalize().unwrap();

        let manifest = Manifest::load(&root).unwrap();
        let state = ProjectState::new(root.clone(), manifest);
        let root_state = RootState::new(state);
        let cli = Cli::try_parse_from(["flymake", "run"]).unwrap();

        let resolved = resolve_targets(&cli, &root_state, &root, &[], &["src", "source"], true).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].kind, TargetRuleKind::SourceProgram);
        assert_eq!(resolved[0].folder, root.join("app"));
    }

    #[test]
    fn test_default_does_not_fall_back_to_other_tool_folders() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("checks")).unwrap();
        std::fs::write(tmp.path().join("flymake.toml"), "[folders]\n\"checks\" = \"--rt\"\n").unwrap();
        let root = tmp.path().canonicalize().unwrap();

        let manifest = Manifest::load(&root).unwrap();
        let state = ProjectState::new(root.clone(), manifest);
        let root_state = RootState::new(state);
        let cli = Cli::try_parse_from(["flymake", "test"]).unwrap();

        let result = resolve_targets(&cli, &root_state, &root, &[], &["test"], false);
        assert!(result.is_err());
    }
}
