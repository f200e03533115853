//! Folder builders: library, source-program, and tool-folder rules, composed
//! into a whole-project build, plus the `clean` orchestration.
//!
//! Dependencies are always built before the root's own folders, and within
//! the root every library-rule folder is built before any source-program or
//! tool-folder folder, so that a freshly rebuilt library triggers a relink.

use std::path::{Path, PathBuf};

use flymake_config::manifest::{CompilerRule, Manifest, RuleKind};
use flymake_targets::{Target, TargetRuleKind};

use crate::classify::{classify, group_into_tools};
use crate::compiler::{archive, compile_one, link, BuildOptions, CompileOutcome};
use crate::error::EngineError;
use crate::state::{ProjectState, RootState};

/// Totals from compiling and linking/archiving one folder.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOutcome {
    pub files_compiled: usize,
    pub files_encountered: usize,
    pub archived: bool,
    pub linked: bool,
}

/// Totals from an entire `build`/`run`/`test` invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildReport {
    pub files_compiled: usize,
    pub files_encountered: usize,
}

impl BuildReport {
    fn add(&mut self, outcome: BuildOutcome) {
        self.files_compiled += outcome.files_compiled;
        self.files_encountered += outcome.files_encountered;
    }
}

/// `lib/` and `library/` folders archive under the project's own name;
/// everything else archives under its own folder basename.
fn library_archive_name(folder: &Path, project_name: &str) -> String {
    match folder.file_name().and_then(|f| f.to_str()) {
        Some("lib" | "library") => project_name.to_owned(),
        Some(basename) => basename.to_owned(),
        None => project_name.to_owned(),
    }
}

/// `src/` and `source/` folders produce an executable named after the
/// project; everything else uses its own folder basename.
fn source_program_name(folder: &Path, project_name: &str) -> String {
    match folder.file_name().and_then(|f| f.to_str()) {
        Some("src" | "source") => project_name.to_owned(),
        Some(basename) => basename.to_owned(),
        None => project_name.to_owned(),
    }
}

fn include_list_for(state: &ProjectState) -> Vec<String> {
    std::iter::once(".".to_owned()).chain(state.include_list.iter().cloned()).collect()
}

fn object_path(out_dir: &Path, source: &Path) -> PathBuf {
    let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    out_dir.join(format!("{stem}.o"))
}

fn rule_for<'a>(manifest: &'a Manifest, source: &Path) -> Result<&'a CompilerRule, EngineError> {
    let extension = flymake_util::fs::extension_str(source).unwrap_or("");
    manifest.rule_for_extension(extension).ok_or_else(|| EngineError::NoFiles {
        path: source.display().to_string(),
    })
}

/// Build a library-rule folder: compile every source under it, and archive
/// the results if anything was recompiled, the archive is missing, or a
/// rebuild was forced.
///
/// # Errors
/// Propagates [`EngineError::CompileFailed`]/[`EngineError::ArchiveFailed`],
/// or [`EngineError::NoFiles`] if a source has no matching compiler rule.
pub fn build_library_folder(
    folder: &Path,
    archive_name: &str,
    manifest: &Manifest,
    include_list: &[String],
    opts: &BuildOptions,
) -> Result<(BuildOutcome, PathBuf), EngineError> {
    let extensions = manifest.all_extensions();
    let sources = classify(folder, &extensions, manifest.max_depth).unwrap_or_default();
    let out_dir = folder.join("out");

    let mut compiled = 0usize;
    let mut objects = Vec::with_capacity(sources.len());
    for source in &sources {
        let rule = rule_for(manifest, source)?;
        let outcome = compile_one(rule, source, &out_dir, include_list, opts)?;
        objects.push(object_path(&out_dir, source));
        if outcome == CompileOutcome::Compiled {
            compiled += 1;
        }
    }

    let archive_path = folder.join(format!("{archive_name}.a"));
    let should_archive = !sources.is_empty() && (compiled > 0 || !archive_path.is_file() || opts.force_project());
    if should_archive {
        archive(&objects, &archive_path, opts)?;
    }

    Ok((
        BuildOutcome {
            files_compiled: compiled,
            files_encountered: sources.len(),
            archived: should_archive,
            linked: false,
        },
        archive_path,
    ))
}

/// Build a source-program-rule folder: compile every source under it, and
/// link an executable if anything was recompiled, a library it depends on
/// was recompiled, the executable is missing, or a rebuild was forced.
///
/// # Errors
/// Propagates [`EngineError::CompileFailed`]/[`EngineError::LinkFailed`], or
/// [`EngineError::NoFiles`] if a source has no matching compiler rule.
pub fn build_source_program_folder(
    folder: &Path,
    manifest: &Manifest,
    include_list: &[String],
    library_list: &[PathBuf],
    library_recompiled: bool,
    project_name: &str,
    opts: &BuildOptions,
) -> Result<BuildOutcome, EngineError> {
    let extensions = manifest.all_extensions();
    let sources = classify(folder, &extensions, manifest.max_depth).unwrap_or_default();
    if sources.is_empty() {
        return Ok(BuildOutcome::default());
    }

    let out_dir = folder.join("out");
    let mut compiled = 0usize;
    let mut objects = Vec::with_capacity(sources.len());
    for source in &sources {
        let rule = rule_for(manifest, source)?;
        let outcome = compile_one(rule, source, &out_dir, include_list, opts)?;
        objects.push(object_path(&out_dir, source));
        if outcome == CompileOutcome::Compiled {
            compiled += 1;
        }
    }

    let exe_name = source_program_name(folder, project_name);
    let exe_path = folder.join(exe_name);
    let should_link = compiled > 0 || library_recompiled || !exe_path.is_file() || opts.force_project();
    if should_link {
        let first_source = sources.first().ok_or_else(|| EngineError::NoFiles {
            path: folder.display().to_string(),
        })?;
        let link_rule = rule_for(manifest, first_source)?;
        link(link_rule, &objects, library_list, &exe_path, opts)?;
    }

    Ok(BuildOutcome {
        files_compiled: compiled,
        files_encountered: sources.len(),
        archived: false,
        linked: should_link,
    })
}

/// Build a tool-folder rule: classify at depth 1, group into tools by shared
/// basename prefix, and build every tool (or just `only_file`, if given).
///
/// # Errors
/// Returns [`EngineError::BadProg`] if `only_file` names no tool in the
/// folder, or propagates a compile/link failure.
pub fn build_tool_folder(
    folder: &Path,
    manifest: &Manifest,
    include_list: &[String],
    library_list: &[PathBuf],
    only_file: Option<&str>,
    opts: &BuildOptions,
) -> Result<BuildOutcome, EngineError> {
    let extensions = manifest.all_extensions();
    let sources = classify(folder, &extensions, 1).unwrap_or_default();
    let tools = group_into_tools(&sources);

    let selected = match only_file {
        Some(name) => {
            let stem = Path::new(name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.to_owned());
            let found = tools.iter().find(|t| t.name == stem);
            match found {
                Some(tool) => vec![tool],
                None => return Err(EngineError::BadProg { name: name.to_owned() }),
            }
        }
        None => tools.iter().collect(),
    };

    let out_dir = folder.join("out");
    let mut total = BuildOutcome::default();

    for tool in selected {
        let mut compiled = 0usize;
        let mut objects = Vec::with_capacity(tool.sources.len());
        for source in &tool.sources {
            let rule = rule_for(manifest, source)?;
            let outcome = compile_one(rule, source, &out_dir, include_list, opts)?;
            objects.push(object_path(&out_dir, source));
            if outcome == CompileOutcome::Compiled {
                compiled += 1;
            }
        }

        let exe_path = folder.join(&tool.name);
        let should_link = compiled > 0 || !exe_path.is_file() || opts.force_project();
        if should_link {
            let first_source = tool.sources.first().ok_or_else(|| EngineError::NoFiles {
                path: folder.display().to_string(),
            })?;
            let link_rule = rule_for(manifest, first_source)?;
            link(link_rule, &objects, library_list, &exe_path, opts)?;
        }

        total.files_compiled += compiled;
        total.files_encountered += tool.sources.len();
        total.linked = total.linked || should_link;
    }

    Ok(total)
}

/// Build every dependency with a sub-state (package/git shapes), libraries
/// only, in declaration order. Already-built and prebuilt dependencies are
/// no-ops.
///
/// # Errors
/// Propagates a compile/archive failure from any dependency's library folder.
pub fn build_dependencies(root: &mut RootState, opts: &BuildOptions) -> Result<(), EngineError> {
    for idx in 0..root.dependencies.len() {
        build_one_dependency(root, idx, opts)?;
    }
    root.library_list = root.dependencies.iter().flat_map(|d| d.libraries.iter().cloned()).collect();
    Ok(())
}

fn build_one_dependency(root: &mut RootState, idx: usize, opts: &BuildOptions) -> Result<(), EngineError> {
    let already_built = root.dependencies.get(idx).is_none_or(|d| d.built);
    if already_built {
        return Ok(());
    }

    let Some(mut sub_state) = root.dependencies.get_mut(idx).and_then(|d| d.sub_state.take()) else {
        if let Some(dep) = root.dependencies.get_mut(idx) {
            dep.built = true;
        }
        return Ok(());
    };

    let dep_opts = BuildOptions {
        force_rebuild: opts.force_all,
        ..opts.clone()
    };

    let project_name = sub_state.manifest.package.name.clone();
    let library_rules: Vec<_> = sub_state
        .manifest
        .folder_rules
        .iter()
        .filter(|r| r.kind == RuleKind::Library)
        .cloned()
        .collect();
    let incs = include_list_for(&sub_state);

    let mut recompiled = false;
    let mut libraries = Vec::new();
    for rule in &library_rules {
        let folder = sub_state.absolute.join(&rule.folder);
        let name = library_archive_name(&folder, &project_name);
        let (outcome, archive_path) = build_library_folder(&folder, &name, &sub_state.manifest, &incs, &dep_opts)?;
        sub_state.files_compiled += outcome.files_compiled;
        sub_state.files_encountered += outcome.files_encountered;
        recompiled = recompiled || outcome.archived;
        libraries.push(archive_path);
    }
    sub_state.library_recompiled = recompiled;

    if let Some(dep) = root.dependencies.get_mut(idx) {
        dep.libraries = libraries;
        dep.built = true;
        dep.sub_state = Some(sub_state);
    }
    if recompiled {
        root.state.library_recompiled = true;
    }
    Ok(())
}

/// Build every folder rule in the root project: dependencies first, then
/// every library-rule folder, then every source-program and tool-folder
/// folder in declaration order.
///
/// A root with no folder rules (a "simple" project, sources directly at the
/// root) is built as a single source-program folder rooted at the project
/// folder itself, so `build`/`run` produce one executable named after the
/// root folder.
///
/// # Errors
/// Propagates any compile/link/archive/dependency-resolution failure.
pub fn build_whole_project(root: &mut RootState, opts: &BuildOptions) -> Result<BuildReport, EngineError> {
    build_dependencies(root, opts)?;

    let project_name = root.state.manifest.package.name.clone();
    let folder_rules = root.state.manifest.folder_rules.clone();
    let incs = include_list_for(&root.state);
    let mut report = BuildReport::default();

    if folder_rules.is_empty() {
        let outcome = build_source_program_folder(
            &root.state.absolute,
            &root.state.manifest,
            &incs,
            &root.library_list,
            false,
            &project_name,
            opts,
        )?;
        report.add(outcome);
        return Ok(report);
    }

    for rule in folder_rules.iter().filter(|r| r.kind == RuleKind::Library) {
        let folder = root.state.absolute.join(&rule.folder);
        let name = library_archive_name(&folder, &project_name);
        let (outcome, _archive_path) = build_library_folder(&folder, &name, &root.state.manifest, &incs, opts)?;
        if outcome.archived {
            root.state.library_recompiled = true;
        }
        report.add(outcome);
    }

    for rule in folder_rules.iter().filter(|r| r.kind != RuleKind::Library) {
        let folder = root.state.absolute.join(&rule.folder);
        let outcome = match rule.kind {
            RuleKind::SourceProgram => build_source_program_folder(
                &folder,
                &root.state.manifest,
                &incs,
                &root.library_list,
                root.state.library_recompiled,
                &project_name,
                opts,
            )?,
            RuleKind::ToolFolder => {
                build_tool_folder(&folder, &root.state.manifest, &incs, &root.library_list, None, opts)?
            }
            RuleKind::Library => unreachable!("filtered out above"),
        };
        report.add(outcome);
    }

    Ok(report)
}

/// Build one resolved target: a single folder rule, or the whole project.
/// Dependencies are always built first.
///
/// # Errors
/// Propagates any compile/link/archive/dependency-resolution failure, or
/// [`EngineError::BadProg`] if `target.file` names no tool in a tool-folder.
pub fn build_target(root: &mut RootState, target: &Target, opts: &BuildOptions) -> Result<BuildReport, EngineError> {
    if target.kind == TargetRuleKind::WholeProject {
        return build_whole_project(root, opts);
    }

    build_dependencies(root, opts)?;

    let project_name = root.state.manifest.package.name.clone();
    let incs = include_list_for(&root.state);
    let mut report = BuildReport::default();

    match target.kind {
        TargetRuleKind::WholeProject => unreachable!("handled above"),
        TargetRuleKind::Library => {
            let name = library_archive_name(&target.folder, &project_name);
            let (outcome, _archive_path) =
                build_library_folder(&target.folder, &name, &root.state.manifest, &incs, opts)?;
            if outcome.archived {
                root.state.library_recompiled = true;
            }
            report.add(outcome);
        }
        TargetRuleKind::SourceProgram => {
            let outcome = build_source_program_folder(
                &target.folder,
                &root.state.manifest,
                &incs,
                &root.library_list,
                root.state.library_recompiled,
                &project_name,
                opts,
            )?;
            report.add(outcome);
        }
        TargetRuleKind::ToolFolder => {
            let outcome = build_tool_folder(
                &target.folder,
                &root.state.manifest,
                &incs,
                &root.library_list,
                target.file.as_deref(),
                opts,
            )?;
            report.add(outcome);
        }
    }

    Ok(report)
}

/// Locate the executable(s) a resolved target would produce, for `run`/`test`
/// to launch after a build. A [`TargetRuleKind::WholeProject`] target resolves
/// to the root's own executable for a simple (no-folder-rules) project, or
/// to the root's first `src/`/`source/`-preferring source-program folder
/// otherwise.
///
/// # Errors
/// Returns [`EngineError::BadProg`] if `target` names a library (libraries
/// are not runnable), an unknown tool, or a project with no source-program
/// folder to fall back to.
pub fn executables_for(root: &RootState, target: &Target) -> Result<Vec<PathBuf>, EngineError> {
    let project_name = &root.state.manifest.package.name;

    match target.kind {
        TargetRuleKind::Library => Err(EngineError::BadProg {
            name: target.folder.display().to_string(),
        }),
        TargetRuleKind::SourceProgram => {
            let name = source_program_name(&target.folder, project_name);
            Ok(vec![target.folder.join(name)])
        }
        TargetRuleKind::ToolFolder => {
            let extensions = root.state.manifest.all_extensions();
            let sources = classify(&target.folder, &extensions, 1).unwrap_or_default();
            let tools = group_into_tools(&sources);
            match &target.file {
                Some(name) => {
                    let stem = Path::new(name)
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| name.clone());
                    tools
                        .iter()
                        .find(|t| t.name == stem)
                        .map(|t| vec![target.folder.join(&t.name)])
                        .ok_or_else(|| EngineError::BadProg { name: name.clone() })
                }
                None => Ok(tools.iter().map(|t| target.folder.join(&t.name)).collect()),
            }
        }
        TargetRuleKind::WholeProject => {
            if root.state.manifest.folder_rules.is_empty() {
                let name = source_program_name(&target.folder, project_name);
                return Ok(vec![target.folder.join(name)]);
            }

            let preferred = root
                .state
                .manifest
                .folder_rules
                .iter()
                .find(|r| r.kind == RuleKind::SourceProgram && (r.folder == "src/" || r.folder == "source/"))
                .or_else(|| {
                    root.state
                        .manifest
                        .folder_rules
                        .iter()
                        .find(|r| r.kind == RuleKind::SourceProgram)
                });

            match preferred {
                Some(rule) => {
                    let folder = root.state.absolute.join(&rule.folder);
                    let name = source_program_name(&folder, project_name);
                    Ok(vec![folder.join(name)])
                }
                None => Err(EngineError::BadProg {
                    name: "(no source-program folder)".to_owned(),
                }),
            }
        }
    }
}

/// Remove every folder rule's `out/` directory. With `force_rebuild`/`--all`,
/// also remove library archives, source-program executables, and tool
/// executables; with `--all`, also remove `deps/`.
///
/// # Errors
/// Returns an error if a path exists but cannot be removed.
pub fn clean(root: &RootState, opts: &BuildOptions) -> Result<(), EngineError> {
    let project_name = root.state.manifest.package.name.clone();
    let folder_rules = &root.state.manifest.folder_rules;

    if folder_rules.is_empty() {
        flymake_util::fs::remove_dir_all_if_exists(&root.state.absolute.join("out"))?;
        if opts.force_project() {
            let name = source_program_name(&root.state.absolute, &project_name);
            flymake_util::fs::remove_file_if_exists(&root.state.absolute.join(name))?;
        }
    }

    for rule in folder_rules {
        let folder = root.state.absolute.join(&rule.folder);
        flymake_util::fs::remove_dir_all_if_exists(&folder.join("out"))?;
        if !opts.force_project() {
            continue;
        }
        match rule.kind {
            RuleKind::Library => {
                let name = library_archive_name(&folder, &project_name);
                flymake_util::fs::remove_file_if_exists(&folder.join(format!("{name}.a")))?;
            }
            RuleKind::SourceProgram => {
                let name = source_program_name(&folder, &project_name);
                flymake_util::fs::remove_file_if_exists(&folder.join(name))?;
            }
            RuleKind::ToolFolder => {
                let extensions = root.state.manifest.all_extensions();
                if let Some(sources) = classify(&folder, &extensions, 1) {
                    for tool in group_into_tools(&sources) {
                        flymake_util::fs::remove_file_if_exists(&folder.join(&tool.name))?;
                    }
                }
            }
        }
    }

    if opts.force_all {
        flymake_util::fs::remove_dir_all_if_exists(&root.state.absolute.join("deps"))?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use flymake_config::manifest::{FolderRuleDecl, Manifest};
    use std::fs;

    fn manifest_with_rules(rules: &[(&str, RuleKind)]) -> Manifest {
        let mut manifest = Manifest::from_str("", "flymake.toml", "proj").unwrap();
        manifest.folder_rules = rules
            .iter()
            .map(|(folder, kind)| FolderRuleDecl {
                folder: (*folder).to_owned(),
                kind: *kind,
            })
            .collect();
        manifest
    }

    #[test]
    fn library_folder_compiles_and_archives_once() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("lib");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("a.c"), "int a(void){return 0;}").unwrap();

        let manifest = manifest_with_rules(&[("lib/", RuleKind::Library)]);
        let opts = BuildOptions::default();
        let (outcome, archive_path) = build_library_folder(&folder, "proj", &manifest, &[], &opts).unwrap();

        assert_eq!(outcome.files_compiled, 1);
        assert!(outcome.archived);
        assert_eq!(archive_path, folder.join("proj.a"));
    }

    #[test]
    fn library_folder_skips_archive_when_nothing_changed() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("lib");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("a.c"), "int a(void){return 0;}").unwrap();

        let manifest = manifest_with_rules(&[("lib/", RuleKind::Library)]);
        let opts = BuildOptions::default();
        build_library_folder(&folder, "proj", &manifest, &[], &opts).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        let (outcome, _) = build_library_folder(&folder, "proj", &manifest, &[], &opts).unwrap();
        assert_eq!(outcome.files_compiled, 0);
        assert!(!outcome.archived);
    }

    #[test]
    fn library_named_lib_uses_project_name() {
        assert_eq!(library_archive_name(Path::new("/x/lib"), "widget"), "widget");
        assert_eq!(library_archive_name(Path::new("/x/library"), "widget"), "widget");
        assert_eq!(library_archive_name(Path::new("/x/vendor"), "widget"), "vendor");
    }

    #[test]
    fn source_program_folder_links_when_library_recompiled() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("src");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("main.c"), "int main(void){return 0;}").unwrap();

        let manifest = manifest_with_rules(&[("src/", RuleKind::SourceProgram)]);
        let opts = BuildOptions::default();
        let outcome = build_source_program_folder(&folder, &manifest, &[], &[], false, "proj", &opts).unwrap();
        assert!(outcome.linked);
        assert!(folder.join("proj").is_file());

        std::thread::sleep(std::time::Duration::from_millis(10));
        let again = build_source_program_folder(&folder, &manifest, &[], &[], false, "proj", &opts).unwrap();
        assert!(!again.linked);

        let forced = build_source_program_folder(&folder, &manifest, &[], &[], true, "proj", &opts).unwrap();
        assert!(forced.linked);
    }

    #[test]
    fn tool_folder_builds_each_tool_independently() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("test");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("test_foo.c"), "int main(void){return 0;}").unwrap();
        fs::write(folder.join("test_bar.c"), "int main(void){return 0;}").unwrap();

        let manifest = manifest_with_rules(&[("test/", RuleKind::ToolFolder)]);
        let opts = BuildOptions::default();
        let outcome = build_tool_folder(&folder, &manifest, &[], &[], None, &opts).unwrap();
        assert_eq!(outcome.files_compiled, 2);
        assert!(folder.join("test_foo").is_file());
        assert!(folder.join("test_bar").is_file());
    }

    #[test]
    fn tool_folder_only_file_builds_one_tool() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("test");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("test_foo.c"), "int main(void){return 0;}").unwrap();
        fs::write(folder.join("test_bar.c"), "int main(void){return 0;}").unwrap();

        let manifest = manifest_with_rules(&[("test/", RuleKind::ToolFolder)]);
        let opts = BuildOptions::default();
        let outcome = build_tool_folder(&folder, &manifest, &[], &[], Some("test_foo"), &opts).unwrap();
        assert_eq!(outcome.files_compiled, 1);
        assert!(folder.join("test_foo").is_file());
        assert!(!folder.join("test_bar").is_file());
    }

    #[test]
    fn tool_folder_unknown_file_is_bad_prog() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("test");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("test_foo.c"), "int main(void){return 0;}").unwrap();

        let manifest = manifest_with_rules(&[("test/", RuleKind::ToolFolder)]);
        let opts = BuildOptions::default();
        let err = build_tool_folder(&folder, &manifest, &[], &[], Some("nope"), &opts).unwrap_err();
        assert!(matches!(err, EngineError::BadProg { .. }));
    }

    #[test]
    fn whole_project_builds_library_before_program() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("lib")).unwrap();
        fs::write(tmp.path().join("lib").join("a.c"), "int a(void){return 0;}").unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src").join("main.c"), "int main(void){return 0;}").unwrap();

        let manifest = manifest_with_rules(&[("src/", RuleKind::SourceProgram), ("lib/", RuleKind::Library)]);
        let state = ProjectState::new(tmp.path().to_path_buf(), manifest);
        let mut root = RootState::new(state);

        let opts = BuildOptions::default();
        let report = build_whole_project(&mut root, &opts).unwrap();
        assert_eq!(report.files_compiled, 2);
        assert!(tmp.path().join("lib").join("proj.a").is_file());
        assert!(tmp.path().join("src").join("proj").is_file());
    }

    #[test]
    fn simple_project_with_no_folder_rules_builds_root_as_program() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("hi.c"), "int main(void){return 0;}").unwrap();

        let manifest = manifest_with_rules(&[]);
        let state = ProjectState::new(tmp.path().to_path_buf(), manifest);
        let mut root = RootState::new(state);

        let opts = BuildOptions::default();
        let report = build_whole_project(&mut root, &opts).unwrap();
        assert_eq!(report.files_compiled, 1);
        assert!(tmp.path().join("proj").is_file());
    }

    #[test]
    fn clean_removes_out_dir_and_with_force_removes_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = tmp.path().join("lib");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("a.c"), "int a(void){return 0;}").unwrap();

        let manifest = manifest_with_rules(&[("lib/", RuleKind::Library)]);
        let state = ProjectState::new(tmp.path().to_path_buf(), manifest);
        let mut root = RootState::new(state);
        build_whole_project(&mut root, &BuildOptions::default()).unwrap();

        assert!(folder.join("out").is_dir());
        assert!(folder.join("proj.a").is_file());

        clean(&root, &BuildOptions::default()).unwrap();
        assert!(!folder.join("out").exists());
        assert!(folder.join("proj.a").is_file());

        let forced = BuildOptions {
            force_rebuild: true,
            ..Default::default()
        };
        clean(&root, &forced).unwrap();
        assert!(!folder.join("proj.a").exists());
    }
}
