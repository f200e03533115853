//! Dependency resolver: walks the manifest dependency graph breadth-first
//! per manifest, recursing into package/git sub-states depth-second,
//! materializing prebuilt/package/git shapes and checking semver
//! compatibility across re-declarations of the same name.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use flymake_config::manifest::{DependencySpec, Manifest, RuleKind};
use flymake_config::semver::{Range, Version};
use flymake_util::git;

use crate::error::EngineError;
use crate::state::{Dependency, ProjectState, RootState};

struct ResolveCtx {
    /// Canonicalized project roots currently being (or already) resolved,
    /// guarding against two projects referring to each other.
    visited_paths: HashSet<PathBuf>,
}

fn resolve_relative(base: &Path, raw: &str) -> PathBuf {
    let candidate = Path::new(raw);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

/// Resolve every dependency reachable from `root.state`'s manifest, filling
/// `root.dependencies` and `root.library_list`.
///
/// # Errors
/// Returns [`EngineError::DependencyCycle`], [`EngineError::DependencyNotFound`],
/// [`EngineError::DependencyConflict`], [`EngineError::VersionMismatch`], or
/// an I/O/manifest/git error from materializing a dependency.
pub fn resolve_dependencies(root: &mut RootState) -> Result<(), EngineError> {
    let mut ctx = ResolveCtx {
        visited_paths: HashSet::new(),
    };
    ctx.visited_paths.insert(root.state.absolute.clone());

    let manifest = root.state.manifest.clone();
    let root_path = root.state.absolute.clone();
    let mut include_list = std::mem::take(&mut root.state.include_list);
    resolve_manifest(&mut ctx, root, &manifest, &root_path, &mut include_list)?;
    root.state.include_list = include_list;
    Ok(())
}

fn resolve_manifest(
    ctx: &mut ResolveCtx,
    root: &mut RootState,
    current_manifest: &Manifest,
    current_root_path: &Path,
    current_include_list: &mut Vec<String>,
) -> Result<(), EngineError> {
    let mut newly_created = Vec::new();

    for (name, spec) in &current_manifest.dependencies {
        if let Some(existing) = root.dependencies.iter().find(|d| &d.name == name) {
            check_compatible(existing, spec, name, current_root_path)?;
            current_include_list.push(existing.include.clone());
            continue;
        }

        let dep = construct_dependency(ctx, root, name, spec, current_root_path)?;
        root.library_list.extend(dep.libraries.clone());
        current_include_list.push(dep.include.clone());
        root.dependencies.push(dep);
        newly_created.push(name.clone());
    }

    for name in newly_created {
        let Some(idx) = root.dependencies.iter().position(|d| d.name == name) else {
            continue;
        };
        let has_sub_deps = root
            .dependencies
            .get(idx)
            .and_then(|d| d.sub_state.as_ref())
            .is_some_and(|s| !s.manifest.dependencies.is_empty());
        if !has_sub_deps {
            continue;
        }

        let Some(dep) = root.dependencies.get_mut(idx) else {
            continue;
        };
        let Some(mut sub_state) = dep.sub_state.take() else {
            continue;
        };
        let sub_manifest = sub_state.manifest.clone();
        let sub_root_path = sub_state.absolute.clone();
        let mut sub_include_list = std::mem::take(&mut sub_state.include_list);

        resolve_manifest(ctx, root, &sub_manifest, &sub_root_path, &mut sub_include_list)?;

        sub_state.include_list = sub_include_list;
        if let Some(dep) = root.dependencies.get_mut(idx) {
            dep.sub_state = Some(sub_state);
        }
    }

    Ok(())
}

fn check_compatible(
    existing: &Dependency,
    spec: &DependencySpec,
    name: &str,
    current_root_path: &Path,
) -> Result<(), EngineError> {
    let manifest_path = || current_root_path.join("flymake.toml").display().to_string();

    let requested = match spec {
        DependencySpec::Prebuilt { .. } => Range::Any,
        DependencySpec::Package { version, .. } | DependencySpec::Git { version, .. } => {
            version.as_deref().map(Range::parse).transpose()?.unwrap_or(Range::Any)
        }
    };

    if !requested.matches(existing.resolved_version) {
        return Err(EngineError::DependencyConflict {
            name: name.to_owned(),
            manifest_path: manifest_path(),
            reason: format!(
                "requested version `{requested}` does not accept already-resolved version `{}`",
                existing.resolved_version
            ),
        });
    }

    if let DependencySpec::Prebuilt { inc, .. } = spec {
        if inc != &existing.include {
            return Err(EngineError::DependencyConflict {
                name: name.to_owned(),
                manifest_path: manifest_path(),
                reason: format!("conflicting include paths `{}` and `{inc}`", existing.include),
            });
        }
    }

    Ok(())
}

fn construct_dependency(
    ctx: &mut ResolveCtx,
    root: &RootState,
    name: &str,
    spec: &DependencySpec,
    manifest_root: &Path,
) -> Result<Dependency, EngineError> {
    let mut dep = match spec {
        DependencySpec::Prebuilt { path, inc } => construct_prebuilt(name, path, inc, manifest_root),
        DependencySpec::Package { path, version } => {
            let target = resolve_relative(manifest_root, path);
            let range = version.as_deref().map(Range::parse).transpose()?.unwrap_or(Range::Any);
            build_package_like(ctx, root, name, target, version.as_deref(), range)
        }
        DependencySpec::Git {
            git: url,
            version,
            sha,
            branch,
        } => construct_git(ctx, root, name, url, version.as_deref(), sha.as_deref(), branch.as_deref()),
    }?;
    dep.original_spec = spec.clone();
    Ok(dep)
}

fn construct_prebuilt(name: &str, path: &str, inc: &str, manifest_root: &Path) -> Result<Dependency, EngineError> {
    let lib_path = resolve_relative(manifest_root, path);
    let inc_path = resolve_relative(manifest_root, inc);

    if !lib_path.is_file() {
        return Err(EngineError::DependencyNotFound {
            name: name.to_owned(),
            reason: format!("library file `{}` does not exist", lib_path.display()),
        });
    }
    if !inc_path.is_dir() {
        return Err(EngineError::DependencyNotFound {
            name: name.to_owned(),
            reason: format!("include folder `{}` does not exist", inc_path.display()),
        });
    }

    Ok(Dependency {
        name: name.to_owned(),
        requested_range: Range::Any,
        resolved_version: Version::Unknown,
        libraries: vec![lib_path],
        include: inc.to_owned(),
        built: true,
        sub_state: None,
        original_spec: DependencySpec::Prebuilt {
            path: path.to_owned(),
            inc: inc.to_owned(),
        },
    })
}

fn build_package_like(
    ctx: &mut ResolveCtx,
    root: &RootState,
    name: &str,
    target: PathBuf,
    caller_version: Option<&str>,
    requested_range: Range,
) -> Result<Dependency, EngineError> {
    let canonical = target.canonicalize().map_err(|_| EngineError::DependencyNotFound {
        name: name.to_owned(),
        reason: format!("path `{}` does not exist", target.display()),
    })?;

    if ctx.visited_paths.contains(&canonical) {
        return Err(EngineError::DependencyCycle {
            name: name.to_owned(),
            path: canonical.display().to_string(),
        });
    }

    let mut sub_manifest = Manifest::load(&canonical)?;
    if !sub_manifest.folder_rules.iter().any(|r| r.kind == RuleKind::Library) {
        return Err(EngineError::DependencyNotFound {
            name: name.to_owned(),
            reason: "project cannot be built as library".to_owned(),
        });
    }
    sub_manifest.compiler_rules = root.state.manifest.compiler_rules.clone();

    let resolved_version = if sub_manifest.package.version != "*" {
        Version::parse(&sub_manifest.package.version)?
    } else if let Some(caller) = caller_version {
        Version::parse(caller)?
    } else {
        Version::Unknown
    };

    ctx.visited_paths.insert(canonical.clone());

    let include = canonical.display().to_string();
    let sub_state = ProjectState::new(canonical, sub_manifest);

    Ok(Dependency {
        name: name.to_owned(),
        requested_range,
        resolved_version,
        libraries: Vec::new(),
        include,
        built: false,
        sub_state: Some(sub_state),
        original_spec: DependencySpec::Package {
            path: String::new(),
            version: caller_version.map(str::to_owned),
        },
    })
}

fn construct_git(
    ctx: &mut ResolveCtx,
    root: &RootState,
    name: &str,
    url: &str,
    version: Option<&str>,
    sha: Option<&str>,
    branch: Option<&str>,
) -> Result<Dependency, EngineError> {
    let deps_dir = root.state.absolute.join("deps").join(name);

    git::clone_or_reuse(url, &deps_dir, branch).map_err(|source| EngineError::CloneFailed {
        name: name.to_owned(),
        source,
    })?;

    if let Some(sha) = sha {
        git::checkout(&deps_dir, sha).map_err(|source| EngineError::CloneFailed {
            name: name.to_owned(),
            source,
        })?;
    } else if let Some(version_str) = version {
        let range = Range::parse(version_str)?;
        let entries = git::log_oneline(&deps_dir).map_err(|source| EngineError::CloneFailed {
            name: name.to_owned(),
            source,
        })?;
        let found = entries.iter().find_map(|entry| {
            let (major, minor, patch) = flymake_config::semver::scan_version_token(&entry.message)?;
            let candidate = Version::Concrete(major, minor, patch);
            if range.matches(candidate) && git::looks_like_sha(&entry.sha) {
                Some(entry.sha.clone())
            } else {
                None
            }
        });
        match found {
            Some(commit_sha) => {
                git::checkout(&deps_dir, &commit_sha).map_err(|source| EngineError::CloneFailed {
                    name: name.to_owned(),
                    source,
                })?;
            }
            None => {
                return Err(EngineError::VersionMismatch {
                    name: name.to_owned(),
                    reason: format!("no tagged commit satisfies version `{version_str}`"),
                });
            }
        }
    }

    let range = version.map(Range::parse).transpose()?.unwrap_or(Range::Any);
    build_package_like(ctx, root, name, deps_dir, version, range)
}
