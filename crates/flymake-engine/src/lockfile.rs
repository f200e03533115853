//! Computing and checking `flymake.lock` against a resolved dependency graph.

use flymake_config::lockfile::{DepSource, DependencyLock, Lockfile};
use flymake_config::manifest::DependencySpec;
use flymake_util::hash::{sha256_dir, sha256_file, sha256_multi};

use crate::error::EngineError;
use crate::state::{Dependency, RootState};

fn dep_source(dep: &Dependency) -> Result<DepSource, EngineError> {
    match &dep.original_spec {
        DependencySpec::Prebuilt { path, inc } => Ok(DepSource::Prebuilt {
            path: path.clone(),
            inc: inc.clone(),
        }),
        DependencySpec::Package { path, .. } => Ok(DepSource::Path { path: path.clone() }),
        DependencySpec::Git { git, sha, .. } => {
            let resolved_sha = match sha {
                Some(sha) => sha.clone(),
                None => {
                    let sub_state = dep.sub_state.as_ref().ok_or_else(|| EngineError::DependencyNotFound {
                        name: dep.name.clone(),
                        reason: "git dependency has no materialized checkout".to_owned(),
                    })?;
                    flymake_util::git::rev_parse_head(&sub_state.absolute)?
                }
            };
            Ok(DepSource::Git {
                url: git.clone(),
                sha: resolved_sha,
            })
        }
    }
}

fn source_hash(dep: &Dependency) -> Result<String, EngineError> {
    match &dep.original_spec {
        DependencySpec::Prebuilt { .. } => {
            let Some(lib_path) = dep.libraries.first() else {
                return Ok(String::new());
            };
            Ok(sha256_file(lib_path)?)
        }
        DependencySpec::Package { .. } | DependencySpec::Git { .. } => {
            let sub_state = dep.sub_state.as_ref().ok_or_else(|| EngineError::DependencyNotFound {
                name: dep.name.clone(),
                reason: "dependency has no materialized checkout to hash".to_owned(),
            })?;

            let manifest_path = sub_state.absolute.join("flymake.toml");
            let manifest_hash = if manifest_path.is_file() {
                sha256_file(&manifest_path)?
            } else {
                String::new()
            };

            let mut extensions = sub_state.manifest.all_extensions();
            extensions.sort();
            extensions.dedup();
            let mut source_hashes = Vec::with_capacity(extensions.len());
            for ext in &extensions {
                source_hashes.push(sha256_dir(&sub_state.absolute, &format!("**/*.{ext}"))?);
            }

            let parts: Vec<&str> =
                std::iter::once(manifest_hash.as_str()).chain(source_hashes.iter().map(String::as_str)).collect();
            Ok(sha256_multi(&parts))
        }
    }
}

/// Build the lockfile that reflects `root`'s currently resolved dependency graph.
///
/// # Errors
/// Propagates a hashing or git failure while recording any dependency's source.
pub fn compute(root: &RootState) -> Result<Lockfile, EngineError> {
    let mut dependencies = Vec::with_capacity(root.dependencies.len());
    for dep in &root.dependencies {
        dependencies.push(DependencyLock {
            name: dep.name.clone(),
            source: dep_source(dep)?,
            resolved_version: dep.resolved_version.to_string(),
            source_hash: source_hash(dep)?,
        });
    }
    Ok(Lockfile { dependencies })
}

/// Compare `root`'s currently resolved graph against a previously written
/// lockfile, per `--locked`.
///
/// # Errors
/// Returns [`EngineError::LockDrift`] if a dependency is missing from the
/// lockfile or its recorded version/source hash no longer matches, or
/// propagates a hashing/git failure while recomputing the current state.
pub fn check(root: &RootState, lockfile: &Lockfile) -> Result<(), EngineError> {
    for dep in &root.dependencies {
        let locked = lockfile.find(&dep.name).ok_or_else(|| EngineError::LockDrift {
            name: dep.name.clone(),
            reason: "not present in flymake.lock".to_owned(),
        })?;

        let current_version = dep.resolved_version.to_string();
        if locked.resolved_version != current_version {
            return Err(EngineError::LockDrift {
                name: dep.name.clone(),
                reason: format!(
                    "locked version `{}` does not match resolved version `{current_version}`",
                    locked.resolved_version
                ),
            });
        }

        let current_hash = source_hash(dep)?;
        if locked.source_hash != current_hash {
            return Err(EngineError::LockDrift {
                name: dep.name.clone(),
                reason: "source contents differ from what flymake.lock recorded".to_owned(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::{ProjectState, RootState};
    use flymake_config::manifest::{FolderRuleDecl, Manifest, RuleKind};
    use std::fs;

    fn manifest_with_lib(name: &str) -> Manifest {
        Manifest::from_str(&format!("[package]\nname = \"{name}\"\n"), "flymake.toml", name).unwrap()
    }

    #[test]
    fn compute_records_prebuilt_dependency() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("libz.a"), b"archive-bytes").unwrap();

        let mut root = RootState::new(ProjectState::new(tmp.path().to_path_buf(), manifest_with_lib("proj")));
        root.dependencies.push(Dependency {
            name: "zlib".to_owned(),
            requested_range: flymake_config::semver::Range::Any,
            resolved_version: flymake_config::semver::Version::Unknown,
            libraries: vec![tmp.path().join("libz.a")],
            include: "include".to_owned(),
            built: true,
            sub_state: None,
            original_spec: DependencySpec::Prebuilt {
                path: "libz.a".to_owned(),
                inc: "include".to_owned(),
            },
        });

        let lockfile = compute(&root).unwrap();
        assert_eq!(lockfile.dependencies.len(), 1);
        assert_eq!(lockfile.dependencies[0].name, "zlib");
        assert!(matches!(lockfile.dependencies[0].source, DepSource::Prebuilt { .. }));
        assert!(!lockfile.dependencies[0].source_hash.is_empty());
    }

    #[test]
    fn check_passes_when_nothing_changed() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("libz.a"), b"archive-bytes").unwrap();

        let mut root = RootState::new(ProjectState::new(tmp.path().to_path_buf(), manifest_with_lib("proj")));
        root.dependencies.push(Dependency {
            name: "zlib".to_owned(),
            requested_range: flymake_config::semver::Range::Any,
            resolved_version: flymake_config::semver::Version::Unknown,
            libraries: vec![tmp.path().join("libz.a")],
            include: "include".to_owned(),
            built: true,
            sub_state: None,
            original_spec: DependencySpec::Prebuilt {
                path: "libz.a".to_owned(),
                inc: "include".to_owned(),
            },
        });

        let lockfile = compute(&root).unwrap();
        check(&root, &lockfile).unwrap();
    }

    #[test]
    fn check_fails_when_source_changes() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("libz.a"), b"archive-bytes").unwrap();

        let mut root = RootState::new(ProjectState::new(tmp.path().to_path_buf(), manifest_with_lib("proj")));
        root.dependencies.push(Dependency {
            name: "zlib".to_owned(),
            requested_range: flymake_config::semver::Range::Any,
            resolved_version: flymake_config::semver::Version::Unknown,
            libraries: vec![tmp.path().join("libz.a")],
            include: "include".to_owned(),
            built: true,
            sub_state: None,
            original_spec: DependencySpec::Prebuilt {
                path: "libz.a".to_owned(),
                inc: "include".to_owned(),
            },
        });

        let lockfile = compute(&root).unwrap();
        fs::write(tmp.path().join("libz.a"), b"different-bytes").unwrap();
        let err = check(&root, &lockfile).unwrap_err();
        assert!(matches!(err, EngineError::LockDrift { .. }));
    }

    #[test]
    fn check_fails_when_dependency_missing_from_lock() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manifest = manifest_with_lib("proj");
        manifest.folder_rules.push(FolderRuleDecl {
            folder: "lib/".to_owned(),
            kind: RuleKind::Library,
        });
        let mut root = RootState::new(ProjectState::new(tmp.path().to_path_buf(), manifest));
        root.dependencies.push(Dependency {
            name: "zlib".to_owned(),
            requested_range: flymake_config::semver::Range::Any,
            resolved_version: flymake_config::semver::Version::Unknown,
            libraries: vec![tmp.path().join("libz.a")],
            include: "include".to_owned(),
            built: true,
            sub_state: None,
            original_spec: DependencySpec::Prebuilt {
                path: "libz.a".to_owned(),
                inc: "include".to_owned(),
            },
        });

        let err = check(&root, &Lockfile::default()).unwrap_err();
        assert!(matches!(err, EngineError::LockDrift { .. }));
    }
}
