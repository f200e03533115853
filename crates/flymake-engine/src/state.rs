//! Project state: the data threaded through dependency resolution and the
//! folder builders for one project (the root, or one of its dependencies).

use std::path::PathBuf;

use flymake_config::manifest::{DependencySpec, Manifest};
use flymake_config::semver::{Range, Version};

/// State for a single project (root or dependency), built from a discovered
/// root path and its manifest.
#[derive(Debug, Clone)]
pub struct ProjectState {
    pub absolute: PathBuf,
    pub manifest: Manifest,
    /// Include-search folders contributed by this project's direct
    /// dependencies, in dependency-declaration order.
    pub include_list: Vec<String>,
    /// Set when a library folder belonging to this project (or, for the
    /// root, any of its dependencies) was recompiled this run, forcing a
    /// relink of anything that links against it.
    pub library_recompiled: bool,
    pub files_compiled: usize,
    pub files_encountered: usize,
}

impl ProjectState {
    pub fn new(absolute: PathBuf, manifest: Manifest) -> Self {
        Self {
            absolute,
            manifest,
            include_list: Vec::new(),
            library_recompiled: false,
            files_compiled: 0,
            files_encountered: 0,
        }
    }
}

/// One dependency record, owned by the root project's canonical list.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub name: String,
    pub requested_range: Range,
    pub resolved_version: Version,
    /// Library artifact path(s) to link against.
    pub libraries: Vec<PathBuf>,
    /// Include folder contributed by this dependency.
    pub include: String,
    pub built: bool,
    /// Present for package/git dependencies (built from source); absent for
    /// prebuilt dependencies.
    pub sub_state: Option<ProjectState>,
    /// The manifest declaration this dependency was constructed from, kept
    /// around so a `flymake.lock` entry can record its source shape.
    pub original_spec: DependencySpec,
}

/// The root project's state plus the resources only the root owns: the
/// canonical dependency list and the flat library-link accumulator.
#[derive(Debug, Clone)]
pub struct RootState {
    pub state: ProjectState,
    pub dependencies: Vec<Dependency>,
    /// Every dependency's library artifact(s), in dependency-declaration
    /// order; linking always uses this order.
    pub library_list: Vec<PathBuf>,
}

impl RootState {
    pub fn new(state: ProjectState) -> Self {
        Self {
            state,
            dependencies: Vec::new(),
            library_list: Vec::new(),
        }
    }
}
