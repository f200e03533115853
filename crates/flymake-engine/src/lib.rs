#![forbid(unsafe_code)]
//! Build orchestration for flymake: source classification, compilation,
//! dependency resolution, folder-rule builders, and project scaffolding.

pub mod build;
pub mod classify;
pub mod compiler;
pub mod error;
pub mod init;
pub mod lockfile;
pub mod resolve;
pub mod state;

pub use build::{
    build_dependencies, build_library_folder, build_source_program_folder, build_target, build_tool_folder,
    build_whole_project, clean, executables_for, BuildOutcome, BuildReport,
};
pub use classify::{classify, group_into_tools, Tool};
pub use compiler::{archive, compile_one, link, BuildOptions, CompileOutcome};
pub use error::EngineError;
pub use init::scaffold_project;
pub use resolve::resolve_dependencies;
pub use state::{Dependency, ProjectState, RootState};
