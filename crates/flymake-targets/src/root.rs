//! Project root discovery (walk up from a path to its enclosing project).

use std::path::{Path, PathBuf};

use crate::error::TargetError;

/// Compiler extensions recognized for "simple root" detection, independent
/// of any manifest (root discovery runs before a manifest is loaded).
const SIMPLE_ROOT_EXTENSIONS: &[&str] = &["c", "c++", "cpp", "cxx", "cc", "C"];

fn simple_root_extensions() -> Vec<String> {
    SIMPLE_ROOT_EXTENSIONS.iter().map(|s| (*s).to_owned()).collect()
}

fn is_project_root(dir: &Path) -> bool {
    if dir.join("flymake.toml").is_file() {
        return true;
    }
    ["src", "source", "lib", "library"]
        .iter()
        .any(|name| dir.join(name).is_dir())
}

/// Discover the enclosing project root of `start`, checking `start`, its
/// parent, and its grandparent, then falling back to treating `start` itself
/// as a "simple" root if it directly contains recognized source files.
///
/// # Errors
/// Returns [`TargetError::NotAProject`] if none of the three levels
/// qualifies and `start` contains no recognized source file either.
pub fn discover_root(start: &Path) -> Result<PathBuf, TargetError> {
    let start = if start.is_file() {
        start.parent().map(Path::to_path_buf).unwrap_or_else(|| start.to_path_buf())
    } else {
        start.to_path_buf()
    };

    let mut candidate = start.clone();
    for level in 0..3 {
        if is_project_root(&candidate) {
            return Ok(candidate);
        }
        if level == 2 {
            break;
        }
        match candidate.parent() {
            Some(parent) => candidate = parent.to_path_buf(),
            None => break,
        }
    }

    if flymake_util::fs::has_files_with_extensions(&start, &simple_root_extensions()) {
        return Ok(start);
    }

    Err(TargetError::NotAProject {
        path: start.display().to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_root_via_manifest_file() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("flymake.toml"), "").unwrap();
        let root = discover_root(tmp.path()).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn finds_root_via_src_folder() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        let root = discover_root(tmp.path()).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn finds_root_from_nested_child_one_level_up() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        let nested = tmp.path().join("build");
        fs::create_dir_all(&nested).unwrap();
        let root = discover_root(&nested).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn finds_root_from_nested_child_two_levels_up() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("flymake.toml"), "").unwrap();
        let nested = tmp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let root = discover_root(&nested).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn simple_root_when_sources_present() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("hi.c"), "int main(void){return 0;}").unwrap();
        let root = discover_root(tmp.path()).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn fails_when_nothing_qualifies() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b").join("c");
        fs::create_dir_all(&nested).unwrap();
        let result = discover_root(&nested);
        assert!(matches!(result, Err(TargetError::NotAProject { .. })));
    }

    #[test]
    fn discover_root_from_file_uses_parent() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("flymake.toml"), "").unwrap();
        let file = tmp.path().join("hi.c");
        fs::write(&file, "int main(void){return 0;}").unwrap();
        let root = discover_root(&file).unwrap();
        assert_eq!(root, tmp.path());
    }
}
