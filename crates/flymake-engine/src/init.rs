//! Project scaffolding for `flymake new`.

use std::path::Path;

use flymake_util::fs::{ensure_dir, write_file};

use crate::error::EngineError;

/// Scaffold a new flymake project at `dir`.
///
/// Creates the project directory (if it doesn't exist), a minimal
/// `flymake.toml`, and either a `src/main.{c,cpp}` hello-world program or,
/// with `lib`, a `lib/<name>.{c,cpp}` library source plus header. The
/// well-known `src/`/`lib/` folder names are picked up automatically by
/// [`flymake_config::manifest::Manifest::load`] without any `[folders]`
/// entry needed in the manifest.
///
/// # Errors
/// Returns [`EngineError::ProjectExists`] if `dir/flymake.toml` already
/// exists, or propagates an I/O failure creating the directory or files.
pub fn scaffold_project(name: &str, dir: &Path, cpp: bool, lib: bool) -> Result<(), EngineError> {
    let manifest_path = dir.join("flymake.toml");
    if manifest_path.is_file() {
        return Err(EngineError::ProjectExists {
            path: manifest_path.display().to_string(),
        });
    }

    let ext = if cpp { "cpp" } else { "c" };
    let manifest_body = format!("[package]\nname = \"{name}\"\nversion = \"0.1.0\"\n");

    if lib {
        let lib_dir = dir.join("lib");
        ensure_dir(&lib_dir)?;
        write_file(&manifest_path, &manifest_body)?;
        write_file(&lib_dir.join(format!("{name}.{ext}")), &library_source(name, cpp))?;
        write_file(&lib_dir.join(format!("{name}.h")), &library_header(name, cpp))?;
    } else {
        let src_dir = dir.join("src");
        ensure_dir(&src_dir)?;
        write_file(&manifest_path, &manifest_body)?;
        write_file(&src_dir.join(format!("main.{ext}")), &main_source(name, cpp))?;
    }

    write_file(&dir.join(".gitignore"), "*/out/\n")?;

    Ok(())
}

fn main_source(name: &str, cpp: bool) -> String {
    if cpp {
        format!("#include <iostream>\n\nint main() {{\n    std::cout << \"Hello, {name}!\" << std::endl;\n    return 0;\n}}\n")
    } else {
        format!("#include <stdio.h>\n\nint main(void) {{\n    printf(\"Hello, {name}!\\n\");\n    return 0;\n}}\n")
    }
}

fn library_header(name: &str, cpp: bool) -> String {
    let guard = format!("{}_H", name.to_uppercase());
    if cpp {
        format!("#ifndef {guard}\n#define {guard}\n\nconst char *{name}_greeting();\n\n#endif\n")
    } else {
        format!("#ifndef {guard}\n#define {guard}\n\nconst char *{name}_greeting(void);\n\n#endif\n")
    }
}

fn library_source(name: &str, cpp: bool) -> String {
    let include = format!("#include \"{name}.h\"\n\n");
    if cpp {
        format!("{include}const char *{name}_greeting() {{\n    return \"Hello from {name}!\";\n}}\n")
    } else {
        format!("{include}const char *{name}_greeting(void) {{\n    return \"Hello from {name}!\";\n}}\n")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn creates_bin_project_structure() {
        let tmp = tempfile::tempdir().unwrap();
        let project_dir = tmp.path().join("my-app");

        scaffold_project("my-app", &project_dir, false, false).unwrap();

        assert!(project_dir.join("flymake.toml").exists());
        assert!(project_dir.join("src").join("main.c").exists());
        assert!(project_dir.join(".gitignore").exists());
    }

    #[test]
    fn cpp_flag_scaffolds_cpp_source() {
        let tmp = tempfile::tempdir().unwrap();
        let project_dir = tmp.path().join("my-app");

        scaffold_project("my-app", &project_dir, true, false).unwrap();

        assert!(project_dir.join("src").join("main.cpp").exists());
        assert!(!project_dir.join("src").join("main.c").exists());
    }

    #[test]
    fn lib_flag_scaffolds_library_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let project_dir = tmp.path().join("my-lib");

        scaffold_project("my-lib", &project_dir, false, true).unwrap();

        assert!(project_dir.join("lib").join("my-lib.c").exists());
        assert!(project_dir.join("lib").join("my-lib.h").exists());
        assert!(!project_dir.join("src").exists());
    }

    #[test]
    fn main_c_contains_name() {
        let tmp = tempfile::tempdir().unwrap();
        let project_dir = tmp.path().join("hello");

        scaffold_project("hello", &project_dir, false, false).unwrap();

        let content = fs::read_to_string(project_dir.join("src").join("main.c")).unwrap();
        assert!(content.contains("Hello, hello!"));
        assert!(content.contains("int main"));
    }

    #[test]
    fn refuses_existing_project() {
        let tmp = tempfile::tempdir().unwrap();
        let project_dir = tmp.path().join("existing");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join("flymake.toml"), "").unwrap();

        let err = scaffold_project("existing", &project_dir, false, false).unwrap_err();
        assert!(matches!(err, EngineError::ProjectExists { .. }));
    }

    #[test]
    fn creates_parent_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let project_dir = tmp.path().join("deep").join("nested").join("project");

        scaffold_project("project", &project_dir, false, false).unwrap();

        assert!(project_dir.join("flymake.toml").exists());
    }
}
