//! The `flymake.toml` project manifest.

use std::path::Path;

use toml::Value;

/// A fully parsed and validated `flymake.toml`, augmented with default folder
/// rules discovered on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub package: Package,
    /// Compiler rules, one per extension group, built-ins first.
    pub compiler_rules: Vec<CompilerRule>,
    /// Folder rules in declaration order, with on-disk defaults appended.
    pub folder_rules: Vec<FolderRuleDecl>,
    /// Dependency declarations in declaration order.
    pub dependencies: Vec<(String, DependencySpec)>,
    /// Source-classification recursion depth: 1 for a "simple" project
    /// (sources directly in the root), 3 otherwise.
    pub max_depth: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    /// A semver range string, defaulting to `"*"`.
    pub version: String,
}

/// One compiler rule, covering a dot-separated set of file extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerRule {
    pub extensions: Vec<String>,
    pub cc: String,
    pub ll: String,
    pub cc_dbg: String,
    pub ll_dbg: String,
    pub inc_prefix: String,
    pub warn: String,
}

impl CompilerRule {
    fn matches_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e == ext)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Library,
    SourceProgram,
    ToolFolder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRuleDecl {
    /// Root-relative, always slash-terminated.
    pub folder: String,
    pub kind: RuleKind,
}

/// One dependency declaration, already classified by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencySpec {
    /// `path` + `inc` both present: a prebuilt static library plus headers.
    Prebuilt { path: String, inc: String },
    /// `path` present, `inc` absent: a sibling project built from source.
    Package {
        path: String,
        version: Option<String>,
    },
    /// `git` present: a remote repository cloned into `deps/<name>/`.
    Git {
        git: String,
        version: Option<String>,
        sha: Option<String>,
        branch: Option<String>,
    },
}

fn builtin_compiler_rules() -> Vec<CompilerRule> {
    vec![
        CompilerRule {
            extensions: vec!["c".to_owned()],
            cc: "cc {warn} {debug} {incs} -c {in} -o {out}".to_owned(),
            ll: "cc {debug} {in} {libs} -o {out}".to_owned(),
            cc_dbg: "-g".to_owned(),
            ll_dbg: "-g".to_owned(),
            inc_prefix: "-I".to_owned(),
            warn: "-Wall -Werror".to_owned(),
        },
        CompilerRule {
            extensions: vec![
                "c++".to_owned(),
                "cpp".to_owned(),
                "cxx".to_owned(),
                "cc".to_owned(),
                "C".to_owned(),
            ],
            cc: "c++ {warn} {debug} {incs} -c {in} -o {out}".to_owned(),
            ll: "c++ {debug} {in} {libs} -o {out}".to_owned(),
            cc_dbg: "-g".to_owned(),
            ll_dbg: "-g".to_owned(),
            inc_prefix: "-I".to_owned(),
            warn: "-Wall -Werror".to_owned(),
        },
    ]
}

impl Manifest {
    /// Discover, parse, and fully resolve the manifest at `root`.
    ///
    /// If `root/flymake.toml` is absent, a default manifest (built-in
    /// compiler rules only, package name taken from `root`'s basename) is
    /// used as the starting point. Either way, the well-known folders
    /// `src/`, `source/`, `lib/`, `library/`, `test/` are scanned on disk and
    /// folded into the folder-rule list.
    ///
    /// # Errors
    /// Returns an error if the manifest file exists but cannot be read or
    /// fails to parse or validate.
    pub fn load(root: &Path) -> Result<Self, ManifestError> {
        let default_name = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("project")
            .to_owned();

        let manifest_path = root.join("flymake.toml");
        let mut manifest = if manifest_path.is_file() {
            let content =
                std::fs::read_to_string(&manifest_path).map_err(|source| ManifestError::Read {
                    path: manifest_path.display().to_string(),
                    source,
                })?;
            Self::from_str(&content, &manifest_path.display().to_string(), &default_name)?
        } else {
            Self {
                package: Package {
                    name: default_name,
                    version: "*".to_owned(),
                },
                compiler_rules: builtin_compiler_rules(),
                folder_rules: Vec::new(),
                dependencies: Vec::new(),
                max_depth: 3,
            }
        };

        inject_default_folder_rules(&mut manifest, root);
        Ok(manifest)
    }

    /// Parse a manifest body (without filesystem-dependent folder-rule
    /// injection). `path` is used only for error messages.
    ///
    /// # Errors
    /// Returns an error if `content` is not valid TOML or fails semantic
    /// validation (bad placeholders, unknown rule literals, malformed
    /// dependency tables).
    pub fn from_str(content: &str, path: &str, default_name: &str) -> Result<Self, ManifestError> {
        let table: toml::Table = content.parse().map_err(|e: toml::de::Error| {
            let byte_idx = e.span().map(|span| span.start).unwrap_or(0);
            invalid_at(content, path, byte_idx, e.to_string())
        })?;

        let package = parse_package(&table, content, path, default_name)?;

        let mut compiler_rules = builtin_compiler_rules();
        if let Some(Value::Table(compiler_table)) = table.get("compiler") {
            for (key, value) in compiler_table {
                let rule = parse_compiler_rule(key, value, content, path)?;
                if let Some(existing) = compiler_rules
                    .iter_mut()
                    .find(|r| r.extensions == rule.extensions)
                {
                    *existing = rule;
                } else {
                    compiler_rules.push(rule);
                }
            }
        }

        let mut folder_rules = Vec::new();
        if let Some(Value::Table(folders_table)) = table.get("folders") {
            for (key, value) in folders_table {
                let kind = parse_folder_rule_value(key, value, content, path)?;
                folder_rules.push(FolderRuleDecl {
                    folder: normalize_folder(key),
                    kind,
                });
            }
        }

        let mut dependencies = Vec::new();
        if let Some(Value::Table(deps_table)) = table.get("dependencies") {
            for (key, value) in deps_table {
                let spec = parse_dependency(key, value, content, path)?;
                dependencies.push((key.clone(), spec));
            }
        }

        Ok(Self {
            package,
            compiler_rules,
            folder_rules,
            dependencies,
            max_depth: 3,
        })
    }

    /// All recognized file extensions across every compiler rule.
    pub fn all_extensions(&self) -> Vec<String> {
        self.compiler_rules
            .iter()
            .flat_map(|r| r.extensions.iter().cloned())
            .collect()
    }

    /// Find the compiler rule covering `extension`, if any.
    pub fn rule_for_extension(&self, extension: &str) -> Option<&CompilerRule> {
        self.compiler_rules
            .iter()
            .find(|r| r.matches_extension(extension))
    }

    /// Serialize back to TOML, mirroring what was parsed (used for round-trip testing).
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ManifestError> {
        let mut table = toml::Table::new();

        let mut package = toml::Table::new();
        package.insert("name".to_owned(), Value::String(self.package.name.clone()));
        package.insert(
            "version".to_owned(),
            Value::String(self.package.version.clone()),
        );
        table.insert("package".to_owned(), Value::Table(package));

        if !self.dependencies.is_empty() {
            let mut deps = toml::Table::new();
            for (name, spec) in &self.dependencies {
                deps.insert(name.clone(), Value::Table(dependency_to_table(spec)));
            }
            table.insert("dependencies".to_owned(), Value::Table(deps));
        }

        toml::to_string_pretty(&Value::Table(table)).map_err(|source| ManifestError::Serialize { source })
    }
}

fn dependency_to_table(spec: &DependencySpec) -> toml::Table {
    let mut out = toml::Table::new();
    match spec {
        DependencySpec::Prebuilt { path, inc } => {
            out.insert("path".to_owned(), Value::String(path.clone()));
            out.insert("inc".to_owned(), Value::String(inc.clone()));
        }
        DependencySpec::Package { path, version } => {
            out.insert("path".to_owned(), Value::String(path.clone()));
            if let Some(version) = version {
                out.insert("version".to_owned(), Value::String(version.clone()));
            }
        }
        DependencySpec::Git {
            git,
            version,
            sha,
            branch,
        } => {
            out.insert("git".to_owned(), Value::String(git.clone()));
            if let Some(version) = version {
                out.insert("version".to_owned(), Value::String(version.clone()));
            }
            if let Some(sha) = sha {
                out.insert("sha".to_owned(), Value::String(sha.clone()));
            }
            if let Some(branch) = branch {
                out.insert("branch".to_owned(), Value::String(branch.clone()));
            }
        }
    }
    out
}

fn parse_package(
    table: &toml::Table,
    content: &str,
    path: &str,
    default_name: &str,
) -> Result<Package, ManifestError> {
    let Some(Value::Table(package_table)) = table.get("package") else {
        return Ok(Package {
            name: default_name.to_owned(),
            version: "*".to_owned(),
        });
    };

    let name = match package_table.get("name") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(invalid_at(
                content,
                path,
                find_key_offset(content, "name"),
                "package.name must be a string".to_owned(),
            ));
        }
        None => default_name.to_owned(),
    };

    let version = match package_table.get("version") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(invalid_at(
                content,
                path,
                find_key_offset(content, "version"),
                "package.version must be a string".to_owned(),
            ));
        }
        None => "*".to_owned(),
    };

    Ok(Package { name, version })
}

const REQUIRED_CC_PLACEHOLDERS: &[&str] = &["{in}", "{incs}", "{warn}", "{debug}", "{out}"];
const REQUIRED_LL_PLACEHOLDERS: &[&str] = &["{in}", "{libs}", "{debug}", "{out}"];

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

fn check_placeholders(template: &str, required: &[&str]) -> Option<String> {
    for placeholder in required {
        if count_occurrences(template, placeholder) != 1 {
            return Some(format!(
                "template `{template}` must contain exactly one occurrence of {placeholder}"
            ));
        }
    }
    None
}

fn parse_compiler_rule(
    key: &str,
    value: &Value,
    content: &str,
    path: &str,
) -> Result<CompilerRule, ManifestError> {
    let Value::Table(rule_table) = value else {
        return Err(invalid_at(
            content,
            path,
            find_key_offset(content, key),
            format!("compiler.{key} must be an inline table"),
        ));
    };

    let get_string = |k: &str| -> Option<String> {
        match rule_table.get(k) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    };

    let cc = get_string("cc").ok_or_else(|| {
        invalid_at(
            content,
            path,
            find_key_offset(content, key),
            format!("compiler.{key}.cc is required"),
        )
    })?;
    let ll = get_string("ll").ok_or_else(|| {
        invalid_at(
            content,
            path,
            find_key_offset(content, key),
            format!("compiler.{key}.ll is required"),
        )
    })?;

    if let Some(reason) = check_placeholders(&cc, REQUIRED_CC_PLACEHOLDERS) {
        return Err(invalid_at(content, path, find_key_offset(content, key), reason));
    }
    if let Some(reason) = check_placeholders(&ll, REQUIRED_LL_PLACEHOLDERS) {
        return Err(invalid_at(content, path, find_key_offset(content, key), reason));
    }

    let extensions = key.split('.').map(str::to_owned).collect();

    Ok(CompilerRule {
        extensions,
        cc,
        ll,
        cc_dbg: get_string("cc_dbg").unwrap_or_else(|| "-g".to_owned()),
        ll_dbg: get_string("ll_dbg").unwrap_or_else(|| "-g".to_owned()),
        inc_prefix: get_string("inc").unwrap_or_else(|| "-I".to_owned()),
        warn: get_string("warn").unwrap_or_else(|| "-Wall -Werror".to_owned()),
    })
}

fn parse_folder_rule_value(
    key: &str,
    value: &Value,
    content: &str,
    path: &str,
) -> Result<RuleKind, ManifestError> {
    let Value::String(literal) = value else {
        return Err(invalid_at(
            content,
            path,
            find_key_offset(content, key),
            format!("folders.{key} must be a string"),
        ));
    };
    match literal.as_str() {
        "--rl" => Ok(RuleKind::Library),
        "--rs" => Ok(RuleKind::SourceProgram),
        "--rt" => Ok(RuleKind::ToolFolder),
        other => Err(invalid_at(
            content,
            path,
            find_key_offset(content, key),
            format!("unknown folder rule literal `{other}`, expected --rl, --rs, or --rt"),
        )),
    }
}

fn normalize_folder(key: &str) -> String {
    if key.ends_with('/') {
        key.to_owned()
    } else {
        format!("{key}/")
    }
}

fn parse_dependency(
    key: &str,
    value: &Value,
    content: &str,
    path: &str,
) -> Result<DependencySpec, ManifestError> {
    let Value::Table(dep_table) = value else {
        return Err(invalid_at(
            content,
            path,
            find_key_offset(content, key),
            format!("dependencies.{key} must be an inline table"),
        ));
    };

    let get_string = |k: &str| -> Option<String> {
        match dep_table.get(k) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    };

    let git = get_string("git");
    let path_val = get_string("path");
    let inc = get_string("inc");
    let version = get_string("version");
    let sha = get_string("sha");
    let branch = get_string("branch");

    if let Some(git) = git {
        if version.is_some() && sha.is_some() {
            return Err(invalid_at(
                content,
                path,
                find_key_offset(content, key),
                format!("dependencies.{key}: version and sha are mutually exclusive"),
            ));
        }
        return Ok(DependencySpec::Git {
            git,
            version,
            sha,
            branch,
        });
    }

    match (path_val, inc) {
        (Some(path_val), Some(inc)) => Ok(DependencySpec::Prebuilt { path: path_val, inc }),
        (Some(path_val), None) => Ok(DependencySpec::Package {
            path: path_val,
            version,
        }),
        (None, _) => Err(invalid_at(
            content,
            path,
            find_key_offset(content, key),
            format!("dependencies.{key}: must declare `git`, or `path` (optionally with `inc`)"),
        )),
    }
}

const WELL_KNOWN_FOLDERS: &[(&str, RuleKind)] = &[
    ("lib", RuleKind::Library),
    ("library", RuleKind::Library),
    ("src", RuleKind::SourceProgram),
    ("source", RuleKind::SourceProgram),
    ("test", RuleKind::ToolFolder),
];

fn inject_default_folder_rules(manifest: &mut Manifest, root: &Path) {
    manifest.folder_rules.retain(|rule| root.join(&rule.folder).is_dir());

    for (name, kind) in WELL_KNOWN_FOLDERS {
        let candidate = root.join(name);
        if !candidate.is_dir() {
            continue;
        }
        let normalized = normalize_folder(name);
        if manifest.folder_rules.iter().any(|r| r.folder == normalized) {
            continue;
        }
        manifest.folder_rules.push(FolderRuleDecl {
            folder: normalized,
            kind: *kind,
        });
    }

    if manifest.folder_rules.is_empty() {
        let extensions = manifest.all_extensions();
        if flymake_util::fs::has_files_with_extensions(root, &extensions) {
            manifest.max_depth = 1;
        }
    }
}

fn find_key_offset(content: &str, key: &str) -> usize {
    content.find(key).unwrap_or(0)
}

fn invalid_at(content: &str, path: &str, byte_idx: usize, reason: String) -> ManifestError {
    let mut line = 1usize;
    let mut line_start = 0usize;
    for (i, b) in content.bytes().enumerate() {
        if i >= byte_idx {
            break;
        }
        if b == b'\n' {
            line += 1;
            line_start = i + 1;
        }
    }
    let col = byte_idx.saturating_sub(line_start) + 1;
    let snippet = content
        .get(line_start..)
        .and_then(|rest| rest.lines().next())
        .unwrap_or("")
        .to_owned();
    let caret = format!("{}^", " ".repeat(col.saturating_sub(1)));

    ManifestError::Invalid {
        path: path.to_owned(),
        line,
        col,
        reason,
        snippet,
        caret,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("{path}:{line}:{col}: error: {reason}\n    {snippet}\n    {caret}")]
    Invalid {
        path: String,
        line: usize,
        col: usize,
        reason: String,
        snippet: String,
        caret: String,
    },
    #[error("cannot serialize manifest: {source}")]
    Serialize { source: toml::ser::Error },
}
