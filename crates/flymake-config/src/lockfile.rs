//! The `flymake.lock` lockfile.
//!
//! Records each resolved dependency's source and concrete version so that a
//! later `build --locked` can detect drift without touching the network or
//! re-walking the dependency tree.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Lockfile {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyLock>,
}

/// A single locked dependency entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyLock {
    pub name: String,
    #[serde(flatten)]
    pub source: DepSource,
    /// The concrete version resolved at lock time (e.g. `"1.4.0"`, or `"*"`
    /// when no version could be determined).
    pub resolved_version: String,
    /// SHA-256 of the dependency's materialized sources, used to detect
    /// drift between what the lockfile recorded and what's on disk.
    pub source_hash: String,
}

/// The resolved source shape of a locked dependency, mirroring
/// [`crate::manifest::DependencySpec`] minus the manifest-only fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "source_type")]
pub enum DepSource {
    Prebuilt { path: String, inc: String },
    Path { path: String },
    Git { url: String, sha: String },
}

impl Lockfile {
    /// Read and parse `flymake.lock` from `path`. Returns a default (empty)
    /// lockfile if the file does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or contains
    /// invalid TOML.
    pub fn from_path(path: &Path) -> Result<Self, LockfileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| LockfileError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| LockfileError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Look up a locked dependency by name.
    pub fn find(&self, name: &str) -> Option<&DependencyLock> {
        self.dependencies.iter().find(|d| d.name == name)
    }

    /// Write the lockfile to disk as human-readable TOML, atomically
    /// (write to a temp file, then rename over the target).
    ///
    /// # Errors
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<(), LockfileError> {
        let content =
            toml::to_string_pretty(self).map_err(|source| LockfileError::Serialize { source })?;
        let tmp_path = path.with_extension("lock.tmp");
        std::fs::write(&tmp_path, &content).map_err(|source| LockfileError::Write {
            path: tmp_path.display().to_string(),
            source,
        })?;
        std::fs::rename(&tmp_path, path).map_err(|source| LockfileError::Write {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LockfileError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid flymake.lock at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("cannot serialize lockfile: {source}")]
    Serialize { source: toml::ser::Error },
    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}
