#![forbid(unsafe_code)]
//! Parse and validate `flymake.toml` and `flymake.lock`.

pub mod lockfile;
pub mod manifest;
pub mod semver;

pub use lockfile::Lockfile;
pub use manifest::Manifest;
