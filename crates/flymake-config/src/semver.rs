//! Hand-rolled semantic-version range matching.
//!
//! The manifest's `version` key follows the truncated `MAJOR[.MINOR[.PATCH]]`
//! convention, not the full Cargo/`semver` crate grammar (no `^`, `~`, `*.x`,
//! pre-release or build metadata), so matching is implemented directly rather
//! than pulled in from a crate whose semantics don't line up.

/// A resolved, concrete dependency version.
///
/// `Unknown` stands in for a dependency whose version could not be pinned to a
/// real triple (e.g. a git dependency left at its default HEAD); it is treated
/// as compatible with every range, matching how the resolver already leaves
/// such dependencies unchecked in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Unknown,
    Concrete(u64, u64, u64),
}

impl Version {
    /// Parse a concrete version string (`"*"` or `N[.M[.P]]`).
    ///
    /// # Errors
    /// Returns an error if the string is not `"*"` and not a dot-separated
    /// sequence of up to three non-negative integers.
    pub fn parse(raw: &str) -> Result<Self, SemverError> {
        let raw = raw.trim();
        if raw == "*" {
            return Ok(Self::Unknown);
        }
        let (major, minor, patch) = parse_triple(raw)?;
        Ok(Self::Concrete(major, minor.unwrap_or(0), patch.unwrap_or(0)))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "*"),
            Self::Concrete(major, minor, patch) => write!(f, "{major}.{minor}.{patch}"),
        }
    }
}

/// A semver range as written in a manifest's `version` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Range {
    /// `*` — matches anything.
    Any,
    /// `N` — `>=N.0.0, <N+1.0.0`.
    Major(u64),
    /// `N.M` — `>=N.M.0, <N.M+1.0`.
    MajorMinor(u64, u64),
    /// `N.M.P` — exact match.
    Exact(u64, u64, u64),
}

impl Range {
    /// Parse a range string.
    ///
    /// # Errors
    /// Returns an error if the string is not `"*"` and not a dot-separated
    /// sequence of up to three non-negative integers.
    pub fn parse(raw: &str) -> Result<Self, SemverError> {
        let raw = raw.trim();
        if raw == "*" {
            return Ok(Self::Any);
        }
        let (major, minor, patch) = parse_triple(raw)?;
        Ok(match (minor, patch) {
            (None, _) => Self::Major(major),
            (Some(minor), None) => Self::MajorMinor(major, minor),
            (Some(minor), Some(patch)) => Self::Exact(major, minor, patch),
        })
    }

    /// Returns whether `version` satisfies this range.
    ///
    /// An [`Version::Unknown`] version satisfies every range: it stands for a
    /// dependency whose concrete version could not be determined.
    pub fn matches(self, version: Version) -> bool {
        let Version::Concrete(maj, min, patch) = version else {
            return true;
        };
        match self {
            Self::Any => true,
            Self::Major(n) => maj == n,
            Self::MajorMinor(n, m) => maj == n && min == m,
            Self::Exact(n, m, p) => maj == n && min == m && patch == p,
        }
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Major(n) => write!(f, "{n}"),
            Self::MajorMinor(n, m) => write!(f, "{n}.{m}"),
            Self::Exact(n, m, p) => write!(f, "{n}.{m}.{p}"),
        }
    }
}

fn parse_triple(raw: &str) -> Result<(u64, Option<u64>, Option<u64>), SemverError> {
    let mut parts = raw.split('.');
    let invalid = || SemverError::Invalid {
        token: raw.to_owned(),
    };
    let major: u64 = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
    let minor = parts.next().map(str::parse).transpose().map_err(|_| invalid())?;
    let patch = parts.next().map(str::parse).transpose().map_err(|_| invalid())?;
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok((major, minor, patch))
}

/// Scan a git log line for a version token introduced by `v`, `ver`, or
/// `version` (case-insensitive), returning the parsed version if one is found.
///
/// Matches flymake's rule for discovering version-tagged commits: the token
/// must immediately follow one of the three prefixes with no separator other
/// than an optional `.`/`-`/space, e.g. `v1.2.3`, `version 1.2`, `ver-2`.
pub fn scan_version_token(line: &str) -> Option<(u64, u64, u64)> {
    for word in line.split_whitespace() {
        for prefix in ["version", "ver", "v"] {
            let Some(rest) = strip_prefix_ci(word, prefix) else {
                continue;
            };
            let rest = rest.trim_start_matches(['-', '.', ' ']);
            if rest.is_empty() {
                continue;
            }
            if let Ok(Version::Concrete(major, minor, patch)) = Version::parse(rest) {
                return Some((major, minor, patch));
            }
        }
    }
    None
}

fn strip_prefix_ci<'a>(word: &'a str, prefix: &str) -> Option<&'a str> {
    let word_lower_prefix = word.get(..prefix.len())?;
    word_lower_prefix
        .eq_ignore_ascii_case(prefix)
        .then(|| word.get(prefix.len()..))
        .flatten()
}

/// Errors from parsing a version or range string.
#[derive(Debug, thiserror::Error)]
pub enum SemverError {
    #[error("invalid semver token `{token}`, expected `*` or `N[.M[.P]]`")]
    Invalid { token: String },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_any_version_and_range() {
        assert_eq!(Version::parse("*").unwrap(), Version::Unknown);
        assert_eq!(Range::parse("*").unwrap(), Range::Any);
    }

    #[test]
    fn parse_major_only() {
        assert_eq!(Range::parse("1").unwrap(), Range::Major(1));
        assert_eq!(Version::parse("1").unwrap(), Version::Concrete(1, 0, 0));
    }

    #[test]
    fn parse_major_minor() {
        assert_eq!(Range::parse("1.2").unwrap(), Range::MajorMinor(1, 2));
    }

    #[test]
    fn parse_full_triple() {
        assert_eq!(Range::parse("1.2.3").unwrap(), Range::Exact(1, 2, 3));
        assert_eq!(Version::parse("1.2.3").unwrap(), Version::Concrete(1, 2, 3));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Range::parse("abc").is_err());
        assert!(Range::parse("1.2.3.4").is_err());
        assert!(Range::parse("").is_err());
        assert!(Range::parse("1.").is_err());
    }

    #[test]
    fn major_range_matches_any_minor_patch() {
        let range = Range::parse("1").unwrap();
        assert!(range.matches(Version::Concrete(1, 0, 0)));
        assert!(range.matches(Version::Concrete(1, 9, 9)));
        assert!(!range.matches(Version::Concrete(2, 0, 0)));
    }

    #[test]
    fn major_minor_range_matches_any_patch() {
        let range = Range::parse("1.2").unwrap();
        assert!(range.matches(Version::Concrete(1, 2, 0)));
        assert!(range.matches(Version::Concrete(1, 2, 7)));
        assert!(!range.matches(Version::Concrete(1, 3, 0)));
    }

    #[test]
    fn exact_range_matches_only_exact() {
        let range = Range::parse("1.2.3").unwrap();
        assert!(range.matches(Version::Concrete(1, 2, 3)));
        assert!(!range.matches(Version::Concrete(1, 2, 4)));
    }

    #[test]
    fn any_range_matches_everything() {
        assert!(Range::Any.matches(Version::Concrete(9, 9, 9)));
        assert!(Range::Any.matches(Version::Unknown));
    }

    #[test]
    fn unknown_version_satisfies_every_range() {
        assert!(Range::parse("1.2.3").unwrap().matches(Version::Unknown));
    }

    #[test]
    fn scan_version_token_finds_v_prefix() {
        assert_eq!(scan_version_token("abc123 v1.2.3 release"), Some((1, 2, 3)));
    }

    #[test]
    fn scan_version_token_finds_version_word_case_insensitive() {
        assert_eq!(scan_version_token("abc123 Version-2.0 cut"), Some((2, 0, 0)));
        assert_eq!(scan_version_token("abc123 VER.3 cut"), Some((3, 0, 0)));
    }

    #[test]
    fn scan_version_token_none_when_absent() {
        assert_eq!(scan_version_token("abc123 fix a bug"), None);
    }

    #[test]
    fn display_round_trips() {
        assert_eq!(Range::parse("1.2").unwrap().to_string(), "1.2");
        assert_eq!(Version::parse("1.2.3").unwrap().to_string(), "1.2.3");
        assert_eq!(Version::parse("*").unwrap().to_string(), "*");
    }
}
