//! Validated package requests

use crate::error::{DxError, DxResult};
use semver::Version;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Requested version of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    /// Highest published version
    Latest,
    /// Exactly this version
    Exact(Version),
    /// Highest published version with the same major, at or above the base
    Compatible(Version),
}

impl VersionSpec {
    /// Whether this spec already names a concrete version
    pub fn is_pinned(&self) -> bool {
        matches!(self, Self::Exact(_))
    }

    /// Whether `version` satisfies this spec
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Latest => true,
            Self::Exact(v) => v == version,
            Self::Compatible(base) => version.major == base.major && version >= base,
        }
    }
}

impl FromStr for VersionSpec {
    type Err = DxError;

    fn from_str(s: &str) -> DxResult<Self> {
        let s = s.trim();
        if s.is_empty() || s == "latest" {
            return Ok(Self::Latest);
        }

        let invalid = |e: semver::Error| {
            DxError::InvalidRequest(format!(
                "version '{s}' must be 'latest', a semver version or ^version: {e}"
            ))
        };

        match s.strip_prefix('^') {
            Some(base) => Version::parse(base).map(Self::Compatible).map_err(invalid),
            None => Version::parse(s.trim_start_matches('v'))
                .map(Self::Exact)
                .map_err(invalid),
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => write!(f, "latest"),
            Self::Exact(v) => write!(f, "{}", v),
            Self::Compatible(v) => write!(f, "^{}", v),
        }
    }
}

/// Where a package lives on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageMode {
    /// Materialized directly at `target_path`; never installed by dx
    Direct,
    /// Managed in a store directory, one entry per (name, version)
    Cache { store_dir: PathBuf },
}

/// An immutable, validated request for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    name: String,
    version: VersionSpec,
    target_path: PathBuf,
    mode: PackageMode,
}

impl PackageSpec {
    /// Build a spec, validating name, version and paths.
    ///
    /// Cache mode is selected whenever `store_dir` is present and non-empty.
    pub fn new(
        name: &str,
        version: &str,
        target_path: impl Into<PathBuf>,
        store_dir: Option<PathBuf>,
    ) -> DxResult<Self> {
        validate_name(name)?;
        let version = version.parse::<VersionSpec>()?;

        let target_path = target_path.into();
        require_absolute("target path", &target_path)?;

        let mode = match store_dir.filter(|d| !d.as_os_str().is_empty()) {
            Some(store_dir) => {
                require_absolute("store directory", &store_dir)?;
                PackageMode::Cache { store_dir }
            }
            None => PackageMode::Direct,
        };

        Ok(Self {
            name: name.to_string(),
            version,
            target_path,
            mode,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &VersionSpec {
        &self.version
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn mode(&self) -> &PackageMode {
        &self.mode
    }

    /// Store directory in cache mode
    pub fn store_dir(&self) -> Option<&Path> {
        match &self.mode {
            PackageMode::Cache { store_dir } => Some(store_dir),
            PackageMode::Direct => None,
        }
    }

    /// The concrete version, if this spec is pinned
    pub fn pinned_version(&self) -> Option<&Version> {
        match &self.version {
            VersionSpec::Exact(v) => Some(v),
            _ => None,
        }
    }

    /// Copy of this spec pinned to `version`
    pub fn pinned(&self, version: Version) -> Self {
        Self {
            version: VersionSpec::Exact(version),
            ..self.clone()
        }
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

fn validate_name(name: &str) -> DxResult<()> {
    if name.is_empty() {
        return Err(DxError::InvalidRequest(
            "package name cannot be empty".to_string(),
        ));
    }
    if name.chars().any(|c| c.is_whitespace() || c == '\\' || c == '\0') {
        return Err(DxError::InvalidRequest(format!(
            "invalid package name '{}'",
            name
        )));
    }
    if name.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
        return Err(DxError::InvalidRequest(format!(
            "invalid package name '{}'",
            name
        )));
    }
    Ok(())
}

fn require_absolute(what: &str, path: &Path) -> DxResult<()> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(DxError::InvalidRequest(format!(
            "{} must be absolute: {}",
            what,
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_specs() {
        assert_eq!("latest".parse::<VersionSpec>().unwrap(), VersionSpec::Latest);
        assert_eq!("".parse::<VersionSpec>().unwrap(), VersionSpec::Latest);
        assert_eq!(
            "1.2.3".parse::<VersionSpec>().unwrap(),
            VersionSpec::Exact(Version::new(1, 2, 3))
        );
        assert_eq!(
            "^2.0.0".parse::<VersionSpec>().unwrap(),
            VersionSpec::Compatible(Version::new(2, 0, 0))
        );
        assert!("~1.0".parse::<VersionSpec>().is_err());
        assert!("next".parse::<VersionSpec>().is_err());
    }

    #[test]
    fn spec_matching() {
        let v = |s: &str| Version::parse(s).unwrap();
        assert!(VersionSpec::Latest.matches(&v("0.0.1")));
        assert!(VersionSpec::Exact(v("1.2.3")).matches(&v("1.2.3")));
        assert!(!VersionSpec::Exact(v("1.2.3")).matches(&v("1.2.4")));

        let caret = VersionSpec::Compatible(v("1.2.0"));
        assert!(caret.matches(&v("1.9.0")));
        assert!(!caret.matches(&v("1.1.0")));
        assert!(!caret.matches(&v("2.0.0")));
    }

    #[test]
    fn store_dir_selects_cache_mode() {
        let spec = PackageSpec::new("axios", "latest", "/t", Some(PathBuf::from("/t/node_modules")))
            .unwrap();
        assert_eq!(spec.store_dir(), Some(Path::new("/t/node_modules")));

        let spec = PackageSpec::new("axios", "latest", "/t", None).unwrap();
        assert_eq!(spec.mode(), &PackageMode::Direct);

        let spec = PackageSpec::new("axios", "latest", "/t", Some(PathBuf::new())).unwrap();
        assert_eq!(spec.mode(), &PackageMode::Direct);
    }

    #[test]
    fn rejects_bad_names() {
        assert!(PackageSpec::new("", "latest", "/t", None).is_err());
        assert!(PackageSpec::new("has space", "latest", "/t", None).is_err());
        assert!(PackageSpec::new("../escape", "latest", "/t", None).is_err());
        assert!(PackageSpec::new("@scope/", "latest", "/t", None).is_err());
        assert!(PackageSpec::new("@scope/name", "latest", "/t", None).is_ok());
    }

    #[test]
    fn rejects_relative_paths() {
        assert!(PackageSpec::new("axios", "latest", "relative", None).is_err());
        assert!(
            PackageSpec::new("axios", "latest", "/t", Some(PathBuf::from("store"))).is_err()
        );
    }

    #[test]
    fn pinning_leaves_original_untouched() {
        let spec = PackageSpec::new("axios", "latest", "/t", None).unwrap();
        let pinned = spec.pinned(Version::new(1, 6, 0));

        assert!(spec.pinned_version().is_none());
        assert_eq!(pinned.pinned_version(), Some(&Version::new(1, 6, 0)));
        assert_eq!(pinned.to_string(), "axios@1.6.0");
        assert_eq!(pinned.name(), spec.name());
    }
}
