//! On-disk package store
//!
//! Each installed (name, version) pair owns one directory:
//!
//! ```text
//! {store_dir}/_{name with '/' replaced by '_'}@{version}@{name}
//! ```
//!
//! The layout matches the npminstall store format so existing caches are
//! reused as-is. Entries are never modified after publication; a newer
//! version gets a new entry and older ones stay behind.

use crate::error::{DxError, DxResult};
use crate::package::spec::{PackageMode, PackageSpec, VersionSpec};
use crate::package::version::VersionResolver;
use chrono::{DateTime, Utc};
use semver::Version;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Prefix of in-progress install directories inside a store
pub const STAGING_PREFIX: &str = ".staging-";

/// Cache entry path for a (name, version) pair
pub fn path_for(store_dir: &Path, name: &str, version: &Version) -> PathBuf {
    store_dir.join(format!("_{}@{}@{}", name.replace('/', "_"), version, name))
}

/// An installed package found in a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub name: String,
    pub version: Version,
    pub path: PathBuf,
    pub modified: Option<DateTime<Utc>>,
}

/// Cache-aware existence checks over package specs
#[derive(Clone)]
pub struct PackageCache {
    resolver: VersionResolver,
}

impl PackageCache {
    pub fn new(resolver: VersionResolver) -> Self {
        Self { resolver }
    }

    /// Whether the package described by `spec` is present on disk.
    ///
    /// In cache mode an unpinned spec is resolved against the registry
    /// first, so two calls may disagree if a release lands in between.
    /// Pin the spec to avoid that.
    pub async fn exists(&self, spec: &PackageSpec) -> DxResult<bool> {
        match spec.mode() {
            PackageMode::Direct => Ok(spec.target_path().exists()),
            PackageMode::Cache { store_dir } => {
                let version = match spec.pinned_version() {
                    Some(v) => v.clone(),
                    None => self.resolver.resolve(spec.name(), spec.version()).await?,
                };
                let path = path_for(store_dir, spec.name(), &version);
                debug!("Checking cache entry {}", path.display());
                Ok(path.is_dir())
            }
        }
    }

    /// Create the store directory and its parents if needed
    pub async fn ensure_store_dir(store_dir: &Path) -> DxResult<()> {
        fs::create_dir_all(store_dir)
            .await
            .map_err(|e| DxError::io(format!("creating store directory {}", store_dir.display()), e))
    }

    /// Highest cached version of `name` that satisfies `version`, without
    /// asking the registry
    pub async fn newest_cached(
        store_dir: &Path,
        name: &str,
        version: &VersionSpec,
    ) -> DxResult<Option<Version>> {
        Ok(Self::entries(store_dir)
            .await?
            .into_iter()
            .find(|e| e.name == name && version.matches(&e.version))
            .map(|e| e.version))
    }

    /// List the entries of a store, newest version first per name
    pub async fn entries(store_dir: &Path) -> DxResult<Vec<CacheEntry>> {
        let mut entries = Vec::new();

        let mut dir = match fs::read_dir(store_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => {
                return Err(DxError::io(
                    format!("reading store directory {}", store_dir.display()),
                    e,
                ))
            }
        };

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| DxError::io("reading store entry", e))?
        {
            let file_name = item.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.starts_with(STAGING_PREFIX) {
                continue;
            }

            if file_name.starts_with("_@") {
                // Scoped names nest one level: `_@s_n@1.0.0@@s/n`
                let mut nested = match fs::read_dir(item.path()).await {
                    Ok(nested) => nested,
                    Err(_) => continue,
                };
                while let Ok(Some(child)) = nested.next_entry().await {
                    if let Some(child_name) = child.file_name().to_str() {
                        let full = format!("{}/{}", file_name, child_name);
                        push_entry(&mut entries, &full, child.path()).await;
                    }
                }
            } else {
                push_entry(&mut entries, file_name, item.path()).await;
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name).then(b.version.cmp(&a.version)));
        Ok(entries)
    }
}

async fn push_entry(entries: &mut Vec<CacheEntry>, dir_name: &str, path: PathBuf) {
    let Some((name, version)) = parse_entry_name(dir_name) else {
        return;
    };
    let Ok(meta) = fs::metadata(&path).await else {
        return;
    };
    if !meta.is_dir() {
        return;
    }

    entries.push(CacheEntry {
        name,
        version,
        path,
        modified: meta.modified().ok().map(DateTime::<Utc>::from),
    });
}

/// Invert `path_for` on a store-relative entry name
pub fn parse_entry_name(dir_name: &str) -> Option<(String, Version)> {
    let rest = dir_name.strip_prefix('_')?;
    // Versions never contain '@'; a sanitized name only starts with one
    let scope_offset = usize::from(rest.starts_with('@'));
    let split = rest[scope_offset..].find('@')? + scope_offset;
    let (sanitized, rest) = (&rest[..split], &rest[split + 1..]);
    let (version, name) = rest.split_once('@')?;

    if name.is_empty() || sanitized != name.replace('/', "_") {
        return None;
    }

    let version = Version::parse(version).ok()?;
    Some((name.to_string(), version))
}
