//! Package lifecycle: resolve, check the cache, then install or update
//!
//! `PackageManager::prepare` is the single entry point the CLI uses. It pins
//! the requested spec to one concrete version for the rest of the
//! invocation, so the registry is consulted at most once per decision.

use crate::error::{DxError, DxResult};
use crate::package::installer::{InstallRequest, Installer};
use crate::package::spec::{PackageMode, PackageSpec};
use crate::package::store::{self, PackageCache};
use crate::package::version::VersionResolver;
use semver::Version;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// What `prepare` had to do before the package was usable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The resolved version was already cached (or direct mode)
    Ready,
    /// The resolved version was installed
    Installed,
    /// A newer version replaced the cached one for this invocation
    Updated,
}

/// A package that is present on disk and ready to dispatch
#[derive(Debug, Clone)]
pub struct ReadyPackage {
    /// Spec pinned to the version in use (unchanged in direct mode)
    pub spec: PackageSpec,
    /// Cache entry, or the target path in direct mode
    pub path: PathBuf,
    /// Version in use; unknown in direct mode
    pub version: Option<Version>,
    pub outcome: Outcome,
}

/// Orchestrates version resolution, cache lookups and installs
pub struct PackageManager {
    resolver: VersionResolver,
    cache: PackageCache,
    installer: Arc<dyn Installer>,
}

impl PackageManager {
    pub fn new(resolver: VersionResolver, installer: Arc<dyn Installer>) -> Self {
        Self {
            cache: PackageCache::new(resolver.clone()),
            resolver,
            installer,
        }
    }

    /// Make the package described by `spec` available on disk.
    ///
    /// A cached version satisfying the spec is used as-is unless `update` is
    /// set, in which case it is refreshed to the newest version the spec
    /// allows. Without a cached version the spec is resolved against the
    /// registry and installed. Any failure aborts the flow; nothing is
    /// retried.
    pub async fn prepare(&self, spec: &PackageSpec, update: bool) -> DxResult<ReadyPackage> {
        let store_dir = match spec.mode() {
            PackageMode::Direct => return Self::prepare_direct(spec),
            PackageMode::Cache { store_dir } => store_dir,
        };

        let cached = match spec.pinned_version() {
            Some(_) => None,
            None => PackageCache::newest_cached(store_dir, spec.name(), spec.version()).await?,
        };

        if let Some(current) = cached {
            if !update {
                debug!("Using cached {}@{}", spec.name(), current);
                return self.ready(spec.pinned(current), Outcome::Ready);
            }

            let updated = self.update(spec, &current).await?;
            let outcome = if updated.pinned_version() == Some(&current) {
                Outcome::Ready
            } else {
                Outcome::Updated
            };
            return self.ready(updated, outcome);
        }

        let version = match spec.pinned_version() {
            Some(version) => version.clone(),
            None => self.resolver.resolve(spec.name(), spec.version()).await?,
        };
        let pinned = spec.pinned(version);

        if self.cache.exists(&pinned).await? {
            debug!("{} is cached", pinned);
            return self.ready(pinned, Outcome::Ready);
        }

        self.install(&pinned).await?;
        self.ready(pinned, Outcome::Installed)
    }

    /// Install a pinned spec into its cache entry.
    ///
    /// A failed install leaves the destination alone. Installers never write
    /// there until they publish, so anything present came from a concurrent
    /// install that succeeded.
    pub async fn install(&self, spec: &PackageSpec) -> DxResult<PathBuf> {
        let (store_dir, version) = match (spec.store_dir(), spec.pinned_version()) {
            (Some(store_dir), Some(version)) => (store_dir, version),
            _ => {
                return Err(DxError::Internal(format!(
                    "install requires a pinned cache-mode spec, got {spec}"
                )))
            }
        };

        PackageCache::ensure_store_dir(store_dir).await?;
        let destination = store::path_for(store_dir, spec.name(), version);
        let request = InstallRequest {
            root: spec.target_path().to_path_buf(),
            store_dir: store_dir.to_path_buf(),
            name: spec.name().to_string(),
            version: version.clone(),
            registry: self.resolver.registry().base_url().to_string(),
            destination: destination.clone(),
        };

        info!("Installing {}", spec);
        if let Err(e) = self.installer.install(&request).await {
            return Err(match e {
                e @ (DxError::InstallFailed { .. } | DxError::Network { .. }) => e,
                other => DxError::install(request.package(), other.to_string()),
            });
        }

        if !destination.is_dir() {
            return Err(DxError::install(
                request.package(),
                format!("installer did not create {}", destination.display()),
            ));
        }

        Ok(destination)
    }

    /// Re-resolve the unpinned `spec` and install the result if it is not
    /// cached yet. Returns `spec` pinned to the version now in use.
    ///
    /// Exact specs never move. Calling this twice in a row installs at most
    /// once.
    pub async fn update(&self, spec: &PackageSpec, current: &Version) -> DxResult<PackageSpec> {
        if spec.version().is_pinned() {
            return Ok(spec.pinned(current.clone()));
        }

        let newest = self.resolver.resolve(spec.name(), spec.version()).await?;
        if newest <= *current {
            debug!("{}@{} is up to date", spec.name(), current);
            return Ok(spec.pinned(current.clone()));
        }

        let pinned = spec.pinned(newest);
        if !self.cache.exists(&pinned).await? {
            info!("Updating {} from {}", pinned, current);
            self.install(&pinned).await?;
        }
        Ok(pinned)
    }

    fn ready(&self, spec: PackageSpec, outcome: Outcome) -> DxResult<ReadyPackage> {
        let (store_dir, version) = match (spec.store_dir(), spec.pinned_version()) {
            (Some(store_dir), Some(version)) => (store_dir.to_path_buf(), version.clone()),
            _ => return Err(DxError::Internal(format!("{spec} is not pinned"))),
        };
        Ok(ReadyPackage {
            path: store::path_for(&store_dir, spec.name(), &version),
            version: Some(version),
            spec,
            outcome,
        })
    }

    fn prepare_direct(spec: &PackageSpec) -> DxResult<ReadyPackage> {
        let target = spec.target_path();
        if !target.exists() {
            return Err(DxError::TargetPathMissing(target.to_path_buf()));
        }
        debug!("Using {} from {}", spec.name(), target.display());
        Ok(ReadyPackage {
            spec: spec.clone(),
            path: target.to_path_buf(),
            version: None,
            outcome: Outcome::Ready,
        })
    }
}
