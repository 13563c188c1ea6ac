//! Version selection over published versions
//!
//! Ordering is always semver precedence, never string order or publish
//! time. Candidates that do not parse as semver are ignored.

use crate::error::{DxError, DxResult};
use crate::package::spec::VersionSpec;
use crate::registry::Registry;
use semver::Version;
use std::sync::Arc;
use tracing::debug;

fn parse_all<S: AsRef<str>>(candidates: &[S]) -> impl Iterator<Item = Version> + '_ {
    candidates
        .iter()
        .filter_map(|c| Version::parse(c.as_ref().trim()).ok())
}

/// Versions compatible with `base` (same major, `>= base`), highest first.
pub fn select_for_range<S: AsRef<str>>(base: &Version, candidates: &[S]) -> Vec<Version> {
    let mut selected: Vec<Version> = parse_all(candidates)
        .filter(|v| v.major == base.major && v >= base)
        .collect();
    selected.sort_by(|a, b| b.cmp(a));
    selected.dedup();
    selected
}

/// Highest version by semver precedence, if any
pub fn select_latest<S: AsRef<str>>(candidates: &[S]) -> Option<Version> {
    parse_all(candidates).max()
}

/// Resolves version specs against a registry
#[derive(Clone)]
pub struct VersionResolver {
    registry: Arc<dyn Registry>,
}

impl VersionResolver {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    /// Highest published version of `name`
    pub async fn latest(&self, name: &str) -> DxResult<Version> {
        let versions = self.registry.list_versions(name).await?;
        select_latest(&versions).ok_or_else(|| DxError::NotFound(name.to_string()))
    }

    /// Pick one concrete, published version for `spec`
    pub async fn resolve(&self, name: &str, spec: &VersionSpec) -> DxResult<Version> {
        let version = match spec {
            VersionSpec::Latest => self.latest(name).await?,
            VersionSpec::Exact(version) => {
                let versions = self.registry.list_versions(name).await?;
                if !parse_all(&versions).any(|v| v == *version) {
                    return Err(DxError::NotFound(format!("{name}@{version}")));
                }
                version.clone()
            }
            VersionSpec::Compatible(base) => {
                let versions = self.registry.list_versions(name).await?;
                if versions.is_empty() {
                    return Err(DxError::NotFound(name.to_string()));
                }
                select_for_range(base, &versions)
                    .into_iter()
                    .next()
                    .ok_or_else(|| DxError::VersionResolution {
                        package: name.to_string(),
                        spec: spec.to_string(),
                    })?
            }
        };

        debug!("Resolved {}@{} to {}", name, spec, version);
        Ok(version)
    }
}
