//! Package registry access
//!
//! The core only needs one thing from a registry: the set of published
//! version strings for a package name. `Registry` is the seam the package
//! manager depends on; `HttpRegistry` talks to an npm-compatible server.

mod http;

pub use http::{package_url, HttpRegistry};

use crate::error::{DxError, DxResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Package metadata document (`GET {registry}/{name}`).
///
/// Only the version map is read. Tags such as `latest` are ignored: dx picks
/// versions itself from the published list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    /// Version string to per-version manifest
    #[serde(default)]
    pub versions: BTreeMap<String, serde_json::Value>,
}

impl Metadata {
    /// Published version strings
    pub fn version_strings(&self) -> Vec<String> {
        self.versions.keys().cloned().collect()
    }
}

/// Read access to a package registry
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch the metadata document for a package.
    ///
    /// Fails with `NotFound` when the registry has no such package and with
    /// `Network` when the registry could not be reached.
    async fn fetch_metadata(&self, name: &str) -> DxResult<Metadata>;

    /// Base URL, handed to the installer so both talk to the same registry
    fn base_url(&self) -> &str;

    /// Published version strings; empty for an unknown package
    async fn list_versions(&self, name: &str) -> DxResult<Vec<String>> {
        match self.fetch_metadata(name).await {
            Ok(metadata) => Ok(metadata.version_strings()),
            Err(DxError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory registry for unit tests

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Registry backed by a mutable map; counts metadata requests
    #[derive(Default)]
    pub struct FakeRegistry {
        packages: Mutex<HashMap<String, Vec<String>>>,
        offline: Mutex<bool>,
        pub requests: AtomicUsize,
    }

    impl FakeRegistry {
        pub fn with_package(name: &str, versions: &[&str]) -> Self {
            let registry = Self::default();
            registry.publish(name, versions);
            registry
        }

        pub fn publish(&self, name: &str, versions: &[&str]) {
            let mut packages = self.packages.lock().unwrap();
            let entry = packages.entry(name.to_string()).or_default();
            entry.extend(versions.iter().map(|v| v.to_string()));
        }

        pub fn set_offline(&self, offline: bool) {
            *self.offline.lock().unwrap() = offline;
        }
    }

    #[async_trait]
    impl Registry for FakeRegistry {
        async fn fetch_metadata(&self, name: &str) -> DxResult<Metadata> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if *self.offline.lock().unwrap() {
                return Err(DxError::network("fake://registry", "offline"));
            }

            let packages = self.packages.lock().unwrap();
            let versions = packages
                .get(name)
                .ok_or_else(|| DxError::NotFound(name.to_string()))?;

            Ok(Metadata {
                versions: versions
                    .iter()
                    .map(|v| (v.clone(), serde_json::json!({ "version": v })))
                    .collect(),
            })
        }

        fn base_url(&self) -> &str {
            "fake://registry/"
        }
    }
}
