//! Self-update notice
//!
//! dx is itself published to the registry. Before dispatching, it looks for
//! a newer release with the same major version and tells the user about it.
//! The check never blocks a command: failures are logged and ignored.

use crate::error::{DxError, DxResult};
use crate::package::select_for_range;
use crate::registry::Registry;
use semver::Version;
use tracing::debug;

/// Version of the running binary
pub fn current_version() -> DxResult<Version> {
    Version::parse(env!("CARGO_PKG_VERSION"))
        .map_err(|e| DxError::Internal(format!("bad package version: {e}")))
}

/// Newest compatible release of `package` above `current`, if any
pub async fn newer_release(
    registry: &dyn Registry,
    package: &str,
    current: &Version,
) -> DxResult<Option<Version>> {
    let versions = registry.list_versions(package).await?;
    let newest = select_for_range(current, &versions)
        .into_iter()
        .next()
        .filter(|v| v > current);
    debug!("Update check for {}: {:?}", package, newest);
    Ok(newest)
}

/// Same as `newer_release`, but never fails
pub async fn check_quietly(registry: &dyn Registry, package: &str) -> Option<Version> {
    let current = current_version().ok()?;
    match newer_release(registry, package, &current).await {
        Ok(newest) => newest,
        Err(e) => {
            debug!("Update check skipped: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::testing::FakeRegistry;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[tokio::test]
    async fn reports_newer_compatible_release() {
        let registry = FakeRegistry::with_package("@dx-cli-dev/core", &["1.0.0", "1.2.0", "2.0.0"]);
        let newest = newer_release(&registry, "@dx-cli-dev/core", &v("1.0.0"))
            .await
            .unwrap();
        assert_eq!(newest, Some(v("1.2.0")));
    }

    #[tokio::test]
    async fn up_to_date_reports_nothing() {
        let registry = FakeRegistry::with_package("@dx-cli-dev/core", &["1.0.0", "2.0.0"]);
        let newest = newer_release(&registry, "@dx-cli-dev/core", &v("1.0.0"))
            .await
            .unwrap();
        assert_eq!(newest, None);
    }

    #[tokio::test]
    async fn unpublished_package_reports_nothing() {
        let registry = FakeRegistry::default();
        assert_eq!(
            newer_release(&registry, "@dx-cli-dev/core", &v("1.0.0"))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn quiet_check_swallows_network_errors() {
        let registry = FakeRegistry::with_package("@dx-cli-dev/core", &["99.0.0"]);
        registry.set_offline(true);
        assert_eq!(check_quietly(&registry, "@dx-cli-dev/core").await, None);
    }

    #[test]
    fn current_version_parses() {
        assert_eq!(current_version().unwrap().to_string(), env!("CARGO_PKG_VERSION"));
    }
}
