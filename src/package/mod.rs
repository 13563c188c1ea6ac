//! Versioned command packages
//!
//! - `spec`: validated package requests
//! - `version`: semver selection against a registry
//! - `store`: on-disk cache layout
//! - `installer`: materializes one version into the store
//! - `manager`: resolve, check, install or update

pub mod installer;
pub mod manager;
pub mod spec;
pub mod store;
pub mod version;

pub use installer::{InstallRequest, Installer, NpmInstaller};
pub use manager::{Outcome, PackageManager, ReadyPackage};
pub use spec::{PackageMode, PackageSpec, VersionSpec};
pub use store::{CacheEntry, PackageCache};
pub use version::{select_for_range, select_latest, VersionResolver};
