//! Resolved runtime settings
//!
//! `Settings` is built once in `main` from the config file and the
//! command-line/environment overrides, then passed to each component.

use crate::config::Config;
use crate::error::{DxError, DxResult};
use semver::Version;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name of the default cache root, relative to the user's home
pub const DEFAULT_HOME_DIR: &str = ".dx-cli";

/// Subdirectory of the cache root that holds installed command packages
pub const DEPENDENCIES_DIR: &str = "dependencies";

/// Values supplied on the command line or through `DX_*` variables
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub home: Option<PathBuf>,
    pub target_path: Option<PathBuf>,
    pub registry: Option<String>,
}

/// Explicit configuration consumed by the package core and dispatcher
#[derive(Debug, Clone)]
pub struct Settings {
    /// Cache root
    pub home: PathBuf,

    /// Forces direct mode when set
    pub target_path: Option<PathBuf>,

    /// Registry base URL
    pub registry_url: String,

    /// Registry request timeout
    pub timeout: Duration,

    /// npm-compatible installer executable
    pub installer_program: String,

    /// Installer time limit
    pub install_timeout: Duration,

    /// Runtime that loads command packages
    pub runtime: String,

    /// Lowest accepted runtime version
    pub min_runtime_version: Version,
}

impl Settings {
    /// Fold the config file and overrides into one settings value.
    ///
    /// Relative override paths are resolved against `cwd`.
    pub fn resolve(config: &Config, overrides: &Overrides, cwd: &Path) -> DxResult<Self> {
        let home = match overrides.home.as_ref().or(config.general.home.as_ref()) {
            Some(path) => absolutize(path, cwd),
            None => dirs::home_dir()
                .ok_or(DxError::HomeDirUnavailable)?
                .join(DEFAULT_HOME_DIR),
        };

        let target_path = overrides
            .target_path
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| absolutize(p, cwd));

        let registry_url = match &overrides.registry {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ if config.registry.use_mirror => config.registry.mirror.clone(),
            _ => config.registry.url.clone(),
        };

        let min_runtime_version = Version::parse(&config.dispatch.min_runtime_version)
            .map_err(|e| DxError::ConfigInvalid {
                path: PathBuf::from("dispatch.min_runtime_version"),
                reason: e.to_string(),
            })?;

        Ok(Self {
            home,
            target_path,
            registry_url,
            timeout: Duration::from_secs(config.registry.timeout_secs.max(1)),
            installer_program: config.installer.program.clone(),
            install_timeout: Duration::from_secs(config.installer.timeout_secs.max(1)),
            runtime: config.dispatch.runtime.clone(),
            min_runtime_version,
        })
    }

    /// Install root used in cache mode
    pub fn dependencies_dir(&self) -> PathBuf {
        self.home.join(DEPENDENCIES_DIR)
    }

    /// Store directory used in cache mode
    pub fn store_dir(&self) -> PathBuf {
        self.dependencies_dir().join("node_modules")
    }
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{DEFAULT_REGISTRY, MIRROR_REGISTRY};

    fn cwd() -> PathBuf {
        PathBuf::from("/work")
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = Config::default();
        config.general.home = Some(PathBuf::from("/from/config"));

        let overrides = Overrides {
            home: Some(PathBuf::from("/from/flag")),
            target_path: None,
            registry: Some("http://localhost:4873/".to_string()),
        };
        let settings = Settings::resolve(&config, &overrides, &cwd()).unwrap();

        assert_eq!(settings.home, PathBuf::from("/from/flag"));
        assert_eq!(settings.registry_url, "http://localhost:4873/");
    }

    #[test]
    fn store_layout_under_home() {
        let overrides = Overrides {
            home: Some(PathBuf::from("/h")),
            ..Default::default()
        };
        let settings = Settings::resolve(&Config::default(), &overrides, &cwd()).unwrap();

        assert_eq!(settings.dependencies_dir(), PathBuf::from("/h/dependencies"));
        assert_eq!(
            settings.store_dir(),
            PathBuf::from("/h/dependencies/node_modules")
        );
    }

    #[test]
    fn relative_target_path_is_absolutized() {
        let overrides = Overrides {
            home: Some(PathBuf::from("/h")),
            target_path: Some(PathBuf::from("local/pkg")),
            registry: None,
        };
        let settings = Settings::resolve(&Config::default(), &overrides, &cwd()).unwrap();
        assert_eq!(settings.target_path, Some(PathBuf::from("/work/local/pkg")));
    }

    #[test]
    fn empty_target_path_means_cache_mode() {
        let overrides = Overrides {
            home: Some(PathBuf::from("/h")),
            target_path: Some(PathBuf::new()),
            registry: None,
        };
        let settings = Settings::resolve(&Config::default(), &overrides, &cwd()).unwrap();
        assert!(settings.target_path.is_none());
    }

    #[test]
    fn mirror_selected_from_config() {
        let overrides = Overrides {
            home: Some(PathBuf::from("/h")),
            ..Default::default()
        };
        let mut config = Config::default();
        let settings = Settings::resolve(&config, &overrides, &cwd()).unwrap();
        assert_eq!(settings.registry_url, DEFAULT_REGISTRY);

        config.registry.use_mirror = true;
        let settings = Settings::resolve(&config, &overrides, &cwd()).unwrap();
        assert_eq!(settings.registry_url, MIRROR_REGISTRY);
    }

    #[test]
    fn invalid_min_runtime_version_rejected() {
        let overrides = Overrides {
            home: Some(PathBuf::from("/h")),
            ..Default::default()
        };
        let mut config = Config::default();
        config.dispatch.min_runtime_version = "twelve".to_string();
        assert!(matches!(
            Settings::resolve(&config, &overrides, &cwd()),
            Err(DxError::ConfigInvalid { .. })
        ));
    }
}
