//! Configuration schema for dx
//!
//! Configuration is stored at `~/.config/dx/config.toml`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default npm registry
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Fallback mirror, used when `registry.use_mirror` is set
pub const MIRROR_REGISTRY: &str = "https://registry.npmmirror.com/";

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Registry settings
    pub registry: RegistryConfig,

    /// Installer settings
    pub installer: InstallerConfig,

    /// Child process settings
    pub dispatch: DispatchConfig,

    /// Command name to package mapping
    pub commands: BTreeMap<String, CommandConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let mut commands = BTreeMap::new();
        commands.insert(
            "init".to_string(),
            CommandConfig {
                package: "@dx-cli-dev/init".to_string(),
                version: "latest".to_string(),
            },
        );

        Self {
            general: GeneralConfig::default(),
            registry: RegistryConfig::default(),
            installer: InstallerConfig::default(),
            dispatch: DispatchConfig::default(),
            commands,
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Cache root (defaults to `~/.dx-cli`)
    pub home: Option<PathBuf>,

    /// Log format: "text" or "json"
    pub log_format: String,

    /// Warn when a newer compatible dx release is published
    pub update_check: bool,

    /// Registry name dx itself is published under
    pub self_package: String,

    /// Refresh cached command packages to their newest version before running
    pub auto_update: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            home: None,
            log_format: "text".to_string(),
            update_check: true,
            self_package: "@dx-cli-dev/core".to_string(),
            auto_update: true,
        }
    }
}

/// Registry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry base URL
    pub url: String,

    /// Mirror base URL
    pub mirror: String,

    /// Use the mirror instead of `url`
    pub use_mirror: bool,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REGISTRY.to_string(),
            mirror: MIRROR_REGISTRY.to_string(),
            use_mirror: false,
            timeout_secs: 30,
        }
    }
}

/// Installer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// npm-compatible executable used to fetch packages
    pub program: String,

    /// Abort an install after this many seconds
    pub timeout_secs: u64,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            program: "npm".to_string(),
            timeout_secs: 600,
        }
    }
}

/// Child process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Runtime executable that loads command packages
    pub runtime: String,

    /// Lowest accepted runtime version
    pub min_runtime_version: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            runtime: "node".to_string(),
            min_runtime_version: "12.0.0".to_string(),
        }
    }
}

/// A package-backed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Registry package name
    pub package: String,

    /// "latest", an exact version, or a caret range
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "latest".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[registry]"));
        assert!(toml.contains("[commands.init]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.registry.url, DEFAULT_REGISTRY);
        assert_eq!(config.dispatch.runtime, "node");
        assert!(config.commands.contains_key("init"));
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [registry]
            use_mirror = true

            [commands.init]
            package = "@acme/init"

            [commands.lint]
            package = "@acme/lint"
            version = "^2.1.0"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.registry.use_mirror);
        assert_eq!(config.registry.timeout_secs, 30); // default preserved
        assert_eq!(config.commands["init"].package, "@acme/init");
        assert_eq!(config.commands["init"].version, "latest");
        assert_eq!(config.commands["lint"].version, "^2.1.0");
    }
}
