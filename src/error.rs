//! Error types for dx
//!
//! All modules use `DxResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dx operations
pub type DxResult<T> = Result<T, DxError>;

/// Exit code for failures of the dispatcher itself (sysexits `EX_SOFTWARE`),
/// as opposed to failures reported by the invoked command.
pub const DISPATCH_FAILURE_EXIT_CODE: u8 = 70;

/// All errors that can occur in dx
#[derive(Error, Debug)]
pub enum DxError {
    // Registry errors
    #[error("Registry unreachable: {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Not found in registry: {0}")]
    NotFound(String),

    #[error("No published version of {package} satisfies {spec}")]
    VersionResolution { package: String, spec: String },

    // Install errors
    #[error("Failed to install {package}: {reason}")]
    InstallFailed { package: String, reason: String },

    // Dispatch errors
    #[error("No entry point in {path}: {reason}")]
    NoEntryPoint { path: PathBuf, reason: String },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command '{command}' exited with code {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("{runtime} {found} is too old, {required} or newer is required")]
    RuntimeTooOld {
        runtime: String,
        found: String,
        required: String,
    },

    // Request errors
    #[error("Invalid package request: {0}")]
    InvalidRequest(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Target path does not exist: {0}")]
    TargetPathMissing(PathBuf),

    #[error("Could not determine the user home directory")]
    HomeDirUnavailable,

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DxError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a registry transport error
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an install error
    pub fn install(package: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstallFailed {
            package: package.into(),
            reason: reason.into(),
        }
    }

    /// Create a spawn error
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Whether the dispatcher itself failed (as opposed to the command it ran)
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(self, Self::NoEntryPoint { .. } | Self::Spawn { .. })
    }

    /// Process exit code for this error.
    ///
    /// Command failures pass the child's code through unchanged so scripts
    /// wrapping dx can rely on it.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::CommandFailed { code, .. } => u8::try_from(*code)
                .ok()
                .filter(|c| *c != 0)
                .unwrap_or(1),
            e if e.is_dispatch_failure() => DISPATCH_FAILURE_EXIT_CODE,
            _ => 1,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Network { .. } => {
                Some("Check your connection, or set registry.use_mirror = true in the config")
            }
            Self::Spawn { .. } => Some("Is Node.js installed and on your PATH?"),
            Self::RuntimeTooOld { .. } => Some("Upgrade Node.js from https://nodejs.org"),
            Self::UnknownCommand(_) => Some("Map it to a package under [commands] in the config"),
            Self::HomeDirUnavailable => Some("Set DX_HOME to a writable directory"),
            _ => None,
        }
    }
}
