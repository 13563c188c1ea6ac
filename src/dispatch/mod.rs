//! Command dispatch
//!
//! Hands a prepared package to the runtime in a child process: find the
//! entry module, serialize the invocation, spawn a constant loader program
//! and turn the child's exit status into a result.

mod bootstrap;
mod entry;
mod exec;
mod options;
mod runtime;

pub use bootstrap::{BOOTSTRAP, ENTRY_ENV, INVOCATION_ENV, NOT_CALLABLE_EXIT_CODE, REPORT_ENV};
pub use entry::locate_entry_point;
pub use exec::exit_code;
pub use options::CommandOptions;
pub use runtime::parse_runtime_version;

use crate::error::DxResult;
use semver::Version;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Launches package entry points under a runtime such as `node`
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    runtime: String,
    min_version: Version,
}

impl CommandDispatcher {
    pub fn new(runtime: impl Into<String>, min_version: Version) -> Self {
        Self {
            runtime: runtime.into(),
            min_version,
        }
    }

    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    /// Verify the runtime exists and is new enough
    pub async fn check_runtime(&self) -> DxResult<Version> {
        runtime::check_runtime(&self.runtime, &self.min_version).await
    }

    /// Entry module of the package at `resolved`
    pub fn locate_entry_point(&self, resolved: &Path) -> DxResult<PathBuf> {
        entry::locate_entry_point(resolved)
    }

    /// Run `entry` with `options` and wait for it
    pub async fn invoke(
        &self,
        entry: &Path,
        options: &CommandOptions,
        env: &BTreeMap<String, String>,
    ) -> DxResult<()> {
        exec::invoke(&self.runtime, entry, options, env).await
    }
}
