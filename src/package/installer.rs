//! Installer primitive
//!
//! dx does not fetch or unpack tarballs itself. An `Installer` materializes
//! one (name, version) pair into its cache entry; the default implementation
//! delegates to an npm-compatible executable.
//!
//! `NpmInstaller` never writes to the destination directly. It installs into
//! a uniquely named staging directory inside the store and publishes the
//! result with a single rename, so a crashed or failed install leaves no
//! half-written entry behind and concurrent installs of the same pair
//! cannot corrupt each other.

use crate::error::{DxError, DxResult};
use crate::package::store::{PackageCache, STAGING_PREFIX};
use crate::process::{error_tail, stream_child_output};
use async_trait::async_trait;
use semver::Version;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything an installer needs to materialize one package version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Install root (`targetPath`)
    pub root: PathBuf,
    /// Store directory holding cache entries
    pub store_dir: PathBuf,
    pub name: String,
    pub version: Version,
    /// Registry base URL
    pub registry: String,
    /// Cache entry to create
    pub destination: PathBuf,
}

impl InstallRequest {
    /// `name@version`, as installers expect it
    pub fn package(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// Materializes a package version into its cache entry
#[async_trait]
pub trait Installer: Send + Sync {
    /// Create `request.destination`.
    ///
    /// Implementations build the package elsewhere and publish it with one
    /// rename. On error they must not have touched the destination: whatever
    /// is there belongs to another process.
    async fn install(&self, request: &InstallRequest) -> DxResult<()>;
}

/// Receives installer output line by line
pub type OutputSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Installer that shells out to `npm install`
#[derive(Clone)]
pub struct NpmInstaller {
    program: String,
    timeout: Duration,
    on_output: Option<OutputSink>,
}

impl NpmInstaller {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            on_output: None,
        }
    }

    /// Also send npm output to `sink` (it always goes to the debug log)
    pub fn with_output(mut self, sink: OutputSink) -> Self {
        self.on_output = Some(sink);
        self
    }

    /// Run npm inside the staging directory
    async fn run_npm(&self, staging: &Path, request: &InstallRequest) -> DxResult<()> {
        let package = request.package();
        let mut child = Command::new(&self.program)
            .arg("install")
            .arg("--prefix")
            .arg(staging)
            .arg("--registry")
            .arg(&request.registry)
            .args(["--no-save", "--no-package-lock", "--no-audit", "--no-fund"])
            .arg(&package)
            .current_dir(staging)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DxError::install(&package, format!("could not run {}: {}", self.program, e)))?;

        let program = self.program.clone();
        let sink = self.on_output.clone();
        let on_output = move |line: String| {
            debug!("{}: {}", program, line);
            if let Some(sink) = &sink {
                sink(&line);
            }
        };

        let run = async {
            let output = stream_child_output(&mut child, &on_output).await;
            let status = child.wait().await;
            (output, status)
        };

        let finished = tokio::time::timeout(self.timeout, run).await;
        let (output, status) = match finished {
            Ok(result) => result,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to stop {} after timeout: {}", self.program, e);
                }
                return Err(DxError::network(
                    &request.registry,
                    format!("installing {} timed out after {}s", package, self.timeout.as_secs()),
                ));
            }
        };

        let status =
            status.map_err(|e| DxError::install(&package, format!("waiting for npm: {e}")))?;
        if !status.success() {
            return Err(DxError::install(
                &package,
                format!("{} exited with {}\n{}", self.program, status, error_tail(&output)),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl Installer for NpmInstaller {
    async fn install(&self, request: &InstallRequest) -> DxResult<()> {
        let package = request.package();
        info!("Installing {} into {}", package, request.destination.display());

        PackageCache::ensure_store_dir(&request.store_dir).await?;
        let staging = StagingDir::create(&request.store_dir).await?;

        // Keeps npm from walking up into an unrelated project
        fs::write(
            staging.path().join("package.json"),
            r#"{ "name": "dx-staging", "private": true }"#,
        )
        .await
        .map_err(|e| DxError::io("writing staging manifest", e))?;

        self.run_npm(staging.path(), request).await?;

        let payload = arrange_payload(staging.path(), &request.name)
            .await
            .map_err(|reason| DxError::install(&package, reason))?;

        publish(&payload, &request.destination)
            .await
            .map_err(|reason| DxError::install(&package, reason))?;

        info!("Installed {}", package);
        Ok(())
    }
}

/// Turn `staging/node_modules/{name}` plus its sibling dependencies into a
/// single self-contained package directory with its own `node_modules`.
async fn arrange_payload(staging: &Path, name: &str) -> Result<PathBuf, String> {
    let modules = staging.join("node_modules");
    let installed = modules.join(name);
    if !installed.join("package.json").is_file() {
        return Err(format!("npm did not produce {}", installed.display()));
    }

    let payload = staging.join("package");
    fs::rename(&installed, &payload)
        .await
        .map_err(|e| format!("moving {}: {}", installed.display(), e))?;

    merge_dir(&modules, &payload.join("node_modules"))
        .await
        .map_err(|e| format!("arranging dependencies: {e}"))?;

    Ok(payload)
}

/// Move every entry of `from` into `into`, keeping what `into` already has.
/// Scope directories (`@scope`) are merged one level deep.
async fn merge_dir(from: &Path, into: &Path) -> std::io::Result<()> {
    if !into.exists() {
        if from.exists() {
            fs::rename(from, into).await?;
        }
        return Ok(());
    }

    let mut entries = fs::read_dir(from).await?;
    while let Some(entry) = entries.next_entry().await? {
        let target = into.join(entry.file_name());
        let is_scope = entry.file_name().to_string_lossy().starts_with('@');
        if !target.exists() {
            fs::rename(entry.path(), &target).await?;
        } else if is_scope && target.is_dir() {
            Box::pin(merge_dir(&entry.path(), &target)).await?;
        }
    }
    Ok(())
}

/// Atomically move a finished payload to its cache entry path
async fn publish(payload: &Path, destination: &Path) -> Result<(), String> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("creating {}: {}", parent.display(), e))?;
    }

    match fs::rename(payload, destination).await {
        Ok(()) => Ok(()),
        // Another process published the same entry first
        Err(_) if destination.is_dir() => {
            debug!("{} appeared concurrently, keeping it", destination.display());
            Ok(())
        }
        Err(e) => Err(format!("publishing {}: {}", destination.display(), e)),
    }
}

/// Staging directory removed on drop
struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    async fn create(store_dir: &Path) -> DxResult<Self> {
        let path = store_dir.join(format!("{}{}", STAGING_PREFIX, Uuid::new_v4()));
        fs::create_dir(&path)
            .await
            .map_err(|e| DxError::io(format!("creating staging directory {}", path.display()), e))?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scriptable installer for unit tests

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    enum Behavior {
        #[default]
        Complete,
        FailMidway,
        NoOutput,
        PublishThenFail,
    }

    /// Writes a minimal package into the destination; can be told to fail
    #[derive(Default)]
    pub struct FakeInstaller {
        pub calls: AtomicUsize,
        pub requests: Mutex<Vec<InstallRequest>>,
        behavior: Behavior,
    }

    impl FakeInstaller {
        fn with_behavior(behavior: Behavior) -> Self {
            Self {
                behavior,
                ..Self::default()
            }
        }

        /// Fails after writing part of the package into its staging area
        pub fn failing_midway() -> Self {
            Self::with_behavior(Behavior::FailMidway)
        }

        /// Reports success without creating anything
        pub fn producing_nothing() -> Self {
            Self::with_behavior(Behavior::NoOutput)
        }

        /// The destination is published (as by a concurrent install) but
        /// this install still times out
        pub fn publishing_then_failing() -> Self {
            Self::with_behavior(Behavior::PublishThenFail)
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn write_package(request: &InstallRequest, dir: &Path) {
        let manifest = serde_json::json!({
            "name": request.name,
            "version": request.version.to_string(),
            "main": "lib/index.js",
        });
        std::fs::create_dir_all(dir.join("lib")).unwrap();
        std::fs::write(dir.join("package.json"), manifest.to_string()).unwrap();
        std::fs::write(dir.join("lib").join("index.js"), "module.exports = () => 0;\n").unwrap();
    }

    #[async_trait]
    impl Installer for FakeInstaller {
        async fn install(&self, request: &InstallRequest) -> DxResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());

            match self.behavior {
                Behavior::NoOutput => Ok(()),
                Behavior::FailMidway => {
                    let staging = request.store_dir.join(format!("{STAGING_PREFIX}fake"));
                    std::fs::create_dir_all(&staging).unwrap();
                    std::fs::write(staging.join("partial"), "x").unwrap();
                    std::fs::remove_dir_all(&staging).unwrap();
                    Err(DxError::install(request.package(), "connection reset"))
                }
                Behavior::PublishThenFail => {
                    write_package(request, &request.destination);
                    Err(DxError::network(&request.registry, "timed out"))
                }
                Behavior::Complete => {
                    write_package(request, &request.destination);
                    Ok(())
                }
            }
        }
    }
}
