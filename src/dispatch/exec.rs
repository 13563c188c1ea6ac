//! Child process launch and exit status propagation

use crate::dispatch::bootstrap::{BOOTSTRAP, ENTRY_ENV, INVOCATION_ENV, REPORT_ENV};
use crate::dispatch::options::CommandOptions;
use crate::error::{DxError, DxResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Run `entry` under `runtime` with `options`, waiting for it to exit.
///
/// Stdio is inherited so the command owns the terminal. `env` is added on
/// top of the inherited environment. A module the loader cannot call is a
/// `NoEntryPoint` failure, whatever exit code the child used.
pub async fn invoke(
    runtime: &str,
    entry: &Path,
    options: &CommandOptions,
    env: &BTreeMap<String, String>,
) -> DxResult<()> {
    let invocation = options.to_json()?;
    debug!("Invoking {} with {}", entry.display(), invocation);

    let report = LoadReport::new();
    let mut child = Command::new(runtime)
        .arg("-e")
        .arg(BOOTSTRAP)
        .envs(env)
        .env(ENTRY_ENV, entry)
        .env(INVOCATION_ENV, &invocation)
        .env(REPORT_ENV, report.path())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| DxError::spawn(runtime, e))?;

    let status = wait(&mut child, runtime).await?;
    if let Some(reason) = report.read() {
        return Err(DxError::NoEntryPoint {
            path: entry.to_path_buf(),
            reason,
        });
    }

    let code = exit_code(status);
    info!("'{}' exited with {}", options.command, code);

    if code == 0 {
        Ok(())
    } else {
        Err(DxError::CommandFailed {
            command: options.command.clone(),
            code,
        })
    }
}

/// Temp file the loader fills in when it gives up before running the command
struct LoadReport {
    path: PathBuf,
}

impl LoadReport {
    fn new() -> Self {
        Self {
            path: std::env::temp_dir().join(format!("dx-load-{}", Uuid::new_v4())),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Option<String> {
        let reason = std::fs::read_to_string(&self.path).ok()?;
        let reason = reason.trim();
        (!reason.is_empty()).then(|| reason.to_string())
    }
}

impl Drop for LoadReport {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Exit code of a finished child; death by signal maps to `128 + signal`
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// Wait for the child, forwarding termination signals to it meanwhile
#[cfg(unix)]
async fn wait(child: &mut Child, runtime: &str) -> DxResult<ExitStatus> {
    use tokio::signal::unix::{signal, SignalKind};

    let pid = child.id();
    let handler = |kind: SignalKind, name: &str| {
        signal(kind).map_err(|e| DxError::io(format!("installing {name} handler"), e))
    };
    let mut sigint = handler(SignalKind::interrupt(), "SIGINT")?;
    let mut sigterm = handler(SignalKind::terminate(), "SIGTERM")?;
    let mut sighup = handler(SignalKind::hangup(), "SIGHUP")?;

    loop {
        let received = tokio::select! {
            status = child.wait() => {
                return status.map_err(|e| DxError::io(format!("waiting for {runtime}"), e));
            }
            _ = sigint.recv() => libc::SIGINT,
            _ = sigterm.recv() => libc::SIGTERM,
            _ = sighup.recv() => libc::SIGHUP,
        };

        match (pid, forwarded(received)) {
            (Some(pid), Some(signal)) => forward_signal(pid, signal),
            _ => debug!("Child already has signal {}", received),
        }
    }
}

/// Signal to relay to the child after dx received `signal`.
///
/// SIGINT comes from the terminal, which delivers it to the whole foreground
/// process group, child included. dx only has to outlive it.
#[cfg(unix)]
fn forwarded(signal: libc::c_int) -> Option<libc::c_int> {
    (signal != libc::SIGINT).then_some(signal)
}

#[cfg(not(unix))]
async fn wait(child: &mut Child, runtime: &str) -> DxResult<ExitStatus> {
    child
        .wait()
        .await
        .map_err(|e| DxError::io(format!("waiting for {runtime}"), e))
}

#[cfg(unix)]
fn forward_signal(pid: u32, signal: libc::c_int) {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };
    debug!("Forwarding signal {} to {}", signal, pid);
    // SAFETY: kill(2) takes plain integers and touches no memory we own
    if unsafe { libc::kill(pid, signal) } != 0 {
        tracing::warn!(
            "Failed to forward signal {}: {}",
            signal,
            std::io::Error::last_os_error()
        );
    }
}
