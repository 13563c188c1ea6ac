//! Child runtime availability and version check

use crate::error::{DxError, DxResult};
use semver::Version;
use tokio::process::Command;
use tracing::debug;

/// Run `<runtime> --version` and require at least `minimum`.
pub async fn check_runtime(runtime: &str, minimum: &Version) -> DxResult<Version> {
    let output = Command::new(runtime)
        .arg("--version")
        .output()
        .await
        .map_err(|e| DxError::spawn(runtime, e))?;

    let raw = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let found = parse_runtime_version(&raw).ok_or_else(|| {
        DxError::Internal(format!("unrecognized {runtime} version output '{raw}'"))
    })?;

    debug!("{} {} (minimum {})", runtime, found, minimum);
    if found < *minimum {
        return Err(DxError::RuntimeTooOld {
            runtime: runtime.to_string(),
            found: found.to_string(),
            required: minimum.to_string(),
        });
    }
    Ok(found)
}

/// Parse `v18.19.0` style output
pub fn parse_runtime_version(raw: &str) -> Option<Version> {
    let first = raw.lines().next()?.trim();
    Version::parse(first.strip_prefix('v').unwrap_or(first)).ok()
}
