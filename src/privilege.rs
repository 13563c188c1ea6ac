//! Running under sudo
//!
//! Cache entries written as root cannot be updated by the user's later,
//! unprivileged runs. When dx is started through `sudo` it switches back to
//! the invoking user before it reads config or touches the cache. Plain root
//! (containers, CI images) is left alone.

use crate::error::DxResult;
use std::path::PathBuf;

/// The user who ran `sudo dx ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    pub uid: u32,
    pub gid: u32,
    /// Home directory from the password database, if it has one
    pub home: Option<PathBuf>,
}

/// Read the sudo caller from `SUDO_UID` and `SUDO_GID`.
///
/// Returns `None` when either is missing or unparseable, or when the caller
/// is root itself.
pub fn sudo_invoker(var: impl Fn(&str) -> Option<String>) -> Option<Invoker> {
    let uid = var("SUDO_UID")?.trim().parse::<u32>().ok()?;
    let gid = var("SUDO_GID")?.trim().parse::<u32>().ok()?;
    if uid == 0 {
        return None;
    }
    Some(Invoker {
        uid,
        gid,
        home: None,
    })
}

/// Switch to the sudo caller when running as root through sudo.
///
/// On success `HOME` points at the caller's home so config and cache paths
/// resolve as they would without sudo.
#[cfg(unix)]
pub fn drop_root() -> DxResult<Option<Invoker>> {
    use crate::error::DxError;

    // SAFETY: geteuid has no preconditions
    if unsafe { libc::geteuid() } != 0 {
        return Ok(None);
    }
    let Some(mut invoker) = sudo_invoker(|key| std::env::var(key).ok()) else {
        return Ok(None);
    };
    invoker.home = home_of(invoker.uid);

    let os_error = |step: &str| {
        DxError::io(
            format!("dropping root privileges ({step})"),
            std::io::Error::last_os_error(),
        )
    };
    let groups = [invoker.gid];
    // SAFETY: plain syscalls on integers; `groups` outlives the call.
    // Groups and gid go first, setuid would forbid changing them afterwards.
    unsafe {
        if libc::setgroups(1, groups.as_ptr()) != 0 {
            return Err(os_error("setgroups"));
        }
        if libc::setgid(invoker.gid) != 0 {
            return Err(os_error("setgid"));
        }
        if libc::setuid(invoker.uid) != 0 {
            return Err(os_error("setuid"));
        }
    }

    if let Some(home) = &invoker.home {
        std::env::set_var("HOME", home);
    }
    Ok(Some(invoker))
}

#[cfg(not(unix))]
pub fn drop_root() -> DxResult<Option<Invoker>> {
    Ok(None)
}

#[cfg(unix)]
fn home_of(uid: u32) -> Option<PathBuf> {
    use std::ffi::CStr;
    use std::os::unix::ffi::OsStrExt;

    // SAFETY: getpwuid returns null or a pointer to static storage that stays
    // valid until the next getpw* call; the path is copied out immediately.
    unsafe {
        let entry = libc::getpwuid(uid);
        if entry.is_null() || (*entry).pw_dir.is_null() {
            return None;
        }
        let dir = CStr::from_ptr((*entry).pw_dir);
        Some(PathBuf::from(std::ffi::OsStr::from_bytes(dir.to_bytes())))
    }
}
