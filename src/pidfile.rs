//! PID file lifecycle, grounded on `original_source/server/cmd.go::Cmd.Do`.

use std::fs;
use std::path::Path;

use log::warn;

use crate::error::StartupError;

/// Reads `path`, returning the PID if the file both exists and parses.
pub fn read_pid(path: &Path) -> Option<i32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Returns `true` if the process named by `pid` appears to still be alive,
/// via the POSIX `kill(pid, 0)` existence check (no signal is delivered).
pub fn process_alive(pid: i32) -> bool {
    unsafe { libc::kill(pid, 0) == 0 }
}

/// Called at startup: if a PID file exists and names a live process, this
/// instance refuses to start (`AlreadyRunning`). If it exists but names a
/// dead process, it's a stale leftover and is removed. Either way, the
/// current process's PID is written on success.
pub fn claim(path: &Path) -> Result<(), StartupError> {
    if let Some(existing) = read_pid(path) {
        if process_alive(existing) {
            return Err(StartupError::AlreadyRunning(existing));
        }
        warn!("removing stale pid file for dead process {existing}");
        let _ = fs::remove_file(path);
    }

    fs::write(path, std::process::id().to_string()).map_err(|source| StartupError::Config(
        crate::error::ConfigError::Io { path: path.to_path_buf(), source },
    ))
}

/// Removed on clean shutdown; left behind on a crash, to be cleaned up by
/// the next `claim` call.
pub fn release(path: &Path) {
    let _ = fs::remove_file(path);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_reported_alive() {
        assert!(process_alive(std::process::id() as i32));
    }

    #[test]
    fn nonexistent_pid_is_not_alive() {
        assert!(!process_alive(i32::MAX));
    }
}
