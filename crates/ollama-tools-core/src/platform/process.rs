//! Detached process spawning.
//!
//! One capability, two backends: start a program whose stdout and stderr
//! are appended to a file, detach it from our terminal session, and return
//! its PID without waiting for it.

use crate::error::{Result, ToolError};
use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

#[cfg(unix)]
use std::os::unix::process::CommandExt;

#[cfg(windows)]
use std::os::windows::process::CommandExt;

/// Spawn `program args...` detached, with `envs` added to its environment
/// and both output streams appended to `log_file`.
///
/// # Platform Behavior
/// - **Linux/macOS**: the child calls `setsid()` before exec, so it leads a
///   new session with no controlling terminal and survives our exit
/// - **Windows**: `DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW`
pub fn spawn_detached<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
    envs: &[(&str, &str)],
    log_file: &Path,
) -> Result<u32> {
    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ToolError::io_with_path(e, parent))?;
        }
    }

    let stdout_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| ToolError::io_with_path(e, log_file))?;
    let stderr_file = stdout_file
        .try_clone()
        .map_err(|e| ToolError::io_with_path(e, log_file))?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .envs(envs.iter().copied())
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file));

    detach(&mut cmd);

    debug!("Spawning detached {} (log: {})", program.display(), log_file.display());
    let child = cmd.spawn().map_err(|e| ToolError::Spawn {
        program: program.display().to_string(),
        source: e,
    })?;

    // The child is intentionally not waited on; dropping the handle neither
    // kills nor reaps it.
    let pid = child.id();
    info!("Started background process with PID {}", pid);
    Ok(pid)
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn detach(cmd: &mut Command) {
    // SAFETY: the closure runs in the forked child before exec and only
    // calls setsid(), which is async-signal-safe and touches no memory
    // shared with the parent.
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid()
                .map(|_| ())
                .map_err(std::io::Error::from)
        });
    }
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW);
}

#[cfg(not(any(unix, windows)))]
fn detach(_cmd: &mut Command) {
    tracing::warn!("Process detachment not implemented for this platform");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn wait_for_contents(path: &Path, needle: &str) -> String {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let contents = fs::read_to_string(path).unwrap_or_default();
            if contents.contains(needle) || Instant::now() > deadline {
                return contents;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_detached_appends_both_streams() {
        let temp_dir = TempDir::new().unwrap();
        let log_file = temp_dir.path().join("logs").join("tool.log");
        fs::create_dir_all(log_file.parent().unwrap()).unwrap();
        fs::write(&log_file, "existing\n").unwrap();

        let pid = spawn_detached(
            Path::new("/bin/sh"),
            &["-c", "echo out; echo err 1>&2"],
            &[],
            &log_file,
        )
        .unwrap();
        assert!(pid > 0);

        let contents = wait_for_contents(&log_file, "err");
        assert!(contents.starts_with("existing\n"));
        assert!(contents.contains("out"));
        assert!(contents.contains("err"));
    }

    #[test]
    fn test_spawn_missing_program_is_spawn_error() {
        let temp_dir = TempDir::new().unwrap();
        let log_file = temp_dir.path().join("tool.log");

        let err = spawn_detached(
            &temp_dir.path().join("does-not-exist"),
            &["--version"],
            &[],
            &log_file,
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
        assert!(err.is_fatal());
    }
}
