//! Re-launch the current invocation as a detached background process.
//!
//! The foreground process rotates the live log, spawns itself again without
//! the background flag, reports the child's PID and exits. The child keeps
//! running after the launching terminal goes away.

use crate::config::AppConfig;
use crate::error::{Result, ToolError};
use crate::logs::LogManager;
use crate::platform;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::info;

/// Flags that request background execution. Removed from the re-spawned
/// command line so the child runs in the foreground of its own session.
pub const BACKGROUND_FLAGS: [&str; 2] = ["--background", "-b"];

const BACKGROUND_SHORT: char = 'b';

/// Drop every background flag, keeping all other arguments in order.
///
/// Short clusters lose their leading `b` flags (`-bj` becomes `-j`); letters
/// after the first other flag may be that flag's value and are kept.
/// Nothing after `--` is touched.
pub fn strip_background_flags<I, S>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut stripped: Vec<OsString> = Vec::new();
    let mut args = args.into_iter().map(Into::<OsString>::into);
    while let Some(arg) = args.next() {
        if arg == "--" {
            stripped.push(arg);
            stripped.extend(args.by_ref());
            break;
        }
        if arg == BACKGROUND_FLAGS[0] {
            continue;
        }
        if let Some(kept) = without_background_short(arg) {
            stripped.push(kept);
        }
    }
    stripped
}

/// `None` when the whole argument was background flags.
fn without_background_short(arg: OsString) -> Option<OsString> {
    let Some(cluster) = arg.to_str().and_then(|a| a.strip_prefix('-')) else {
        return Some(arg);
    };
    if !cluster.starts_with(BACKGROUND_SHORT) {
        return Some(arg);
    }
    let rest = cluster.trim_start_matches(BACKGROUND_SHORT);
    if rest.is_empty() {
        None
    } else {
        Some(OsString::from(format!("-{rest}")))
    }
}

/// Whether this process was started by [`spawn_background`].
///
/// The CLI checks this so a detached child never detaches again, whatever
/// its argument vector says.
pub fn is_background_child() -> bool {
    std::env::var_os(AppConfig::BACKGROUND_CHILD_ENV).is_some_and(|v| !v.is_empty())
}

/// A program and argument vector to run detached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl DetachedCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// This executable with its own arguments, background flags removed.
    pub fn current() -> Result<Self> {
        let program = std::env::current_exe().map_err(|e| ToolError::Spawn {
            program: "current executable".to_string(),
            source: e,
        })?;
        Ok(Self::new(
            program,
            strip_background_flags(std::env::args_os().skip(1)),
        ))
    }
}

/// The detached child and where its output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundHandle {
    pub pid: u32,
    pub log_file: PathBuf,
}

/// Rotate the live log and start `command` detached, appending to it.
pub fn spawn_command(command: &DetachedCommand, logs: &LogManager) -> Result<BackgroundHandle> {
    let log_file = logs.prepare()?;
    let pid = platform::spawn_detached(
        &command.program,
        &command.args,
        &[(AppConfig::BACKGROUND_CHILD_ENV, "1")],
        &log_file,
    )?;
    info!(
        "Detached {} as PID {} (log: {})",
        command.program.display(),
        pid,
        log_file.display()
    );
    Ok(BackgroundHandle { pid, log_file })
}

/// Re-spawn the current invocation in the background.
pub fn spawn_background(logs: &LogManager) -> Result<BackgroundHandle> {
    spawn_command(&DetachedCommand::current()?, logs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_background_flags() {
        let stripped = strip_background_flags([
            "backup",
            "-b",
            "--path",
            "/tmp/out",
            "--background",
            "-j",
            "2",
        ]);
        assert_eq!(
            stripped,
            vec![
                OsString::from("backup"),
                OsString::from("--path"),
                OsString::from("/tmp/out"),
                OsString::from("-j"),
                OsString::from("2"),
            ]
        );
    }

    #[test]
    fn test_strip_keeps_lookalikes() {
        let stripped = strip_background_flags(["--backgrounds", "-jb", "b", "--bb"]);
        assert_eq!(stripped.len(), 4);
    }

    #[test]
    fn test_strip_clustered_short_flags() {
        let stripped = strip_background_flags(["backup", "-bj", "2", "-bbj4", "-m", "phi3"]);
        assert_eq!(
            stripped,
            vec![
                OsString::from("backup"),
                OsString::from("-j"),
                OsString::from("2"),
                OsString::from("-j4"),
                OsString::from("-m"),
                OsString::from("phi3"),
            ]
        );
    }

    #[test]
    fn test_strip_stops_at_separator() {
        let stripped = strip_background_flags(["update", "-b", "--", "-b", "--background"]);
        assert_eq!(
            stripped,
            vec![
                OsString::from("update"),
                OsString::from("--"),
                OsString::from("-b"),
                OsString::from("--background"),
            ]
        );
    }

    #[test]
    fn test_current_command_has_no_background_flag() {
        let command = DetachedCommand::current().unwrap();
        assert!(command.program.is_absolute());
        assert!(command
            .args
            .iter()
            .all(|arg| !BACKGROUND_FLAGS.iter().any(|flag| arg == flag)));
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_command_rotates_and_logs() {
        use crate::logs::LogRotator;
        use std::fs;
        use std::time::{Duration, Instant};
        use tempfile::TempDir;

        let temp_dir = TempDir::new().unwrap();
        let logs = LogManager::with_dir(temp_dir.path()).with_rotator(LogRotator::new(8, 2));
        fs::write(logs.log_file(), "previous run output").unwrap();

        let command = DetachedCommand::new(
            "/bin/sh",
            vec![OsString::from("-c"), OsString::from("echo detached $OLLAMA_TOOL_CLI_BACKGROUND_CHILD")],
        );
        let handle = spawn_command(&command, &logs).unwrap();
        assert!(handle.pid > 0);
        assert_eq!(handle.log_file, logs.log_file());
        assert_eq!(
            fs::read_to_string(LogRotator::rotated_path(&handle.log_file, 1)).unwrap(),
            "previous run output"
        );

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let content = fs::read_to_string(&handle.log_file).unwrap_or_default();
            if content.contains("detached 1") {
                break;
            }
            assert!(Instant::now() < deadline, "child output never arrived");
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}
