//! Adapter for the `ollama` command-line binary.
//!
//! The core talks to the daemon through three verbs only: `--version`,
//! `list` and `pull <model>`. [`CommandRunner`] is the seam that lets tests
//! substitute the binary.

use crate::config::AppConfig;
use crate::error::{Result, ToolError};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Captured outcome of one external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code, `-1` when the child was terminated by a signal.
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl std::fmt::Display for CommandResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Output Text: {}\nError Text: {}\nReturn Code: {}",
            self.stdout, self.stderr, self.exit_code
        )
    }
}

/// Runs the daemon binary with an argument vector.
///
/// A non-zero exit is a normal return; only a failure to start the process
/// is an error.
pub trait CommandRunner: Send + Sync {
    fn run(&self, args: &[&str]) -> Result<CommandResult>;
}

/// [`CommandRunner`] that spawns a real program.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(AppConfig::OLLAMA_BINARY)
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, args: &[&str]) -> Result<CommandResult> {
        debug!("Running {} {}", self.program.display(), args.join(" "));

        // stdin stays a pipe so the tool never sees a closed terminal; it is
        // closed by `wait_with_output` before both output pipes are drained.
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ToolError::Launch {
                program: self.program.display().to_string(),
                source: e,
            })?;

        let output = child
            .wait_with_output()
            .map_err(|e| ToolError::io_with_path(e, &self.program))?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// The three daemon verbs the tool relies on.
#[derive(Debug, Clone)]
pub struct OllamaCli<R: CommandRunner = ProcessRunner> {
    runner: R,
}

impl<R: CommandRunner> OllamaCli<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Installed daemon version, `"unknown"` when it prints nothing.
    ///
    /// `ollama version is 0.5.7` yields `0.5.7`.
    pub fn version(&self) -> Result<String> {
        let result = self.runner.run(&["--version"])?;
        let output = result.stdout.trim();
        if output.is_empty() {
            return Ok("unknown".to_string());
        }
        Ok(match output.split_once(" is ") {
            Some((_, version)) => version.trim().to_string(),
            None => output.to_string(),
        })
    }

    /// Whether the daemon binary can be launched at all.
    pub fn is_available(&self) -> bool {
        match self.runner.run(&["--version"]) {
            Ok(_) => true,
            Err(e) => {
                debug!("ollama not available: {}", e);
                false
            }
        }
    }

    /// Identifiers of every installed model, as printed by `ollama list`.
    pub fn list_models(&self) -> Result<Vec<String>> {
        let result = self.runner.run(&["list"])?;
        if !result.success() {
            warn!(
                "`ollama list` exited with {}: {}",
                result.exit_code, result.stderr
            );
        }
        Ok(parse_model_list(&result.stdout))
    }

    /// Pull (install or update) one model.
    pub fn pull(&self, model: &str) -> Result<CommandResult> {
        let result = self.runner.run(&["pull", model])?;
        if !result.success() {
            return Err(ToolError::CommandFailed {
                command: format!("ollama pull {}", model),
                exit_code: result.exit_code,
                stderr: result.stderr,
            });
        }
        Ok(result)
    }
}

impl Default for OllamaCli<ProcessRunner> {
    fn default() -> Self {
        Self::new(ProcessRunner::default())
    }
}

/// First column of every line after the header.
fn parse_model_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted runner keyed by the joined argument vector.
    #[derive(Default)]
    pub struct FakeRunner {
        pub responses: HashMap<String, CommandResult>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        pub fn respond(mut self, args: &str, stdout: &str, exit_code: i32) -> Self {
            self.responses.insert(
                args.to_string(),
                CommandResult {
                    stdout: stdout.to_string(),
                    stderr: if exit_code == 0 {
                        String::new()
                    } else {
                        "error".to_string()
                    },
                    exit_code,
                },
            );
            self
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, args: &[&str]) -> Result<CommandResult> {
            let key = args.join(" ");
            self.calls.lock().unwrap().push(key.clone());
            self.responses
                .get(&key)
                .cloned()
                .ok_or_else(|| ToolError::Launch {
                    program: "ollama".to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })
        }
    }
}
