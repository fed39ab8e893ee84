//! Log file management for background runs.
//!
//! Background children append to one live file in the platform log
//! directory. The file is rotated by size before each launch, and
//! `logs --follow` tails it live.

mod rotation;
mod tail;

pub use rotation::LogRotator;
pub use tail::{LogTailer, TailCursor, TailState, TickOutcome};

use crate::config::AppConfig;
use crate::error::{Result, ToolError};
use crate::platform::PlatformProfile;
use std::fs;
use std::path::{Path, PathBuf};

/// Owns the log directory, the live file name, and the rotation policy.
#[derive(Debug, Clone)]
pub struct LogManager {
    dir: PathBuf,
    rotator: LogRotator,
}

impl LogManager {
    pub fn new(profile: &PlatformProfile) -> Self {
        Self::with_dir(profile.log_dir())
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            rotator: LogRotator::default(),
        }
    }

    pub fn with_rotator(mut self, rotator: LogRotator) -> Self {
        self.rotator = rotator;
        self
    }

    pub fn log_dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_file(&self) -> PathBuf {
        self.dir.join(AppConfig::LOG_FILE_NAME)
    }

    pub fn rotator(&self) -> &LogRotator {
        &self.rotator
    }

    /// Create the log directory if needed.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| ToolError::io_with_path(e, &self.dir))
    }

    /// Make the live file ready for a new writer: ensure the directory
    /// exists and rotate if the file is oversized. Returns the live path.
    pub fn prepare(&self) -> Result<PathBuf> {
        self.ensure_dir()?;
        let file = self.log_file();
        self.rotator.rotate(&file)?;
        Ok(file)
    }

    /// A tailer positioned at the start of the live file.
    pub fn tailer(&self) -> LogTailer {
        LogTailer::new(self.log_file())
    }
}
