//! Size-triggered rotation into a fixed ring of numbered backups.

use crate::config::AppConfig;
use crate::error::{Result, ToolError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rotates `file` into `file.1` … `file.N` once it reaches `max_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRotator {
    max_bytes: u64,
    backups: u32,
}

impl Default for LogRotator {
    fn default() -> Self {
        Self::new(AppConfig::LOG_FILE_MAX_BYTES, AppConfig::LOG_FILE_BACKUP_COUNT)
    }
}

impl LogRotator {
    pub fn new(max_bytes: u64, backups: u32) -> Self {
        Self { max_bytes, backups }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn backups(&self) -> u32 {
        self.backups
    }

    /// `app.log` with index 2 becomes `app.log.2`.
    pub fn rotated_path(path: &Path, index: u32) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}", index));
        path.with_file_name(name)
    }

    /// Whether the live file exists and is at or above the size threshold.
    pub fn needs_rotation(&self, path: &Path) -> bool {
        fs::metadata(path)
            .map(|meta| meta.is_file() && meta.len() >= self.max_bytes)
            .unwrap_or(false)
    }

    /// Shift the ring by one if the live file is oversized.
    ///
    /// From the deepest index down to 1, the predecessor (the live file for
    /// index 1) is renamed over the slot after removing whatever occupied
    /// it, so the oldest backup falls off the end. Leaves the live path free.
    /// Returns whether a rotation happened.
    pub fn rotate(&self, path: &Path) -> Result<bool> {
        if !self.needs_rotation(path) {
            return Ok(false);
        }

        if self.backups == 0 {
            fs::remove_file(path).map_err(|e| ToolError::io_with_path(e, path))?;
            info!("Discarded oversized log {}", path.display());
            return Ok(true);
        }

        for index in (1..=self.backups).rev() {
            let target = Self::rotated_path(path, index);
            let previous = if index == 1 {
                path.to_path_buf()
            } else {
                Self::rotated_path(path, index - 1)
            };
            if !previous.exists() {
                continue;
            }
            if target.exists() {
                fs::remove_file(&target).map_err(|e| ToolError::io_with_path(e, &target))?;
            }
            debug!("Rotating {} -> {}", previous.display(), target.display());
            fs::rename(&previous, &target).map_err(|e| ToolError::io_with_path(e, &previous))?;
        }

        info!("Rotated log {}", path.display());
        Ok(true)
    }
}
