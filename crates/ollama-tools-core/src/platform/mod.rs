//! Platform abstraction layer.
//!
//! All `#[cfg]` blocks for OS-specific behavior live in this module. The
//! host is inspected once, at startup, into an immutable [`PlatformProfile`]
//! that the model store and the log manager are constructed from.
//!
//! - `paths` - default model store, log and backup locations per OS
//! - `process` - detached process spawning

pub mod paths;
pub mod process;

pub use process::spawn_detached;

use crate::error::{Result, ToolError};
use std::path::{Path, PathBuf};

/// The operating system family a profile was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
    /// Any other target; carries `std::env::consts::OS`.
    Other(&'static str),
}

impl HostOs {
    /// The OS this binary was compiled for.
    pub fn current() -> Self {
        #[cfg(target_os = "linux")]
        {
            HostOs::Linux
        }
        #[cfg(target_os = "macos")]
        {
            HostOs::MacOs
        }
        #[cfg(target_os = "windows")]
        {
            HostOs::Windows
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            HostOs::Other(std::env::consts::OS)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostOs::Linux => "linux",
            HostOs::MacOs => "macos",
            HostOs::Windows => "windows",
            HostOs::Other(name) => name,
        }
    }
}

impl std::fmt::Display for HostOs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Host-dependent locations, resolved once and passed to constructors.
#[derive(Debug, Clone)]
pub struct PlatformProfile {
    os: HostOs,
    models_root: Option<PathBuf>,
    log_dir: PathBuf,
    default_backup_dir: PathBuf,
}

impl PlatformProfile {
    /// Build the profile for the running host.
    pub fn detect() -> Result<Self> {
        Self::for_os(HostOs::current())
    }

    /// Build the profile for a given OS family using the default tables.
    pub fn for_os(os: HostOs) -> Result<Self> {
        Ok(Self::for_os_with_home(os, dirs::home_dir().as_deref()))
    }

    /// Build the profile from the tables for a known (or absent) home
    /// directory. Entries that need a home directory fall back per table.
    pub fn for_os_with_home(os: HostOs, home: Option<&Path>) -> Self {
        if home.is_none() {
            tracing::warn!("Could not determine home directory; using fallback locations");
        }
        let profile = Self {
            os,
            models_root: paths::default_models_root(os, home),
            log_dir: paths::default_log_dir(os, home),
            default_backup_dir: paths::default_backup_dir(home),
        };
        tracing::debug!(?profile, "Resolved platform profile");
        profile
    }

    /// Override the model store root (e.g. from `OLLAMA_MODELS`).
    pub fn with_models_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.models_root = Some(root.into());
        self
    }

    pub fn os(&self) -> HostOs {
        self.os
    }

    /// The model store root. Fails with `UnsupportedPlatform` when the host
    /// has no configured default, or with `Config` when the default needs a
    /// home directory that could not be found, and none was supplied.
    pub fn models_root(&self) -> Result<&Path> {
        match (&self.models_root, self.os) {
            (Some(root), _) => Ok(root.as_path()),
            (None, HostOs::Other(_)) => Err(ToolError::UnsupportedPlatform {
                platform: self.os.to_string(),
            }),
            (None, _) => Err(ToolError::Config {
                message: "Could not determine home directory for the model store; \
                          set OLLAMA_MODELS"
                    .to_string(),
            }),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn default_backup_dir(&self) -> &Path {
        &self.default_backup_dir
    }
}
