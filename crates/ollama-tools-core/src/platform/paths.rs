//! Default path tables.
//!
//! # Platform Behavior
//! | | models root | log directory |
//! |---|---|---|
//! | Linux | `/usr/share/ollama/.ollama/models` | `$XDG_STATE_HOME` or `~/.local/state`, then `ollama-tool-cli/logs` |
//! | macOS | `~/.ollama/models` | `~/Library/Logs/ollama-tool-cli` |
//! | Windows | `%USERPROFILE%\.ollama\models` | `%LOCALAPPDATA%`, `%APPDATA%` or `~`, then `ollama-tool-cli\Logs` |
//! | other | none | `./ollama-tool-cli` |

use super::HostOs;
use crate::config::AppConfig;
use std::path::{Path, PathBuf};

/// Where the Ollama daemon keeps its models by default.
///
/// `None` for unknown hosts, and on macOS and Windows when there is no home
/// directory to put the store under.
pub fn default_models_root(os: HostOs, home: Option<&Path>) -> Option<PathBuf> {
    match os {
        HostOs::Linux => Some(PathBuf::from("/usr/share/ollama/.ollama/models")),
        HostOs::MacOs | HostOs::Windows => home.map(|h| h.join(".ollama").join("models")),
        HostOs::Other(_) => None,
    }
}

/// Directory holding the managed log file. Without a home directory the
/// home-relative entries fall back to the working directory.
pub fn default_log_dir(os: HostOs, home: Option<&Path>) -> PathBuf {
    let home = home.unwrap_or(Path::new("."));
    match os {
        HostOs::MacOs => home.join("Library").join("Logs").join(AppConfig::APP_NAME),
        HostOs::Linux => env_dir("XDG_STATE_HOME")
            .unwrap_or_else(|| home.join(".local").join("state"))
            .join(AppConfig::APP_NAME)
            .join("logs"),
        HostOs::Windows => env_dir("LOCALAPPDATA")
            .or_else(|| env_dir("APPDATA"))
            .unwrap_or_else(|| home.to_path_buf())
            .join(AppConfig::APP_NAME)
            .join("Logs"),
        HostOs::Other(_) => PathBuf::from(".").join(AppConfig::APP_NAME),
    }
}

/// Directory backups are written to when none is given.
pub fn default_backup_dir(home: Option<&Path>) -> PathBuf {
    dirs::download_dir()
        .or_else(|| home.map(|h| h.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(AppConfig::BACKUP_DIR_NAME)
}

/// Replace a leading `~` with the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// A directory from an environment variable, ignoring empty values.
fn env_dir(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
