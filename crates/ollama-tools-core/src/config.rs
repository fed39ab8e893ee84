//! Centralized configuration for ollama-tools.
//!
//! Constants for the daemon binary, the model store layout and the managed
//! log file. Platform-dependent defaults live in [`crate::platform`].

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "ollama-tool-cli";
    pub const OLLAMA_BINARY: &'static str = "ollama";
    pub const LOG_FILE_NAME: &'static str = "ollama-tool-cli.log";
    pub const LOG_FILE_MAX_BYTES: u64 = 10_485_760; // 10MB
    pub const LOG_FILE_BACKUP_COUNT: u32 = 3;
    pub const TAIL_POLL_INTERVAL: Duration = Duration::from_millis(500);
    pub const MAX_DEFAULT_JOBS: usize = 4;
    pub const BACKUP_DIR_NAME: &'static str = "ollama_models_backup";
    /// Set in the environment of a detached child.
    pub const BACKGROUND_CHILD_ENV: &'static str = "OLLAMA_TOOL_CLI_BACKGROUND_CHILD";
}

/// Layout of the Ollama model store.
pub struct StoreConfig;

impl StoreConfig {
    pub const MANIFESTS_DIR: &'static str = "manifests";
    pub const BLOBS_DIR: &'static str = "blobs";
    pub const REGISTRY_HOST: &'static str = "registry.ollama.ai";
    pub const DEFAULT_NAMESPACE: &'static str = "library";
    pub const DEFAULT_TAG: &'static str = "latest";
    pub const ARCHIVE_EXTENSION: &'static str = "zip";
    pub const PARTIAL_SUFFIX: &'static str = ".part";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_limits_are_reasonable() {
        assert!(AppConfig::LOG_FILE_MAX_BYTES >= 1024 * 1024);
        assert!(AppConfig::LOG_FILE_BACKUP_COUNT >= 1);
        assert!(AppConfig::TAIL_POLL_INTERVAL > Duration::ZERO);
    }
}
