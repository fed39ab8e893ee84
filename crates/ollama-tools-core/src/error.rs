//! Error types for ollama-tools.
//!
//! Errors fall into two groups: faults that abort a whole command (the
//! daemon binary cannot be launched, no store root exists for the host,
//! the background child cannot be spawned) and faults that belong to a
//! single model or archive and are recorded in a batch report instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the ollama-tools library.
#[derive(Debug, Error)]
pub enum ToolError {
    // External tool errors
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    // Model store errors
    #[error("Unsupported operating system: {platform}")]
    UnsupportedPlatform { platform: String },

    #[error("Invalid model identifier {model:?}: {message}")]
    InvalidModel { model: String, message: String },

    #[error("Model manifest not found for {model}: {path}")]
    ManifestNotFound { model: String, path: PathBuf },

    #[error("Missing model blob(s) for {model}: {}", join_paths(.paths))]
    BlobMissing { model: String, paths: Vec<PathBuf> },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Archive errors
    #[error("Archive error at {path:?}: {message}")]
    Archive {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("Archive {archive} contains an entry outside the target root: {entry}")]
    UnsafeArchiveEntry { archive: PathBuf, entry: String },

    // Background process errors
    #[error("Failed to spawn background process {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias for ollama-tools operations.
pub type Result<T> = std::result::Result<T, ToolError>;

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<zip::result::ZipError> for ToolError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => ToolError::from(e),
            other => ToolError::Archive {
                message: other.to_string(),
                path: None,
            },
        }
    }
}

impl ToolError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ToolError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether this error aborts the enclosing command rather than a single
    /// batch item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ToolError::Launch { .. }
                | ToolError::UnsupportedPlatform { .. }
                | ToolError::Spawn { .. }
                | ToolError::Config { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_missing_names_every_path() {
        let err = ToolError::BlobMissing {
            model: "llama3:8b".into(),
            paths: vec![
                PathBuf::from("/store/blobs/sha256-aaa"),
                PathBuf::from("/store/blobs/sha256-bbb"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Missing model blob(s) for llama3:8b: /store/blobs/sha256-aaa, /store/blobs/sha256-bbb"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ToolError::UnsupportedPlatform {
            platform: "plan9".into()
        }
        .is_fatal());
        assert!(ToolError::Launch {
            program: "ollama".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
        .is_fatal());
        assert!(!ToolError::ManifestNotFound {
            model: "phi3".into(),
            path: PathBuf::from("/m"),
        }
        .is_fatal());
        assert!(!ToolError::CommandFailed {
            command: "ollama pull phi3".into(),
            exit_code: 1,
            stderr: "pull model manifest: file does not exist".into(),
        }
        .is_fatal());
    }

    #[test]
    fn test_io_with_path() {
        let err = ToolError::io_with_path(
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            "/var/log/x.log",
        );
        match err {
            ToolError::Io { path, source, .. } => {
                assert_eq!(path, Some(PathBuf::from("/var/log/x.log")));
                assert!(source.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
