//! Manifest parsing.
//!
//! Only the layer digests are consumed; every other manifest field is
//! ignored.

use crate::error::{Result, ToolError};
use serde::Deserialize;
use std::path::Path;

/// One content-addressed layer of a model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Layer {
    pub digest: String,
}

/// The parts of an Ollama manifest the tool reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelManifest {
    pub layers: Vec<Layer>,
}

impl ModelManifest {
    /// Read and parse a manifest from disk. Never cached.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| ToolError::io_with_path(e, path))?;
        serde_json::from_slice(&bytes).map_err(|e| ToolError::Json {
            message: format!("Failed to parse manifest {}: {}", path.display(), e),
            source: Some(e),
        })
    }
}

/// Blob file name for a digest: the first `:` becomes `-`.
pub fn blob_file_name(digest: &str) -> String {
    digest.replacen(':', "-", 1)
}
