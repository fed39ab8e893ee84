//! Model store resolution.
//!
//! The Ollama store keeps manifests under
//! `manifests/<registry>/<namespace>/<name>/<version>` and content-addressed
//! layers under `blobs/<algo>-<hex>`. Blobs are shared between models, so
//! resolving a model yields exactly the files one backup must contain.

mod identifier;
mod manifest;

pub use identifier::ModelIdentifier;
pub use manifest::{blob_file_name, Layer, ModelManifest};

use crate::config::StoreConfig;
use crate::error::{Result, ToolError};
use crate::platform::PlatformProfile;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The exact set of files backing one model version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFileSet {
    /// Root of the store the paths below belong to.
    pub store_root: PathBuf,
    /// Blob files, in manifest layer order.
    pub blob_paths: Vec<PathBuf>,
    pub manifest_path: PathBuf,
}

impl ModelFileSet {
    /// Every file, blobs first and the manifest last.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.blob_paths
            .iter()
            .map(PathBuf::as_path)
            .chain(std::iter::once(self.manifest_path.as_path()))
    }
}

/// Resolves model identifiers against a store root.
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store at the profile's models root.
    ///
    /// Fails with `UnsupportedPlatform` when the host has no default root.
    pub fn from_profile(profile: &PlatformProfile) -> Result<Self> {
        Ok(Self::new(profile.models_root()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifests_dir(&self) -> PathBuf {
        self.root.join(StoreConfig::MANIFESTS_DIR)
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.root.join(StoreConfig::BLOBS_DIR)
    }

    pub fn manifest_path(&self, model: &ModelIdentifier) -> PathBuf {
        let mut path = self.manifests_dir();
        path.extend(model.manifest_components());
        path
    }

    pub fn blob_path(&self, digest: &str) -> PathBuf {
        self.blobs_dir().join(blob_file_name(digest))
    }

    /// Resolve a model into the blob files its manifest references plus the
    /// manifest itself.
    ///
    /// The manifest is re-read on every call. Fails with `ManifestNotFound`
    /// when the manifest is absent and with `BlobMissing` naming every
    /// absent blob.
    pub fn resolve(&self, model: &ModelIdentifier) -> Result<ModelFileSet> {
        let manifest_path = self.manifest_path(model);
        if !manifest_path.is_file() {
            return Err(ToolError::ManifestNotFound {
                model: model.to_string(),
                path: manifest_path,
            });
        }

        let manifest = ModelManifest::load(&manifest_path)?;
        let mut seen = HashSet::new();
        let mut blob_paths = Vec::with_capacity(manifest.layers.len());
        for layer in &manifest.layers {
            if !is_safe_digest(&layer.digest) {
                return Err(ToolError::InvalidModel {
                    model: model.to_string(),
                    message: format!("manifest lists unsafe layer digest {:?}", layer.digest),
                });
            }
            // Layers may repeat; each blob is one archive entry.
            if seen.insert(layer.digest.as_str()) {
                blob_paths.push(self.blob_path(&layer.digest));
            }
        }

        let missing: Vec<PathBuf> = blob_paths
            .iter()
            .filter(|path| !path.is_file())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ToolError::BlobMissing {
                model: model.to_string(),
                paths: missing,
            });
        }

        debug!(
            "Resolved {} to {} blob(s) via {}",
            model,
            blob_paths.len(),
            manifest_path.display()
        );

        Ok(ModelFileSet {
            store_root: self.root.clone(),
            blob_paths,
            manifest_path,
        })
    }
}

/// A digest must name a single file directly inside `blobs/`.
fn is_safe_digest(digest: &str) -> bool {
    !digest.is_empty()
        && !digest.contains(['/', '\\'])
        && !digest.contains("..")
}
