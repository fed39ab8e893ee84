//! Model identifiers (`name` or `name:version`).

use crate::config::StoreConfig;
use crate::error::{Result, ToolError};
use std::fmt;
use std::str::FromStr;

/// A locally stored model, as named on the command line or by `ollama list`.
///
/// Equality is by the exact text given: `phi3` and `phi3:latest` name the
/// same files but are distinct identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelIdentifier {
    raw: String,
    name_len: usize,
    version_start: Option<usize>,
}

impl ModelIdentifier {
    /// Parse an identifier, splitting on the first `:`.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let invalid = |message: &str| ToolError::InvalidModel {
            model: raw.clone(),
            message: message.to_string(),
        };

        let (name_len, version_start) = match raw.find(':') {
            Some(idx) => (idx, Some(idx + 1)),
            None => (raw.len(), None),
        };

        if name_len == 0 {
            return Err(invalid("model name is empty"));
        }
        if version_start.is_some_and(|start| start == raw.len()) {
            return Err(invalid("model version is empty"));
        }
        if raw.contains('\\') {
            return Err(invalid("model identifier contains a backslash"));
        }
        if raw[..name_len]
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..")
        {
            return Err(invalid("model name has an empty or relative path segment"));
        }
        if let Some(start) = version_start {
            let version = &raw[start..];
            if version.contains('/') || version == "." || version == ".." {
                return Err(invalid("model version is not a plain tag"));
            }
        }

        Ok(Self {
            raw,
            name_len,
            version_start,
        })
    }

    /// The identifier exactly as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Model name without the version.
    pub fn name(&self) -> &str {
        &self.raw[..self.name_len]
    }

    /// Version, defaulting to `latest`.
    pub fn version(&self) -> &str {
        match self.version_start {
            Some(start) => &self.raw[start..],
            None => StoreConfig::DEFAULT_TAG,
        }
    }

    /// Path components of the manifest below the `manifests` directory.
    ///
    /// `llama3:8b` maps to `registry.ollama.ai/library/llama3/8b`,
    /// `acme/tiny` to `registry.ollama.ai/acme/tiny/latest`, and a name that
    /// already carries a host (`hf.co/org/model`) keeps it.
    pub fn manifest_components(&self) -> Vec<&str> {
        let parts: Vec<&str> = self.name().split('/').collect();
        let mut components = match parts.len() {
            1 => vec![StoreConfig::REGISTRY_HOST, StoreConfig::DEFAULT_NAMESPACE],
            2 => vec![StoreConfig::REGISTRY_HOST],
            _ => Vec::new(),
        };
        components.extend(parts);
        components.push(self.version());
        components
    }
}

impl FromStr for ModelIdentifier {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ModelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_and_version() {
        let id = ModelIdentifier::parse("llama3:8b").unwrap();
        assert_eq!(id.name(), "llama3");
        assert_eq!(id.version(), "8b");
        assert_eq!(id.as_str(), "llama3:8b");
    }

    #[test]
    fn test_version_defaults_to_latest() {
        let id: ModelIdentifier = "phi3".parse().unwrap();
        assert_eq!(id.name(), "phi3");
        assert_eq!(id.version(), "latest");
        assert_eq!(id.to_string(), "phi3");
    }

    #[test]
    fn test_splits_on_first_colon_only() {
        let id = ModelIdentifier::parse("odd:v1:extra").unwrap();
        assert_eq!(id.name(), "odd");
        assert_eq!(id.version(), "v1:extra");
    }

    #[test]
    fn test_equality_is_textual() {
        let bare = ModelIdentifier::parse("phi3").unwrap();
        let tagged = ModelIdentifier::parse("phi3:latest").unwrap();
        assert_ne!(bare, tagged);
        assert_eq!(bare.version(), tagged.version());
    }

    #[test]
    fn test_manifest_components() {
        let id = ModelIdentifier::parse("llama3:8b").unwrap();
        assert_eq!(
            id.manifest_components(),
            vec!["registry.ollama.ai", "library", "llama3", "8b"]
        );

        let id = ModelIdentifier::parse("acme/tiny").unwrap();
        assert_eq!(
            id.manifest_components(),
            vec!["registry.ollama.ai", "acme", "tiny", "latest"]
        );

        let id = ModelIdentifier::parse("hf.co/org/model:Q4_K_M").unwrap();
        assert_eq!(
            id.manifest_components(),
            vec!["hf.co", "org", "model", "Q4_K_M"]
        );
    }

    #[test]
    fn test_invalid_identifiers() {
        for raw in ["", ":8b", "llama3:", "../etc:x", "a//b", "acme/..", "x:../y", "x:..", "a\\b"] {
            assert!(
                matches!(
                    ModelIdentifier::parse(raw),
                    Err(ToolError::InvalidModel { .. })
                ),
                "{raw:?} should be rejected"
            );
        }
    }
}
