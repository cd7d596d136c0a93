use std::path::Path;

use serde::{Deserialize, Serialize};

use seisgraph_core::{ArchiveError, ArchiveResult, Version};

/// Stream compression applied to XML documents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Zlib,
    Gzip,
}

/// Settings specific to the XML binding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlConfig {
    /// Indent nested elements by two spaces.
    pub formatted_output: bool,
    /// Compression of the written document. When reading, `None` means
    /// auto-detect from the stream's magic bytes.
    pub compression: Compression,
    /// Name of the document element carrying the `version` attribute.
    /// Empty means the first object becomes the document element.
    pub root_tag: String,
    /// Optional `xmlns` written on the document element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            formatted_output: false,
            compression: Compression::None,
            root_tag: "seiscomp".to_string(),
            namespace: None,
        }
    }
}

/// Configuration shared by the archive bindings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Undecodable optional values invalidate their enclosing object instead
    /// of being read as absent.
    pub strict: bool,
    /// Version stamped on written archives. Falls back to the schema version
    /// passed to `create_with`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_version: Option<Version>,
    pub xml: XmlConfig,
}

impl ArchiveConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> ArchiveResult<Self> {
        toml::from_str(text).map_err(|e| ArchiveError::Config(e.to_string()))
    }

    /// Load a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> ArchiveResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> ArchiveResult<String> {
        toml::to_string_pretty(self).map_err(|e| ArchiveError::Config(e.to_string()))
    }

    /// The version to stamp on a new archive.
    pub fn version_or(&self, schema_version: Version) -> Version {
        self.write_version.unwrap_or(schema_version)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
