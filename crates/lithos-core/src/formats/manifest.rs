//! Archive manifest and per-format file layout.
//!
//! `MANIFEST.json` is the only human-readable file of an archive. It lists
//! every subsystem file with its size and xxh3 checksum, and whether a
//! reader must fail when the file is absent.

use crate::primitives::{FORMAT_VERSION, MANIFEST_FILE};
use crate::types::{ComponentType, LithosError};
use serde::{Deserialize, Serialize};

/// Hex xxh3 digest used for per-file checksums.
pub fn xxh3_hex(data: &[u8]) -> String {
    use xxhash_rust::xxh3::xxh3_64;
    format!("{:016x}", xxh3_64(data))
}

// =============================================================================
// LAYOUT
// =============================================================================

/// What a subsystem file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileContent {
    /// Model identity metadata.
    Identifier,
    /// Every component of one registry.
    Registry(ComponentType),
    /// Registered mesh pieces and every edge of the given kinds.
    Relationships { ordering_only: bool },
    /// Named coordinate systems.
    CoordinateSystems,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSpec {
    pub name: &'static str,
    pub required: bool,
    pub content: FileContent,
}

impl FileSpec {
    pub const fn required(name: &'static str, content: FileContent) -> Self {
        Self {
            name,
            required: true,
            content,
        }
    }

    pub const fn additional(name: &'static str, content: FileContent) -> Self {
        Self {
            name,
            required: false,
            content,
        }
    }
}

/// Files making up one archive format, in write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLayout {
    pub files: &'static [FileSpec],
}

impl ArchiveLayout {
    /// Absence of any of these fails a read.
    pub fn required_files(&self) -> Vec<&'static str> {
        self.files.iter().filter(|f| f.required).map(|f| f.name).collect()
    }

    /// These may be absent; a default is used instead.
    pub fn additional_files(&self) -> Vec<&'static str> {
        self.files.iter().filter(|f| !f.required).map(|f| f.name).collect()
    }

    pub fn spec(&self, name: &str) -> Option<&FileSpec> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Result of a completeness pre-check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingFiles {
    pub required: Vec<String>,
    pub additional: Vec<String>,
}

impl MissingFiles {
    /// True when a read would fail on a missing required file.
    #[must_use]
    pub fn has_missing_required(&self) -> bool {
        !self.required.is_empty()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.required.is_empty() && self.additional.is_empty()
    }
}

// =============================================================================
// MANIFEST
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub required: bool,
    pub size: u64,
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Extension of the format that wrote the archive.
    pub extension: String,
    pub format_version: u32,
    /// Crate and version that wrote the archive.
    pub producer: String,
    /// Checksum algorithm of every entry (currently "xxh3").
    pub checksum_algorithm: String,
    pub files: Vec<FileEntry>,
}

impl Manifest {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            format_version: u32::from(FORMAT_VERSION),
            producer: concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")).to_string(),
            checksum_algorithm: "xxh3".to_string(),
            files: Vec::new(),
        }
    }

    pub fn add_file(&mut self, spec: &FileSpec, data: &[u8]) {
        self.files.push(FileEntry {
            name: spec.name.to_string(),
            required: spec.required,
            size: data.len() as u64,
            checksum: xxh3_hex(data),
        });
    }

    pub fn entry(&self, name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, LithosError> {
        serde_json::to_vec_pretty(self).map_err(|e| LithosError::SerializationError(e.to_string()))
    }

    /// Parse and check the format version. A manifest that does not parse
    /// is a serialization error; another version is `IncompatibleVersion`.
    pub fn from_json(data: &[u8]) -> Result<Self, LithosError> {
        let manifest: Self = serde_json::from_slice(data).map_err(|e| {
            LithosError::SerializationError(format!("{MANIFEST_FILE}: {e}"))
        })?;
        if manifest.format_version != u32::from(FORMAT_VERSION) {
            return Err(LithosError::IncompatibleVersion {
                found: manifest.format_version,
                supported: u32::from(FORMAT_VERSION),
            });
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{COORDINATE_SYSTEMS_FILE, IDENTIFIER_FILE};

    const LAYOUT: ArchiveLayout = ArchiveLayout {
        files: &[
            FileSpec::required(IDENTIFIER_FILE, FileContent::Identifier),
            FileSpec::additional(COORDINATE_SYSTEMS_FILE, FileContent::CoordinateSystems),
        ],
    };

    #[test]
    fn layout_splits_required_and_additional() {
        assert_eq!(LAYOUT.required_files(), vec![IDENTIFIER_FILE]);
        assert_eq!(LAYOUT.additional_files(), vec![COORDINATE_SYSTEMS_FILE]);
        assert!(LAYOUT.spec("nope").is_none());
    }

    #[test]
    fn manifest_json_roundtrip() {
        let mut manifest = Manifest::new("lt_hst");
        manifest.add_file(&LAYOUT.files[0], b"payload");
        let json = manifest.to_json().expect("json");
        let restored = Manifest::from_json(&json).expect("parse");
        assert_eq!(restored, manifest);
        let entry = restored.entry(IDENTIFIER_FILE).expect("entry");
        assert_eq!(entry.size, 7);
        assert_eq!(entry.checksum, xxh3_hex(b"payload"));
    }

    #[test]
    fn other_format_version_is_incompatible() {
        let mut manifest = Manifest::new("lt_hst");
        manifest.format_version = 99;
        let json = serde_json::to_vec(&manifest).expect("json");
        assert!(matches!(
            Manifest::from_json(&json),
            Err(LithosError::IncompatibleVersion { found: 99, .. })
        ));
    }

    #[test]
    fn checksum_is_stable_hex() {
        let hash = xxh3_hex(b"hello world");
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(xxh3_hex(b"hello"), xxh3_hex(b"world"));
    }
}
