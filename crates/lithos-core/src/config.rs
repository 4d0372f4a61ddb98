//! Archive configuration, read from a TOML document.
//!
//! ```toml
//! # zstd level applied to the packaged archive (1..=22)
//! compression_level = 3
//! # Serialize subsystem files on worker threads
//! parallel_write = true
//! # Check per-file xxh3 checksums on read
//! verify_checksums = true
//! # Largest accepted subsystem file, in bytes
//! max_file_size = 524288000
//! # Most entries and total unpacked bytes accepted in one archive
//! max_archive_entries = 64
//! max_unpacked_size = 2147483648
//! ```

use crate::primitives::{
    DEFAULT_COMPRESSION_LEVEL, MAX_ARCHIVE_ENTRIES, MAX_PERSISTENCE_PAYLOAD_SIZE, MAX_UNPACKED_SIZE,
};
use crate::types::LithosError;
use serde::{Deserialize, Serialize};
use std::path::Path;

const COMPRESSION_LEVELS: std::ops::RangeInclusive<i32> = 1..=22;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub compression_level: i32,
    pub parallel_write: bool,
    pub verify_checksums: bool,
    pub max_file_size: u64,
    pub max_archive_entries: usize,
    pub max_unpacked_size: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            parallel_write: true,
            verify_checksums: true,
            max_file_size: MAX_PERSISTENCE_PAYLOAD_SIZE,
            max_archive_entries: MAX_ARCHIVE_ENTRIES,
            max_unpacked_size: MAX_UNPACKED_SIZE,
        }
    }
}

impl ArchiveConfig {
    /// Parse and validate a TOML document. Missing keys take their default.
    pub fn from_toml_str(text: &str) -> Result<Self, LithosError> {
        let config: Self =
            toml::from_str(text).map_err(|e| LithosError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, LithosError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), LithosError> {
        if !COMPRESSION_LEVELS.contains(&self.compression_level) {
            return Err(LithosError::InvalidConfig(format!(
                "compression_level {} is outside {}..={}",
                self.compression_level,
                COMPRESSION_LEVELS.start(),
                COMPRESSION_LEVELS.end()
            )));
        }
        if self.max_file_size == 0 {
            return Err(LithosError::InvalidConfig(
                "max_file_size must be positive".to_string(),
            ));
        }
        if self.max_archive_entries == 0 || self.max_unpacked_size == 0 {
            return Err(LithosError::InvalidConfig(
                "max_archive_entries and max_unpacked_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = ArchiveConfig::from_toml_str("").expect("parse");
        assert_eq!(config, ArchiveConfig::default());
    }

    #[test]
    fn partial_document_overrides_only_given_keys() {
        let config =
            ArchiveConfig::from_toml_str("compression_level = 9\nparallel_write = false\n")
                .expect("parse");
        assert_eq!(config.compression_level, 9);
        assert!(!config.parallel_write);
        assert!(config.verify_checksums);
    }

    #[test]
    fn out_of_range_level_is_rejected() {
        let result = ArchiveConfig::from_toml_str("compression_level = 40");
        assert!(matches!(result, Err(LithosError::InvalidConfig(_))));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = ArchiveConfig::from_toml_str("durability = \"always\"");
        assert!(matches!(result, Err(LithosError::InvalidConfig(_))));
    }

    #[test]
    fn aggregate_limits_are_configurable() {
        let config =
            ArchiveConfig::from_toml_str("max_archive_entries = 12\nmax_unpacked_size = 4096\n")
                .expect("parse");
        assert_eq!(config.max_archive_entries, 12);
        assert_eq!(config.max_unpacked_size, 4096);
        assert_eq!(config.max_file_size, MAX_PERSISTENCE_PAYLOAD_SIZE);

        let result = ArchiveConfig::from_toml_str("max_archive_entries = 0");
        assert!(matches!(result, Err(LithosError::InvalidConfig(_))));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lithos.toml");
        std::fs::write(&path, "max_file_size = 1024\n").expect("write");
        let config = ArchiveConfig::load(&path).expect("load");
        assert_eq!(config.max_file_size, 1024);
    }
}
