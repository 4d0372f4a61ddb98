//! # File Encoding
//!
//! Binary layout of every subsystem file inside an archive.
//!
//! Format: Header (5 bytes) + postcard-serialized list of tagged records.
//! - 4 bytes: Magic ("LITH")
//! - 1 byte: Format major version
//!
//! Sizes and the header are validated before any payload decoding, so a
//! truncated or oversized file never reaches the decoder.

use super::records::TaggedRecord;
use crate::primitives::{FORMAT_VERSION, HEADER_LEN, MAGIC_BYTES};
use crate::types::LithosError;

// =============================================================================
// FILE HEADER
// =============================================================================

/// Header preceding every subsystem file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl FileHeader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    /// Bad magic is a serialization error; another major version is
    /// `IncompatibleVersion`.
    pub fn validate(&self) -> Result<(), LithosError> {
        if &self.magic != MAGIC_BYTES {
            return Err(LithosError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(LithosError::IncompatibleVersion {
                found: u32::from(self.version),
                supported: u32::from(FORMAT_VERSION),
            });
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LithosError> {
        let Some(header) = bytes.get(..HEADER_LEN) else {
            return Err(LithosError::SerializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[0..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Encode records as header + payload. Pure transformation, no I/O.
pub fn records_to_bytes(records: &[TaggedRecord]) -> Result<Vec<u8>, LithosError> {
    let payload = postcard::to_stdvec(records)
        .map_err(|e| LithosError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&FileHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Decode a file produced by [`records_to_bytes`].
///
/// Checks, in order: minimum size, `max_size`, header. Only then is the
/// payload decoded.
pub fn records_from_bytes(bytes: &[u8], max_size: u64) -> Result<Vec<TaggedRecord>, LithosError> {
    if bytes.len() < HEADER_LEN {
        return Err(LithosError::SerializationError(format!(
            "Data too short: minimum {HEADER_LEN} bytes required"
        )));
    }
    if bytes.len() as u64 > max_size {
        return Err(LithosError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            max_size
        )));
    }

    FileHeader::from_bytes(bytes)?.validate()?;

    postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
        LithosError::SerializationError(format!("Failed to deserialize records: {e}"))
    })
}

// =============================================================================
// TESTS
// =============================================================================
