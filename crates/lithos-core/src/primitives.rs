//! # Format Primitives
//!
//! Compiled-in constants for the archive formats.
//!
//! Archive layout:
//! - one file per subsystem, each starting with the 5-byte header
//!   (magic bytes + format major version) followed by a postcard payload
//! - `MANIFEST.json` listing every file with its checksum

/// Magic bytes for every Lithos subsystem file.
///
/// - File Header = Magic Bytes ("LITH") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"LITH";

/// Current format major version.
///
/// Increment this only for breaking changes. Additive record changes are
/// handled by per-record schema versions instead.
pub const FORMAT_VERSION: u8 = 1;

/// Size of the per-file header.
pub const HEADER_LEN: usize = 5;

/// Maximum accepted size of a single subsystem file, checked before decoding.
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: u64 = 500 * 1024 * 1024; // 500 MB

/// Maximum number of entries accepted in one archive.
pub const MAX_ARCHIVE_ENTRIES: usize = 64;

/// Maximum total size of the entries of one archive, checked while unpacking.
pub const MAX_UNPACKED_SIZE: u64 = 2 * 1024 * 1024 * 1024; // 2 GB

/// Default zstd compression level for packaged archives.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

// =============================================================================
// NATIVE EXTENSIONS
// =============================================================================

/// Native extension of horizons stack archives.
pub const HORIZONS_STACK_EXTENSION: &str = "lt_hst";

/// Native extension of structural model archives.
pub const STRUCTURAL_MODEL_EXTENSION: &str = "lt_strm";

// =============================================================================
// ARCHIVE FILE NAMES
// =============================================================================

pub const MANIFEST_FILE: &str = "MANIFEST.json";
pub const IDENTIFIER_FILE: &str = "identifier";
pub const FAULTS_FILE: &str = "faults";
pub const HORIZONS_FILE: &str = "horizons";
pub const FAULT_BLOCKS_FILE: &str = "fault_blocks";
pub const STRATIGRAPHIC_UNITS_FILE: &str = "stratigraphic_units";
pub const RELATIONSHIPS_FILE: &str = "relationships";
pub const STRATIGRAPHIC_RELATIONSHIPS_FILE: &str = "stratigraphic_relationships";
pub const COORDINATE_SYSTEMS_FILE: &str = "coordinate_systems";
