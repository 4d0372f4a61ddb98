//! # Formats
//!
//! Versioned multi-file archives of whole models.
//!
//! - `persistence`: header + record list encoding of one subsystem file
//! - `records`: versioned records and the global type table
//! - `manifest`: `MANIFEST.json` and per-format file layouts
//! - `archive`: atomic write and guarded read of a whole archive
//! - `factory`: extension-keyed formats per model kind

mod archive;
mod factory;
mod manifest;
mod persistence;
mod records;

#[cfg(feature = "crypto-hash")]
pub use archive::archive_digest;
pub use archive::ArchiveEngine;
pub use factory::{
    Archivable, ArchiveFormat, FormatFactory, HORIZONS_STACK_LAYOUT, NativeFormat,
    STRUCTURAL_MODEL_LAYOUT, register_format,
};
pub use manifest::{ArchiveLayout, FileContent, FileEntry, FileSpec, Manifest, MissingFiles, xxh3_hex};
pub use persistence::{FileHeader, records_from_bytes, records_to_bytes};
pub use records::{DecodedRecord, RecordDecoder, TaggedRecord, decode_record, register_type, registered_types};

pub(crate) use records::force_type_table;
