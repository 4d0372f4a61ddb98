//! # Archive Engine
//!
//! Multi-file persistence of a whole model.
//!
//! Write path:
//! 1. every subsystem file is serialized into a private temporary directory,
//!    one worker thread per file, joined before packaging
//! 2. `MANIFEST.json` records size and xxh3 checksum of each file
//! 3. the directory is packed as a zstd-compressed tar into a temporary
//!    file beside the target, which is then renamed over it
//!
//! Read path unpacks into a temporary directory, checks the manifest and
//! the required files, then decodes identity, registries, coordinate
//! systems and relationships, in that order. A failed read never returns a
//! partially built model.

use super::manifest::{ArchiveLayout, FileContent, FileSpec, Manifest, MissingFiles, xxh3_hex};
use super::persistence::{records_from_bytes, records_to_bytes};
use super::records::{
    COMPONENT_TAG, DecodedRecord, EDGE_TAG, Persisted, TaggedRecord, component_record,
    coordinate_system_record, decode_component_id, decode_edge, decode_identity, decode_record,
    edge_record, identity_record,
};
use crate::config::ArchiveConfig;
use crate::model::ModelCore;
use crate::primitives::MANIFEST_FILE;
use crate::registry::ComponentRegistry;
use crate::types::{ComponentType, LithosError};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Component as PathComponent, Path, PathBuf};
use tar::{Archive, Builder, Header};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Reads and writes one archive layout.
#[derive(Debug, Clone)]
pub struct ArchiveEngine {
    extension: String,
    layout: ArchiveLayout,
    config: ArchiveConfig,
}

impl ArchiveEngine {
    pub fn new(extension: impl Into<String>, layout: ArchiveLayout, config: ArchiveConfig) -> Self {
        Self {
            extension: extension.into(),
            layout,
            config,
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn layout(&self) -> ArchiveLayout {
        self.layout
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    // =========================================================================
    // WRITE
    // =========================================================================

    /// Write `core` at `path`. Nothing appears at `path` unless the whole
    /// archive was produced.
    ///
    /// A core whose registries and graph disagree could not be read back,
    /// so it fails with `InvariantViolation` before any I/O.
    pub fn write(&self, core: &ModelCore, path: &Path) -> Result<(), LithosError> {
        self.config.validate()?;
        core.validate()?;
        let parent = parent_dir(path);
        fs::create_dir_all(&parent)?;

        let workdir = tempfile::Builder::new().prefix(".lithos-").tempdir_in(&parent)?;
        let files = self.serialize_files(core, workdir.path())?;

        let mut manifest = Manifest::new(&self.extension);
        for (spec, data) in &files {
            manifest.add_file(spec, data);
        }
        let manifest_json = manifest.to_json()?;
        fs::write(workdir.path().join(MANIFEST_FILE), &manifest_json)?;

        let mut output = tempfile::Builder::new()
            .prefix(".lithos-")
            .suffix(".part")
            .tempfile_in(&parent)?;
        self.package(workdir.path(), &manifest_json, &manifest, output.as_file_mut())?;
        output.as_file().sync_all()?;
        output.persist(path).map_err(|e| LithosError::Io(e.error))?;

        debug!(
            archive = %path.display(),
            files = files.len(),
            "Archive written"
        );
        Ok(())
    }

    fn serialize_files(
        &self,
        core: &ModelCore,
        dir: &Path,
    ) -> Result<Vec<(FileSpec, Vec<u8>)>, LithosError> {
        let files = self.layout.files;
        if !self.config.parallel_write {
            return files
                .iter()
                .map(|spec| Ok((*spec, self.write_file(core, dir, spec)?)))
                .collect();
        }

        std::thread::scope(|scope| {
            let workers: Vec<_> = files
                .iter()
                .map(|spec| scope.spawn(move || self.write_file(core, dir, spec)))
                .collect();
            workers
                .into_iter()
                .zip(files)
                .map(|(worker, spec)| {
                    let data = worker.join().map_err(|_| {
                        LithosError::SerializationError(format!(
                            "worker serializing {} panicked",
                            spec.name
                        ))
                    })??;
                    Ok((*spec, data))
                })
                .collect()
        })
    }

    fn write_file(
        &self,
        core: &ModelCore,
        dir: &Path,
        spec: &FileSpec,
    ) -> Result<Vec<u8>, LithosError> {
        let data = records_to_bytes(&encode_content(core, spec.content)?)?;
        fs::write(dir.join(spec.name), &data)?;
        debug!(file = spec.name, size = data.len(), checksum = %xxh3_hex(&data), "File serialized");
        Ok(data)
    }

    /// Pack the manifest and every listed file as a zstd-compressed tar.
    fn package(
        &self,
        dir: &Path,
        manifest_json: &[u8],
        manifest: &Manifest,
        output: &mut File,
    ) -> Result<(), LithosError> {
        let encoder = zstd::Encoder::new(BufWriter::new(output), self.config.compression_level)?;
        let mut builder = Builder::new(encoder);
        append_file(&mut builder, MANIFEST_FILE, manifest_json)?;
        for entry in &manifest.files {
            let data = fs::read(dir.join(&entry.name))?;
            append_file(&mut builder, &entry.name, &data)?;
        }
        let encoder = builder.into_inner()?;
        let mut writer = encoder.finish()?;
        writer.flush()?;
        Ok(())
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Rebuild a model core from the archive at `path`.
    pub fn read(&self, path: &Path) -> Result<ModelCore, LithosError> {
        self.config.validate()?;
        let workdir = self.unpack(path)?;
        let dir = workdir.path();

        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(LithosError::missing_file(MANIFEST_FILE));
        }
        let manifest =
            Manifest::from_json(&fs::read(&manifest_path)?).map_err(in_file(path, MANIFEST_FILE))?;

        let mut present = Vec::new();
        for spec in self.layout.files {
            if dir.join(spec.name).is_file() {
                present.push(spec);
            } else if spec.required {
                return Err(LithosError::missing_file(spec.name));
            } else {
                warn!(
                    file = spec.name,
                    archive = %path.display(),
                    "Additional file is missing, using defaults"
                );
            }
        }

        let mut decoded = Vec::with_capacity(present.len());
        for spec in present {
            let data = fs::read(dir.join(spec.name))?;
            self.verify(path, &manifest, spec, &data)?;
            let records =
                records_from_bytes(&data, self.config.max_file_size).map_err(in_file(path, spec.name))?;
            debug!(file = spec.name, size = data.len(), records = records.len(), "File read");
            decoded.push((spec, records));
        }
        decoded.sort_by_key(|(spec, _)| load_phase(spec.content));

        let mut core = ModelCore::default();
        for (spec, records) in &decoded {
            decode_content(&mut core, spec.content, records).map_err(in_file(path, spec.name))?;
        }
        core.validate().map_err(in_file(path, ""))?;

        if core.identity.name.is_empty() {
            if let Some(stem) = path.file_stem() {
                core.identity.name = stem.to_string_lossy().into_owned();
            }
        }
        Ok(core)
    }

    fn verify(
        &self,
        archive: &Path,
        manifest: &Manifest,
        spec: &FileSpec,
        data: &[u8],
    ) -> Result<(), LithosError> {
        let file_path = archive.join(spec.name);
        let entry = manifest
            .entry(spec.name)
            .ok_or_else(|| LithosError::corrupt(&file_path, "file is not listed in the manifest"))?;
        if entry.size != data.len() as u64 {
            return Err(LithosError::corrupt(
                &file_path,
                format!("size {} does not match manifest size {}", data.len(), entry.size),
            ));
        }
        if self.config.verify_checksums {
            let actual = xxh3_hex(data);
            if actual != entry.checksum {
                return Err(LithosError::corrupt(
                    &file_path,
                    format!("checksum mismatch: expected {}, found {actual}", entry.checksum),
                ));
            }
        }
        Ok(())
    }

    /// List missing layout files without decoding any payload.
    pub fn check_missing_files(&self, path: &Path) -> Result<MissingFiles, LithosError> {
        let mut names = BTreeSet::new();
        let mut archive = open_archive(path)?;
        for entry in archive.entries().map_err(|e| LithosError::corrupt(path, e.to_string()))? {
            let entry = entry.map_err(|e| LithosError::corrupt(path, e.to_string()))?;
            let name = entry.path().map_err(|e| LithosError::corrupt(path, e.to_string()))?;
            if let Some(name) = plain_name(&name) {
                names.insert(name);
            }
        }

        let mut missing = MissingFiles::default();
        for spec in self.layout.files {
            if !names.contains(spec.name) {
                let list = if spec.required {
                    &mut missing.required
                } else {
                    &mut missing.additional
                };
                list.push(spec.name.to_string());
            }
        }
        Ok(missing)
    }

    /// Extract every entry into a fresh temporary directory, within the entry
    /// count and size limits of the configuration.
    fn unpack(&self, path: &Path) -> Result<TempDir, LithosError> {
        let mut archive = open_archive(path)?;
        let dir = tempfile::Builder::new().prefix(".lithos-").tempdir()?;
        let corrupt = |e: std::io::Error| LithosError::corrupt(path, e.to_string());

        let mut total = 0u64;
        for (index, entry) in archive.entries().map_err(corrupt)?.enumerate() {
            if index >= self.config.max_archive_entries {
                return Err(LithosError::corrupt(
                    path,
                    format!("more than {} entries", self.config.max_archive_entries),
                ));
            }
            let mut entry = entry.map_err(corrupt)?;
            let entry_path = entry.path().map_err(corrupt)?.into_owned();
            let Some(name) = plain_name(&entry_path) else {
                return Err(LithosError::corrupt(
                    path,
                    format!("unexpected entry {}", entry_path.display()),
                ));
            };
            let size = entry.header().size().map_err(corrupt)?;
            if size > self.config.max_file_size {
                return Err(LithosError::corrupt(
                    path.join(&name),
                    format!("{size} bytes exceeds maximum allowed {}", self.config.max_file_size),
                ));
            }
            total = total.saturating_add(size);
            if total > self.config.max_unpacked_size {
                return Err(LithosError::corrupt(
                    path,
                    format!(
                        "entries exceed {} bytes once unpacked",
                        self.config.max_unpacked_size
                    ),
                ));
            }
            let mut data = Vec::new();
            entry.read_to_end(&mut data).map_err(corrupt)?;
            fs::write(dir.path().join(name), data)?;
        }
        Ok(dir)
    }
}

/// BLAKE3 digest of a whole archive, as hex.
#[cfg(feature = "crypto-hash")]
pub fn archive_digest(path: &Path) -> Result<String, LithosError> {
    let data = fs::read(path)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

// =============================================================================
// CONTENT ENCODING
// =============================================================================

fn encode_content(core: &ModelCore, content: FileContent) -> Result<Vec<TaggedRecord>, LithosError> {
    match content {
        FileContent::Identifier => Ok(vec![identity_record(&core.identity)?]),
        FileContent::Registry(ty) => {
            let registries = &core.registries;
            match ty {
                ComponentType::Fault => registry_records(&registries.faults),
                ComponentType::Horizon => registry_records(&registries.horizons),
                ComponentType::FaultBlock => registry_records(&registries.fault_blocks),
                ComponentType::StratigraphicUnit => {
                    registry_records(&registries.stratigraphic_units)
                }
                other => Err(LithosError::invariant(format!("{other} has no registry"))),
            }
        }
        FileContent::Relationships { ordering_only } => {
            let graph = &core.relationships;
            let mut records = Vec::new();
            if !ordering_only {
                for id in graph.components().filter(|id| !id.ty.is_geological()) {
                    records.push(component_record(id)?);
                }
            }
            for edge in graph.edges() {
                if !ordering_only || edge.kind.is_ordering() {
                    records.push(edge_record(&edge)?);
                }
            }
            Ok(records)
        }
        FileContent::CoordinateSystems => core
            .coordinate_systems
            .iter()
            .map(|(name, system)| {
                let active = core.active_coordinate_system.as_deref() == Some(name.as_str());
                coordinate_system_record(name, system, active)
            })
            .collect(),
    }
}

fn registry_records<T: Persisted>(
    registry: &ComponentRegistry<T>,
) -> Result<Vec<TaggedRecord>, LithosError> {
    registry.iter().map(Persisted::to_record).collect()
}

// =============================================================================
// CONTENT DECODING
// =============================================================================

/// Edges need their endpoints, so relationships load last.
const fn load_phase(content: FileContent) -> u8 {
    match content {
        FileContent::Identifier => 0,
        FileContent::Registry(_) => 1,
        FileContent::CoordinateSystems => 2,
        FileContent::Relationships { .. } => 3,
    }
}

fn decode_content(
    core: &mut ModelCore,
    content: FileContent,
    records: &[TaggedRecord],
) -> Result<(), LithosError> {
    match content {
        FileContent::Identifier => {
            let [record] = records else {
                return Err(LithosError::SerializationError(format!(
                    "expected one identity record, found {}",
                    records.len()
                )));
            };
            core.identity = decode_identity(record)?;
        }
        FileContent::Registry(ty) => {
            for record in records {
                let decoded = decode_record(record)?;
                if decoded.component_type() != Some(ty) {
                    return Err(LithosError::SerializationError(format!(
                        "{} record found in the {ty} registry",
                        record.type_tag
                    )));
                }
                insert_decoded(core, decoded)?;
            }
        }
        FileContent::Relationships { ordering_only } => {
            for record in records {
                match record.type_tag.as_str() {
                    COMPONENT_TAG if !ordering_only => {
                        core.relationships.register_component(decode_component_id(record)?)?;
                    }
                    EDGE_TAG => {
                        let edge = decode_edge(record)?;
                        if ordering_only && !edge.kind.is_ordering() {
                            return Err(LithosError::SerializationError(format!(
                                "{} edge in an ordering-only file",
                                edge.kind
                            )));
                        }
                        core.relationships.add_edge(edge.from, edge.to, edge.kind)?;
                    }
                    other => {
                        return Err(LithosError::SerializationError(format!(
                            "unexpected {other} record in a relationships file"
                        )));
                    }
                }
            }
        }
        FileContent::CoordinateSystems => {
            for record in records {
                let DecodedRecord::CoordinateSystem { name, system, active } = decode_record(record)?
                else {
                    return Err(LithosError::SerializationError(format!(
                        "{} is not a coordinate system",
                        record.type_tag
                    )));
                };
                if active {
                    core.active_coordinate_system = Some(name.clone());
                }
                core.coordinate_systems.insert(name, system);
            }
        }
    }
    Ok(())
}

fn insert_decoded(core: &mut ModelCore, decoded: DecodedRecord) -> Result<(), LithosError> {
    match decoded {
        DecodedRecord::Fault(fault) => core.insert_component(fault),
        DecodedRecord::Horizon(horizon) => core.insert_component(horizon),
        DecodedRecord::FaultBlock(block) => core.insert_component(block),
        DecodedRecord::StratigraphicUnit(unit) => core.insert_component(unit),
        DecodedRecord::CoordinateSystem { name, .. } => Err(LithosError::SerializationError(
            format!("coordinate system {name} found in a registry"),
        )),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Errors raised while decoding one file become `ArchiveCorrupt` naming it.
/// Version and I/O errors keep their own kind.
fn in_file<'a>(archive: &'a Path, name: &'a str) -> impl Fn(LithosError) -> LithosError + 'a {
    move |error| match error {
        LithosError::IncompatibleVersion { .. } | LithosError::Io(_) => error,
        other => {
            let path = if name.is_empty() {
                archive.to_path_buf()
            } else {
                archive.join(name)
            };
            LithosError::corrupt(path, other.to_string())
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn open_archive(path: &Path) -> Result<Archive<zstd::Decoder<'static, BufReader<File>>>, LithosError> {
    let file = File::open(path)?;
    let decoder = zstd::Decoder::new(file)
        .map_err(|e| LithosError::corrupt(path, format!("zstd decode: {e}")))?;
    Ok(Archive::new(decoder))
}

/// Entries must be bare file names; anything with a directory part is
/// rejected.
fn plain_name(path: &Path) -> Option<String> {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(PathComponent::Normal(name)), None) => name.to_str().map(str::to_string),
        _ => None,
    }
}

fn append_file<W: Write>(builder: &mut Builder<W>, name: &str, data: &[u8]) -> Result<(), LithosError> {
    let mut header = Header::new_gnu();
    header.set_path(name)?;
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();
    builder.append(&header, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::HORIZONS_STACK_LAYOUT;
    use crate::model::{HorizonsStack, Model};

    fn stack() -> HorizonsStack {
        let mut stack = HorizonsStack::named("column");
        let mut builder = stack.builder();
        let h = builder.add_horizon().expect("h");
        let u = builder.add_stratigraphic_unit().expect("u");
        builder.set_horizon_above(&h, &u).expect("above");
        stack
    }

    fn engine(config: ArchiveConfig) -> ArchiveEngine {
        ArchiveEngine::new("lt_hst", HORIZONS_STACK_LAYOUT, config)
    }

    #[test]
    fn write_then_read_restores_core() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("column.lt_hst");
        let stack = stack();

        engine(ArchiveConfig::default()).write(stack.core(), &path).expect("write");
        let core = engine(ArchiveConfig::default()).read(&path).expect("read");
        assert_eq!(core.identity, stack.core().identity);
        assert_eq!(core.relationships, stack.core().relationships);
        assert_eq!(core.registries.horizons.len(), 1);
    }

    #[test]
    fn sequential_write_matches_parallel_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let parallel = dir.path().join("a.lt_hst");
        let sequential = dir.path().join("b.lt_hst");
        let stack = stack();

        engine(ArchiveConfig::default()).write(stack.core(), &parallel).expect("write");
        let config = ArchiveConfig {
            parallel_write: false,
            ..ArchiveConfig::default()
        };
        engine(config).write(stack.core(), &sequential).expect("write");
        assert_eq!(
            fs::read(&parallel).expect("read"),
            fs::read(&sequential).expect("read")
        );
    }

    #[test]
    fn no_temporary_entries_are_left_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("column.lt_hst");
        engine(ArchiveConfig::default()).write(stack().core(), &path).expect("write");

        let names: Vec<_> = fs::read_dir(dir.path())
            .expect("list")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("column.lt_hst")]);
    }

    #[test]
    fn invalid_config_fails_before_io() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("column.lt_hst");
        let config = ArchiveConfig {
            compression_level: 0,
            ..ArchiveConfig::default()
        };
        let result = engine(config).write(stack().core(), &path);
        assert!(matches!(result, Err(LithosError::InvalidConfig(_))));
        assert!(!path.exists());
    }

    #[test]
    fn inconsistent_core_is_not_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("column.lt_hst");
        let mut core = stack().into_core();
        let ghost = crate::types::ComponentId::new(ComponentType::Horizon, uuid::Uuid::new_v4());
        core.relationships.register_component(ghost).expect("register");

        let result = engine(ArchiveConfig::default()).write(&core, &path);
        assert!(matches!(result, Err(LithosError::InvariantViolation(_))));
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 0);
    }

    #[test]
    fn aggregate_unpack_limits_are_enforced() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("column.lt_hst");
        engine(ArchiveConfig::default()).write(stack().core(), &path).expect("write");

        let few_entries = ArchiveConfig {
            max_archive_entries: 2,
            ..ArchiveConfig::default()
        };
        let result = engine(few_entries).read(&path);
        assert!(matches!(result, Err(LithosError::ArchiveCorrupt { .. })));

        let small_total = ArchiveConfig {
            max_unpacked_size: 64,
            ..ArchiveConfig::default()
        };
        let result = engine(small_total).read(&path);
        assert!(matches!(result, Err(LithosError::ArchiveCorrupt { .. })));

        engine(ArchiveConfig::default()).read(&path).expect("within limits");
    }

    #[cfg(feature = "crypto-hash")]
    #[test]
    fn digest_is_stable_across_rewrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("column.lt_hst");
        let stack = stack();

        engine(ArchiveConfig::default()).write(stack.core(), &path).expect("write");
        let first = archive_digest(&path).expect("digest");
        engine(ArchiveConfig::default()).write(stack.core(), &path).expect("rewrite");
        assert_eq!(first.len(), 64);
        assert_eq!(archive_digest(&path).expect("digest"), first);
    }

    #[test]
    fn plain_names_only() {
        assert_eq!(plain_name(Path::new("horizons")), Some("horizons".to_string()));
        assert_eq!(plain_name(Path::new("../horizons")), None);
        assert_eq!(plain_name(Path::new("a/horizons")), None);
        assert_eq!(plain_name(Path::new("/horizons")), None);
    }
}
