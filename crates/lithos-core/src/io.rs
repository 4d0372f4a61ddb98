//! # Load / Save
//!
//! Extension-dispatched entry points over the format factories.
//!
//! The typed functions (`read_model`, `write_model`) return the precise
//! error. The `load_*` / `save_*` helpers log that error with the file, the
//! requested extension and the available ones, then return a single
//! `CannotLoad` / `CannotSave`.

use crate::formats::{Archivable, MissingFiles, force_type_table};
use crate::model::{HorizonsStack, StructuralModel};
use crate::types::LithosError;
use std::path::Path;
use std::sync::Once;
use std::time::Instant;
use tracing::{error, info};

/// Lowercase extension of `path`, empty when it has none.
fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn unknown_extension<M: Archivable>(extension: String) -> LithosError {
    LithosError::UnknownExtension {
        kind: M::KIND,
        extension,
        known: M::known_extensions(),
    }
}

/// Force the type table and every format factory. Later calls are no-ops.
pub fn initialize() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let types = force_type_table();
        info!(
            types,
            horizons_stack = ?HorizonsStack::known_extensions(),
            structural_model = ?StructuralModel::known_extensions(),
            "Archive formats registered"
        );
    });
}

// =============================================================================
// TYPED ENTRY POINTS
// =============================================================================

/// Read a model, dispatching on the extension of `path`.
///
/// An unknown extension fails before any I/O.
pub fn read_model<M: Archivable>(path: &Path) -> Result<M, LithosError> {
    let extension = extension_of(path);
    if let Some(format) = M::format(&extension) {
        return format.read(path);
    }
    M::read_with_parent(&extension, path).unwrap_or_else(|| Err(unknown_extension::<M>(extension)))
}

/// Write a model, dispatching on the extension of `path`.
pub fn write_model<M: Archivable>(model: &M, path: &Path) -> Result<(), LithosError> {
    let extension = extension_of(path);
    if let Some(format) = M::format(&extension) {
        return format.write(model, path);
    }
    model
        .write_with_parent(&extension, path)
        .unwrap_or_else(|| Err(unknown_extension::<M>(extension)))
}

/// Required and additional files absent from the archive at `path`.
pub fn check_missing_files<M: Archivable>(path: &Path) -> Result<MissingFiles, LithosError> {
    let extension = extension_of(path);
    if let Some(format) = M::format(&extension) {
        return format.check_missing_files(path);
    }
    M::parent_missing_files(&extension, path)
        .unwrap_or_else(|| Err(unknown_extension::<M>(extension)))
}

/// True when the extension is known and no required file is missing.
pub fn is_loadable<M: Archivable>(path: &Path) -> bool {
    check_missing_files::<M>(path).is_ok_and(|missing| !missing.has_missing_required())
}

// =============================================================================
// COARSE HELPERS
// =============================================================================

fn load<M: Archivable>(path: &Path) -> Result<M, LithosError> {
    let started = Instant::now();
    match read_model::<M>(path) {
        Ok(model) => {
            info!(
                file = %path.display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "{} has: {}",
                M::KIND,
                model.component_summary()
            );
            Ok(model)
        }
        Err(err) => {
            error!(
                file = %path.display(),
                extension = %extension_of(path),
                available = ?M::known_extensions(),
                error = %err,
                "Cannot load {}",
                M::KIND
            );
            Err(LithosError::CannotLoad {
                kind: M::KIND,
                path: path.to_path_buf(),
            })
        }
    }
}

fn save<M: Archivable>(model: &M, path: &Path) -> Result<(), LithosError> {
    let started = Instant::now();
    match write_model(model, path) {
        Ok(()) => {
            info!(
                file = %path.display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "{} saved with: {}",
                M::KIND,
                model.component_summary()
            );
            Ok(())
        }
        Err(err) => {
            error!(
                file = %path.display(),
                extension = %extension_of(path),
                available = ?M::known_extensions(),
                error = %err,
                "Cannot save {}",
                M::KIND
            );
            Err(LithosError::CannotSave {
                kind: M::KIND,
                path: path.to_path_buf(),
            })
        }
    }
}

pub fn load_horizons_stack(path: &Path) -> Result<HorizonsStack, LithosError> {
    load(path)
}

pub fn save_horizons_stack(stack: &HorizonsStack, path: &Path) -> Result<(), LithosError> {
    save(stack, path)
}

pub fn load_structural_model(path: &Path) -> Result<StructuralModel, LithosError> {
    load(path)
}

pub fn save_structural_model(model: &StructuralModel, path: &Path) -> Result<(), LithosError> {
    save(model, path)
}
