//! # Format Factory
//!
//! Extension-keyed readers and writers, one process-wide factory per model
//! kind. Factories are seeded with the native format on first use and only
//! ever grow afterwards.

use super::archive::ArchiveEngine;
use super::manifest::{ArchiveLayout, FileContent, FileSpec, MissingFiles};
use crate::config::ArchiveConfig;
use crate::model::{HorizonsStack, Model, StructuralModel};
use crate::primitives::{
    COORDINATE_SYSTEMS_FILE, FAULT_BLOCKS_FILE, FAULTS_FILE, HORIZONS_FILE,
    HORIZONS_STACK_EXTENSION, IDENTIFIER_FILE, RELATIONSHIPS_FILE,
    STRATIGRAPHIC_RELATIONSHIPS_FILE, STRATIGRAPHIC_UNITS_FILE, STRUCTURAL_MODEL_EXTENSION,
};
use crate::types::{ComponentType, LithosError};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, LazyLock};

// =============================================================================
// LAYOUTS
// =============================================================================

pub const HORIZONS_STACK_LAYOUT: ArchiveLayout = ArchiveLayout {
    files: &[
        FileSpec::required(IDENTIFIER_FILE, FileContent::Identifier),
        FileSpec::required(HORIZONS_FILE, FileContent::Registry(ComponentType::Horizon)),
        FileSpec::required(
            STRATIGRAPHIC_UNITS_FILE,
            FileContent::Registry(ComponentType::StratigraphicUnit),
        ),
        FileSpec::required(
            STRATIGRAPHIC_RELATIONSHIPS_FILE,
            FileContent::Relationships { ordering_only: true },
        ),
    ],
};

pub const STRUCTURAL_MODEL_LAYOUT: ArchiveLayout = ArchiveLayout {
    files: &[
        FileSpec::required(IDENTIFIER_FILE, FileContent::Identifier),
        FileSpec::required(FAULTS_FILE, FileContent::Registry(ComponentType::Fault)),
        FileSpec::required(HORIZONS_FILE, FileContent::Registry(ComponentType::Horizon)),
        FileSpec::required(FAULT_BLOCKS_FILE, FileContent::Registry(ComponentType::FaultBlock)),
        FileSpec::required(
            STRATIGRAPHIC_UNITS_FILE,
            FileContent::Registry(ComponentType::StratigraphicUnit),
        ),
        FileSpec::required(
            RELATIONSHIPS_FILE,
            FileContent::Relationships { ordering_only: false },
        ),
        FileSpec::additional(COORDINATE_SYSTEMS_FILE, FileContent::CoordinateSystems),
    ],
};

// =============================================================================
// FORMAT TRAIT
// =============================================================================

/// Reader and writer of one archive format for model kind `M`.
pub trait ArchiveFormat<M>: Send + Sync {
    /// Registered extension, without the dot.
    fn extension(&self) -> &str;

    fn layout(&self) -> ArchiveLayout;

    fn required_files(&self) -> Vec<&'static str> {
        self.layout().required_files()
    }

    fn additional_files(&self) -> Vec<&'static str> {
        self.layout().additional_files()
    }

    fn check_missing_files(&self, path: &Path) -> Result<MissingFiles, LithosError>;

    fn read(&self, path: &Path) -> Result<M, LithosError>;

    fn write(&self, model: &M, path: &Path) -> Result<(), LithosError>;
}

/// The built-in archive format, parameterized by extension and config.
pub struct NativeFormat<M> {
    engine: ArchiveEngine,
    _model: PhantomData<fn() -> M>,
}

impl<M: Archivable> NativeFormat<M> {
    /// Native layout of `M` under the given extension.
    pub fn new(extension: impl Into<String>, config: ArchiveConfig) -> Self {
        Self {
            engine: ArchiveEngine::new(extension, M::LAYOUT, config),
            _model: PhantomData,
        }
    }
}

impl<M: Model> ArchiveFormat<M> for NativeFormat<M> {
    fn extension(&self) -> &str {
        self.engine.extension()
    }

    fn layout(&self) -> ArchiveLayout {
        self.engine.layout()
    }

    fn check_missing_files(&self, path: &Path) -> Result<MissingFiles, LithosError> {
        self.engine.check_missing_files(path)
    }

    fn read(&self, path: &Path) -> Result<M, LithosError> {
        M::from_core(self.engine.read(path)?)
    }

    fn write(&self, model: &M, path: &Path) -> Result<(), LithosError> {
        self.engine.write(model.core(), path)
    }
}

// =============================================================================
// FACTORY
// =============================================================================

/// Extension -> format table for one model kind. Keys are lowercase.
pub struct FormatFactory<M> {
    formats: BTreeMap<String, Arc<dyn ArchiveFormat<M>>>,
}

impl<M> Default for FormatFactory<M> {
    fn default() -> Self {
        Self {
            formats: BTreeMap::new(),
        }
    }
}

impl<M> FormatFactory<M> {
    /// Add a format. An extension is never re-bound.
    pub fn register(&mut self, format: Arc<dyn ArchiveFormat<M>>) -> Result<(), LithosError> {
        let key = format.extension().to_ascii_lowercase();
        if key.is_empty() {
            return Err(LithosError::invariant("format extension is empty"));
        }
        if self.formats.contains_key(&key) {
            return Err(LithosError::invariant(format!(
                "extension '{key}' is already registered"
            )));
        }
        self.formats.insert(key, format);
        Ok(())
    }

    pub fn get(&self, extension: &str) -> Option<Arc<dyn ArchiveFormat<M>>> {
        self.formats.get(&extension.to_ascii_lowercase()).cloned()
    }

    pub fn has(&self, extension: &str) -> bool {
        self.formats.contains_key(&extension.to_ascii_lowercase())
    }

    pub fn extensions(&self) -> Vec<String> {
        self.formats.keys().cloned().collect()
    }
}

fn seeded<M: Archivable>() -> RwLock<FormatFactory<M>> {
    let mut factory = FormatFactory::default();
    factory.formats.insert(
        M::NATIVE_EXTENSION.to_string(),
        Arc::new(NativeFormat::<M>::new(M::NATIVE_EXTENSION, ArchiveConfig::default())),
    );
    RwLock::new(factory)
}

static HORIZONS_STACK_FORMATS: LazyLock<RwLock<FormatFactory<HorizonsStack>>> =
    LazyLock::new(seeded::<HorizonsStack>);

static STRUCTURAL_MODEL_FORMATS: LazyLock<RwLock<FormatFactory<StructuralModel>>> =
    LazyLock::new(seeded::<StructuralModel>);

// =============================================================================
// ARCHIVABLE MODELS
// =============================================================================

/// A model kind with a native archive layout and a format factory.
pub trait Archivable: Model + Clone {
    const NATIVE_EXTENSION: &'static str;
    const LAYOUT: ArchiveLayout;

    fn formats() -> &'static RwLock<FormatFactory<Self>>;

    /// Extensions of less specific formats this kind can also use.
    fn parent_extensions() -> Vec<String> {
        Vec::new()
    }

    /// Read through a parent format, `None` when `extension` is not one.
    fn read_with_parent(_extension: &str, _path: &Path) -> Option<Result<Self, LithosError>> {
        None
    }

    /// Write through a parent format, `None` when `extension` is not one.
    fn write_with_parent(
        &self,
        _extension: &str,
        _path: &Path,
    ) -> Option<Result<(), LithosError>> {
        None
    }

    /// Completeness check through a parent format.
    fn parent_missing_files(
        _extension: &str,
        _path: &Path,
    ) -> Option<Result<MissingFiles, LithosError>> {
        None
    }

    fn format(extension: &str) -> Option<Arc<dyn ArchiveFormat<Self>>> {
        Self::formats().read().get(extension)
    }

    /// Own extensions followed by parent ones.
    fn known_extensions() -> Vec<String> {
        let mut known = Self::formats().read().extensions();
        known.extend(Self::parent_extensions());
        known
    }
}

impl Archivable for HorizonsStack {
    const NATIVE_EXTENSION: &'static str = HORIZONS_STACK_EXTENSION;
    const LAYOUT: ArchiveLayout = HORIZONS_STACK_LAYOUT;

    fn formats() -> &'static RwLock<FormatFactory<Self>> {
        &HORIZONS_STACK_FORMATS
    }
}

impl Archivable for StructuralModel {
    const NATIVE_EXTENSION: &'static str = STRUCTURAL_MODEL_EXTENSION;
    const LAYOUT: ArchiveLayout = STRUCTURAL_MODEL_LAYOUT;

    fn formats() -> &'static RwLock<FormatFactory<Self>> {
        &STRUCTURAL_MODEL_FORMATS
    }

    fn parent_extensions() -> Vec<String> {
        HorizonsStack::formats().read().extensions()
    }

    fn read_with_parent(extension: &str, path: &Path) -> Option<Result<Self, LithosError>> {
        let format = HorizonsStack::format(extension)?;
        Some(format.read(path).map(Self::from))
    }

    fn write_with_parent(&self, extension: &str, path: &Path) -> Option<Result<(), LithosError>> {
        let format = HorizonsStack::format(extension)?;
        Some(HorizonsStack::try_from(self.clone()).and_then(|stack| format.write(&stack, path)))
    }

    fn parent_missing_files(
        extension: &str,
        path: &Path,
    ) -> Option<Result<MissingFiles, LithosError>> {
        let format = HorizonsStack::format(extension)?;
        Some(format.check_missing_files(path))
    }
}

/// Register an extra format for model kind `M`.
pub fn register_format<M: Archivable>(format: Arc<dyn ArchiveFormat<M>>) -> Result<(), LithosError> {
    M::formats().write().register(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_formats_are_seeded() {
        assert!(HorizonsStack::format("lt_hst").is_some());
        assert!(HorizonsStack::format("LT_HST").is_some());
        assert!(HorizonsStack::format("lt_strm").is_none());
        assert!(StructuralModel::format("lt_strm").is_some());
    }

    #[test]
    fn structural_model_lists_parent_extensions() {
        let known = StructuralModel::known_extensions();
        assert!(known.contains(&"lt_strm".to_string()));
        assert!(known.contains(&"lt_hst".to_string()));
        assert!(!HorizonsStack::known_extensions().contains(&"lt_strm".to_string()));
    }

    #[test]
    fn extensions_are_never_rebound() {
        let mut factory = FormatFactory::<HorizonsStack>::default();
        let format = || -> Arc<dyn ArchiveFormat<HorizonsStack>> {
            Arc::new(NativeFormat::<HorizonsStack>::new("stk", ArchiveConfig::default()))
        };
        factory.register(format()).expect("register");
        assert!(factory.register(format()).is_err());
        assert_eq!(factory.extensions(), vec!["stk".to_string()]);
    }

    #[test]
    fn layouts_expose_required_and_additional_files() {
        let format = NativeFormat::<StructuralModel>::new("lt_strm", ArchiveConfig::default());
        assert_eq!(format.required_files().len(), 6);
        assert_eq!(format.additional_files(), vec![COORDINATE_SYSTEMS_FILE]);
        let stack_format = NativeFormat::<HorizonsStack>::new("lt_hst", ArchiveConfig::default());
        assert!(stack_format.additional_files().is_empty());
    }
}
