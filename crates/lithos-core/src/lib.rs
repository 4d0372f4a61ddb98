//! # lithos-core
//!
//! Geological model store - THE LOGIC.
//!
//! Typed geological components (faults, horizons, fault blocks,
//! stratigraphic units) live in per-type registries and are linked by a
//! relationship graph over their ids. On top of that graph sit a single
//! linear stratigraphic stack, an identity-translating clone, and
//! versioned multi-file archives.
//!
//! ## Module Layout
//!
//! - `types`: ids, edge kinds, identity, errors
//! - `components` / `registry`: entity data and typed stores
//! - `relationships` / `ordering`: edge store and the stratigraphic stack
//! - `mapping` / `clone`: bijective id translation and model cloning
//! - `model`: `HorizonsStack` and `StructuralModel` with their builders
//! - `formats` / `io`: archives, extension factories, load/save helpers
//!
//! ## Architectural Constraints
//!
//! - Read access is public; every mutation goes through a builder
//! - Deterministic iteration: `BTreeMap` / `BTreeSet` only
//! - Single writer per model; concurrent readers of an unchanged model are fine
//! - Geometry stays in the mesh kernel; only its ids and point location
//!   cross the boundary

// =============================================================================
// MODULES
// =============================================================================

pub mod clone;
pub mod components;
pub mod config;
pub mod crs;
pub mod formats;
pub mod io;
pub mod kernel;
pub mod mapping;
pub mod model;
pub mod ordering;
pub mod primitives;
pub mod registry;
pub mod relationships;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{ComponentId, ComponentType, Edge, EdgeKind, Identity, LithosError};

// =============================================================================
// RE-EXPORTS: Model Engine
// =============================================================================

pub use clone::{CloneEngine, clone_model};
pub use components::{
    Component, ContactKind, Fault, FaultBlock, FaultKind, Horizon, HorizonKind, StratigraphicUnit,
};
pub use crs::{CoordinateSystem, GeographicInfo};
pub use kernel::{MeshKernel, Point3, PolyhedronRef};
pub use mapping::{BijectiveMapping, CloneMapping, IdentityPolicy};
pub use model::{
    HorizonsStack, HorizonsStackBuilder, InsertedHorizonInfo, Model, ModelCore, Registries,
    StructuralModel, StructuralModelBuilder,
};
pub use ordering::{OrderingBuilder, StratigraphicOrdering};
pub use registry::{ComponentRegistry, RegistryBuilder, RegistryView};
pub use relationships::{RelationshipGraph, RelationshipsBuilder};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use config::ArchiveConfig;
pub use formats::{Archivable, ArchiveEngine, ArchiveFormat, MissingFiles, NativeFormat, register_format};
pub use io::{
    check_missing_files, initialize, is_loadable, load_horizons_stack, load_structural_model,
    read_model, save_horizons_stack, save_structural_model, write_model,
};
