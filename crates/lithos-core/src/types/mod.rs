//! # Core Type Definitions
//!
//! This module contains the types shared by every subsystem of the store:
//! - Component identifiers (`ComponentType`, `ComponentId`)
//! - Relationship edges (`EdgeKind`, `Edge`)
//! - Model identity metadata (`Identity`)
//! - Error types (`LithosError`)
//!
//! ## Ordering Guarantees
//!
//! Every identifier implements `Ord` so that registries and graphs can use
//! `BTreeMap`/`BTreeSet` and iterate in a stable order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// COMPONENT TYPES
// =============================================================================

/// Type tag carried by every component id.
///
/// The first four kinds are geological entities owned by a model registry.
/// The remaining kinds belong to the mesh kernel: their data lives outside
/// this crate, they only appear in the relationship graph as foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    Fault,
    Horizon,
    FaultBlock,
    StratigraphicUnit,
    Corner,
    Line,
    Surface,
    Block,
}

impl ComponentType {
    /// All geological kinds, in registry order.
    pub const GEOLOGICAL: [ComponentType; 4] = [
        ComponentType::Fault,
        ComponentType::Horizon,
        ComponentType::FaultBlock,
        ComponentType::StratigraphicUnit,
    ];

    /// Stable tag used in archives and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fault => "Fault",
            Self::Horizon => "Horizon",
            Self::FaultBlock => "FaultBlock",
            Self::StratigraphicUnit => "StratigraphicUnit",
            Self::Corner => "Corner",
            Self::Line => "Line",
            Self::Surface => "Surface",
            Self::Block => "Block",
        }
    }

    /// Parse a tag produced by [`ComponentType::as_str`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Fault" => Some(Self::Fault),
            "Horizon" => Some(Self::Horizon),
            "FaultBlock" => Some(Self::FaultBlock),
            "StratigraphicUnit" => Some(Self::StratigraphicUnit),
            "Corner" => Some(Self::Corner),
            "Line" => Some(Self::Line),
            "Surface" => Some(Self::Surface),
            "Block" => Some(Self::Block),
            _ => None,
        }
    }

    /// True for kinds stored in a model registry.
    #[must_use]
    pub const fn is_geological(self) -> bool {
        matches!(
            self,
            Self::Fault | Self::Horizon | Self::FaultBlock | Self::StratigraphicUnit
        )
    }

    /// True for kinds allowed in a stratigraphic stack.
    #[must_use]
    pub const fn is_stratigraphic(self) -> bool {
        matches!(self, Self::Horizon | Self::StratigraphicUnit)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed unique identifier of one component.
///
/// Immutable once created. The uuid alone is unique per type; the pair is
/// what the relationship graph stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId {
    pub ty: ComponentType,
    pub id: Uuid,
}

impl ComponentId {
    /// Lower bound of the id ordering, for range scans.
    pub(crate) const MIN: Self = Self::new(ComponentType::Fault, Uuid::nil());
    /// Upper bound of the id ordering, for range scans.
    pub(crate) const MAX: Self = Self::new(ComponentType::Block, Uuid::from_u128(u128::MAX));

    #[must_use]
    pub const fn new(ty: ComponentType, id: Uuid) -> Self {
        Self { ty, id }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ty, self.id)
    }
}

// =============================================================================
// EDGES
// =============================================================================

/// Kind of a relationship edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// `from` is a boundary of `to`.
    Boundary,
    /// `from` is incident to `to` (`to` bounds `from`).
    Incidence,
    /// `from` is an item of the collection `to`.
    CollectionItem,
    /// `from` lies directly above `to`.
    Above,
    /// `from` lies directly under `to`.
    Under,
}

impl EdgeKind {
    /// Kinds restricted to one outgoing edge per node.
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(self, Self::Above | Self::Under)
    }

    /// The kind stored in the opposite direction for mirrored relations.
    #[must_use]
    pub const fn mirror(self) -> Option<Self> {
        match self {
            Self::Above => Some(Self::Under),
            Self::Under => Some(Self::Above),
            Self::Boundary => Some(Self::Incidence),
            Self::Incidence => Some(Self::Boundary),
            Self::CollectionItem => None,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boundary => "Boundary",
            Self::Incidence => "Incidence",
            Self::CollectionItem => "CollectionItem",
            Self::Above => "Above",
            Self::Under => "Under",
        };
        f.write_str(name)
    }
}

/// A directed, typed relationship between two registered components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: ComponentId,
    pub to: ComponentId,
    pub kind: EdgeKind,
}

impl Edge {
    #[must_use]
    pub const fn new(from: ComponentId, to: ComponentId, kind: EdgeKind) -> Self {
        Self { from, to, kind }
    }

    /// The mirrored counterpart, when the kind has one.
    #[must_use]
    pub fn mirrored(&self) -> Option<Self> {
        self.kind.mirror().map(|kind| Self::new(self.to, self.from, kind))
    }
}

// =============================================================================
// MODEL IDENTITY
// =============================================================================

/// Identity metadata of a whole model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
}

impl Identity {
    /// A fresh identity with an empty name.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Lithos store.
///
/// - No silent failures
/// - Use `Result<T, LithosError>` for fallible operations
/// - A failed read never yields a partially populated model
#[derive(Debug, Error)]
pub enum LithosError {
    #[error("Component not found: {0}")]
    ComponentNotFound(ComponentId),

    #[error("Edge not found: {kind} from {from} to {to}")]
    EdgeNotFound {
        from: ComponentId,
        to: ComponentId,
        kind: EdgeKind,
    },

    #[error("Duplicate id: {0}")]
    DuplicateId(ComponentId),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Mapping error: {0}")]
    MappingError(String),

    #[error("Missing required archive file: {file}")]
    MissingFile { file: String },

    #[error("Corrupt archive file {}: {reason}", path.display())]
    ArchiveCorrupt { path: PathBuf, reason: String },

    #[error("Incompatible format version {found} (supported: {supported})")]
    IncompatibleVersion { found: u32, supported: u32 },

    #[error("Unknown extension '{extension}' for {kind} (known: {})", known.join(", "))]
    UnknownExtension {
        kind: &'static str,
        extension: String,
        known: Vec<String>,
    },

    #[error("Cannot load {kind} from file: {}", path.display())]
    CannotLoad { kind: &'static str, path: PathBuf },

    #[error("Cannot save {kind} in file: {}", path.display())]
    CannotSave { kind: &'static str, path: PathBuf },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LithosError {
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub(crate) fn mapping(msg: impl Into<String>) -> Self {
        Self::MappingError(msg.into())
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ArchiveCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing_file(file: impl Into<String>) -> Self {
        Self::MissingFile { file: file.into() }
    }

    /// True for both the component and the edge flavour of "not found".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ComponentNotFound(_) | Self::EdgeNotFound { .. })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_roundtrip() {
        for ty in [
            ComponentType::Fault,
            ComponentType::Horizon,
            ComponentType::FaultBlock,
            ComponentType::StratigraphicUnit,
            ComponentType::Corner,
            ComponentType::Line,
            ComponentType::Surface,
            ComponentType::Block,
        ] {
            assert_eq!(ComponentType::from_tag(ty.as_str()), Some(ty));
        }
        assert_eq!(ComponentType::from_tag("Polygon"), None);
    }

    #[test]
    fn only_ordering_kinds_mirror_into_ordering_kinds() {
        assert_eq!(EdgeKind::Above.mirror(), Some(EdgeKind::Under));
        assert_eq!(EdgeKind::Boundary.mirror(), Some(EdgeKind::Incidence));
        assert_eq!(EdgeKind::CollectionItem.mirror(), None);
        assert!(EdgeKind::Under.is_ordering());
        assert!(!EdgeKind::Incidence.is_ordering());
    }

    #[test]
    fn mirrored_edge_swaps_endpoints() {
        let a = ComponentId::new(ComponentType::Horizon, Uuid::new_v4());
        let b = ComponentId::new(ComponentType::StratigraphicUnit, Uuid::new_v4());
        let edge = Edge::new(a, b, EdgeKind::Above);
        assert_eq!(edge.mirrored(), Some(Edge::new(b, a, EdgeKind::Under)));
    }

    #[test]
    fn unknown_extension_lists_known() {
        let err = LithosError::UnknownExtension {
            kind: "HorizonsStack",
            extension: "xyz".to_string(),
            known: vec!["lt_hst".to_string(), "lt_strm".to_string()],
        };
        let text = err.to_string();
        assert!(text.contains("xyz"));
        assert!(text.contains("lt_hst, lt_strm"));
    }
}
