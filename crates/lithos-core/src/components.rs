//! # Geological Components
//!
//! The four entity kinds a model registry can own, and the [`Component`]
//! trait registries are generic over.
//!
//! Components hold descriptive data only (name and domain kind). How they
//! relate to each other lives in the relationship graph, and their geometry
//! lives in the mesh kernel under the same id.

use crate::types::{ComponentId, ComponentType};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

// =============================================================================
// COMPONENT TRAIT
// =============================================================================

/// A component owned by a [`crate::registry::ComponentRegistry`].
pub trait Component: Clone + Debug + Send + Sync + 'static {
    /// Type tag of every id minted for this kind.
    const TYPE: ComponentType;

    /// A default component with the given id.
    fn new(id: Uuid) -> Self;

    fn id(&self) -> Uuid;

    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);

    /// Copy of this component under another id, all other data preserved.
    fn with_id(&self, id: Uuid) -> Self;

    fn component_id(&self) -> ComponentId {
        ComponentId::new(Self::TYPE, self.id())
    }
}

// =============================================================================
// DOMAIN KINDS
// =============================================================================

/// Tectonic kind of a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FaultKind {
    Normal,
    Reverse,
    StrikeSlip,
    Listric,
    Decollement,
}

/// Geological kind of a horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HorizonKind {
    Conformal,
    NonConformal,
    Topography,
    Intrusion,
}

/// How a horizon contacts the units around it in a stack.
///
/// - `Erosion`: the horizon truncates the unit under it
/// - `Baselap`: the unit above it laps onto the horizon
/// - `Discontinuity`: both at once
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum ContactKind {
    #[default]
    Conformal,
    Erosion,
    Baselap,
    Discontinuity,
}

impl ContactKind {
    /// True when the unit under the horizon is eroded by it.
    #[must_use]
    pub const fn erodes_under(self) -> bool {
        matches!(self, Self::Erosion | Self::Discontinuity)
    }

    /// True when the unit above the horizon laps onto it.
    #[must_use]
    pub const fn baselaps_above(self) -> bool {
        matches!(self, Self::Baselap | Self::Discontinuity)
    }
}

// =============================================================================
// FAULT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    id: Uuid,
    name: String,
    kind: Option<FaultKind>,
}

impl Fault {
    #[must_use]
    pub fn kind(&self) -> Option<FaultKind> {
        self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: Option<FaultKind>) {
        self.kind = kind;
    }

    pub(crate) fn from_parts(id: Uuid, name: String, kind: Option<FaultKind>) -> Self {
        Self { id, name, kind }
    }
}

impl Component for Fault {
    const TYPE: ComponentType = ComponentType::Fault;

    fn new(id: Uuid) -> Self {
        Self::from_parts(id, String::new(), None)
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn with_id(&self, id: Uuid) -> Self {
        Self { id, ..self.clone() }
    }
}

// =============================================================================
// HORIZON
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Horizon {
    id: Uuid,
    name: String,
    kind: Option<HorizonKind>,
    contact: ContactKind,
}

impl Horizon {
    #[must_use]
    pub fn kind(&self) -> Option<HorizonKind> {
        self.kind
    }

    #[must_use]
    pub fn contact(&self) -> ContactKind {
        self.contact
    }

    pub(crate) fn set_kind(&mut self, kind: Option<HorizonKind>) {
        self.kind = kind;
    }

    pub(crate) fn set_contact(&mut self, contact: ContactKind) {
        self.contact = contact;
    }

    pub(crate) fn from_parts(
        id: Uuid,
        name: String,
        kind: Option<HorizonKind>,
        contact: ContactKind,
    ) -> Self {
        Self {
            id,
            name,
            kind,
            contact,
        }
    }
}

impl Component for Horizon {
    const TYPE: ComponentType = ComponentType::Horizon;

    fn new(id: Uuid) -> Self {
        Self::from_parts(id, String::new(), None, ContactKind::default())
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn with_id(&self, id: Uuid) -> Self {
        Self { id, ..self.clone() }
    }
}

// =============================================================================
// FAULT BLOCK / STRATIGRAPHIC UNIT
// =============================================================================

/// A volume bounded by faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultBlock {
    id: Uuid,
    name: String,
}

impl Component for FaultBlock {
    const TYPE: ComponentType = ComponentType::FaultBlock;

    fn new(id: Uuid) -> Self {
        Self {
            id,
            name: String::new(),
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn with_id(&self, id: Uuid) -> Self {
        Self { id, ..self.clone() }
    }
}

/// A volume of rock deposited between two horizons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratigraphicUnit {
    id: Uuid,
    name: String,
}

impl Component for StratigraphicUnit {
    const TYPE: ComponentType = ComponentType::StratigraphicUnit;

    fn new(id: Uuid) -> Self {
        Self {
            id,
            name: String::new(),
        }
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn with_id(&self, id: Uuid) -> Self {
        Self { id, ..self.clone() }
    }
}
