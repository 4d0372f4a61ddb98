//! # Models
//!
//! A model is identity metadata, one registry per geological component
//! type, a relationship graph over their ids, and (for structural models)
//! coordinate systems.
//!
//! Both concrete models wrap the same [`ModelCore`]; the [`Model`] trait is
//! the uniform accessor over it. Each model exposes a read-only surface and
//! a separate builder holding the only mutable borrow.

mod stack;
mod structural;

pub use stack::{HorizonsStack, HorizonsStackBuilder, InsertedHorizonInfo};
pub use structural::{StructuralModel, StructuralModelBuilder};

use crate::components::{Component, Fault, FaultBlock, Horizon, StratigraphicUnit};
use crate::crs::CoordinateSystem;
use crate::ordering::StratigraphicOrdering;
use crate::registry::{ComponentRegistry, RegistryBuilder, RegistryView};
use crate::relationships::{RelationshipGraph, RelationshipsBuilder};
use crate::types::{ComponentId, ComponentType, Identity, LithosError};
use std::collections::BTreeMap;
use uuid::Uuid;

// =============================================================================
// REGISTRIES
// =============================================================================

/// One registry per geological component type.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub(crate) faults: ComponentRegistry<Fault>,
    pub(crate) horizons: ComponentRegistry<Horizon>,
    pub(crate) fault_blocks: ComponentRegistry<FaultBlock>,
    pub(crate) stratigraphic_units: ComponentRegistry<StratigraphicUnit>,
}

impl Registries {
    /// Type-erased access by tag. `None` for mesh-kernel types.
    #[must_use]
    pub fn view(&self, ty: ComponentType) -> Option<&dyn RegistryView> {
        match ty {
            ComponentType::Fault => Some(&self.faults),
            ComponentType::Horizon => Some(&self.horizons),
            ComponentType::FaultBlock => Some(&self.fault_blocks),
            ComponentType::StratigraphicUnit => Some(&self.stratigraphic_units),
            _ => None,
        }
    }

    #[must_use]
    pub fn contains(&self, id: &ComponentId) -> bool {
        self.view(id.ty).is_some_and(|registry| registry.contains(&id.id))
    }

    #[must_use]
    pub fn len_of(&self, ty: ComponentType) -> usize {
        self.view(ty).map_or(0, |registry| registry.len())
    }

    pub fn faults(&self) -> &ComponentRegistry<Fault> {
        &self.faults
    }

    pub fn horizons(&self) -> &ComponentRegistry<Horizon> {
        &self.horizons
    }

    pub fn fault_blocks(&self) -> &ComponentRegistry<FaultBlock> {
        &self.fault_blocks
    }

    pub fn stratigraphic_units(&self) -> &ComponentRegistry<StratigraphicUnit> {
        &self.stratigraphic_units
    }
}

/// Components stored in a model registry.
pub trait Stored: Component {
    fn registry(registries: &Registries) -> &ComponentRegistry<Self>;

    fn registry_mut(registries: &mut Registries) -> &mut ComponentRegistry<Self>;
}

impl Stored for Fault {
    fn registry(registries: &Registries) -> &ComponentRegistry<Self> {
        &registries.faults
    }

    fn registry_mut(registries: &mut Registries) -> &mut ComponentRegistry<Self> {
        &mut registries.faults
    }
}

impl Stored for Horizon {
    fn registry(registries: &Registries) -> &ComponentRegistry<Self> {
        &registries.horizons
    }

    fn registry_mut(registries: &mut Registries) -> &mut ComponentRegistry<Self> {
        &mut registries.horizons
    }
}

impl Stored for FaultBlock {
    fn registry(registries: &Registries) -> &ComponentRegistry<Self> {
        &registries.fault_blocks
    }

    fn registry_mut(registries: &mut Registries) -> &mut ComponentRegistry<Self> {
        &mut registries.fault_blocks
    }
}

impl Stored for StratigraphicUnit {
    fn registry(registries: &Registries) -> &ComponentRegistry<Self> {
        &registries.stratigraphic_units
    }

    fn registry_mut(registries: &mut Registries) -> &mut ComponentRegistry<Self> {
        &mut registries.stratigraphic_units
    }
}

// =============================================================================
// MODEL CORE
// =============================================================================

/// State shared by every model kind.
#[derive(Debug, Clone, Default)]
pub struct ModelCore {
    pub(crate) identity: Identity,
    pub(crate) registries: Registries,
    pub(crate) relationships: RelationshipGraph,
    pub(crate) coordinate_systems: BTreeMap<String, CoordinateSystem>,
    pub(crate) active_coordinate_system: Option<String>,
}

impl ModelCore {
    pub(crate) fn named(name: impl Into<String>) -> Self {
        Self {
            identity: Identity::named(name),
            ..Self::default()
        }
    }

    pub(crate) fn add_component<T: Stored>(&mut self) -> Result<Uuid, LithosError> {
        let id = RegistryBuilder::new(T::registry_mut(&mut self.registries)).create();
        RelationshipsBuilder::new(&mut self.relationships)
            .register_component(ComponentId::new(T::TYPE, id))?;
        Ok(id)
    }

    pub(crate) fn add_component_with_id<T: Stored>(&mut self, id: Uuid) -> Result<(), LithosError> {
        self.insert_component(T::new(id))
    }

    /// Store a populated component and register it, or do neither.
    pub(crate) fn insert_component<T: Stored>(&mut self, component: T) -> Result<(), LithosError> {
        let cid = component.component_id();
        if self.relationships.is_registered(&cid) {
            return Err(LithosError::DuplicateId(cid));
        }
        RegistryBuilder::new(T::registry_mut(&mut self.registries)).insert(component)?;
        RelationshipsBuilder::new(&mut self.relationships).register_component(cid)
    }

    /// Detach every incident edge, then delete the component.
    pub(crate) fn remove_component<T: Stored>(&mut self, id: &Uuid) -> Result<T, LithosError> {
        T::registry(&self.registries).get(id)?;
        let cid = ComponentId::new(T::TYPE, *id);
        if self.relationships.is_registered(&cid) {
            RelationshipsBuilder::new(&mut self.relationships).unregister_component(&cid)?;
        }
        RegistryBuilder::new(T::registry_mut(&mut self.registries)).delete(id)
    }

    pub(crate) fn set_component_name<T: Stored>(
        &mut self,
        id: &Uuid,
        name: impl Into<String>,
    ) -> Result<(), LithosError> {
        RegistryBuilder::new(T::registry_mut(&mut self.registries)).set_name(id, name)
    }

    pub(crate) fn component_mut<T: Stored>(&mut self, id: &Uuid) -> Result<&mut T, LithosError> {
        T::registry_mut(&mut self.registries).get_mut(id)
    }

    /// Registries and graph agree: every stored component is registered and
    /// every registered geological id is stored.
    pub(crate) fn validate(&self) -> Result<(), LithosError> {
        for ty in ComponentType::GEOLOGICAL {
            if let Some(registry) = self.registries.view(ty) {
                for id in registry.component_ids() {
                    let cid = ComponentId::new(ty, id);
                    if !self.relationships.is_registered(&cid) {
                        return Err(LithosError::invariant(format!(
                            "{cid} is stored but not registered in the relationship graph"
                        )));
                    }
                }
            }
        }
        for cid in self.relationships.components() {
            if cid.ty.is_geological() && !self.registries.contains(cid) {
                return Err(LithosError::invariant(format!(
                    "{cid} is referenced by the relationship graph but not stored"
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// MODEL TRAIT
// =============================================================================

/// Uniform read access over every model kind.
pub trait Model: Sized + Send + Sync + 'static {
    /// Human readable kind, used in diagnostics.
    const KIND: &'static str;

    /// Component types this kind may store.
    const SUPPORTED: &'static [ComponentType];

    fn core(&self) -> &ModelCore;

    /// Wrap a core, checking it only holds what this kind supports.
    fn from_core(core: ModelCore) -> Result<Self, LithosError>;

    fn into_core(self) -> ModelCore;

    fn identity(&self) -> &Identity {
        &self.core().identity
    }

    fn id(&self) -> Uuid {
        self.core().identity.id
    }

    fn name(&self) -> &str {
        &self.core().identity.name
    }

    fn registries(&self) -> &Registries {
        &self.core().registries
    }

    fn relationships(&self) -> &RelationshipGraph {
        &self.core().relationships
    }

    fn ordering(&self) -> StratigraphicOrdering<'_> {
        StratigraphicOrdering::new(&self.core().relationships)
    }

    fn nb_components(&self, ty: ComponentType) -> usize {
        self.core().registries.len_of(ty)
    }

    fn registry(&self, ty: ComponentType) -> Option<&dyn RegistryView> {
        self.core().registries.view(ty)
    }

    /// `"3 Horizon, 2 StratigraphicUnit"`, for logs.
    fn component_summary(&self) -> String {
        Self::SUPPORTED
            .iter()
            .map(|ty| format!("{} {}", self.nb_components(*ty), ty))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_component_detaches_edges_first() {
        let mut core = ModelCore::default();
        let h = core.add_component::<Horizon>().expect("horizon");
        let u = core.add_component::<StratigraphicUnit>().expect("unit");
        let hid = ComponentId::new(ComponentType::Horizon, h);
        let uid = ComponentId::new(ComponentType::StratigraphicUnit, u);
        RelationshipsBuilder::new(&mut core.relationships)
            .ordering()
            .add_horizon_above(hid, uid)
            .expect("above");

        let removed = core.remove_component::<StratigraphicUnit>(&u).expect("remove");
        assert_eq!(removed.id(), u);
        assert_eq!(core.relationships.edge_count(), 0);
        assert!(!core.relationships.is_registered(&uid));
        core.validate().expect("consistent");
    }

    #[test]
    fn insert_with_taken_id_changes_nothing() {
        let mut core = ModelCore::default();
        let id = core.add_component::<Fault>().expect("fault");
        let result = core.add_component_with_id::<Fault>(id);
        assert!(matches!(result, Err(LithosError::DuplicateId(_))));
        assert_eq!(core.registries.len_of(ComponentType::Fault), 1);
    }

    #[test]
    fn validate_reports_unstored_graph_ids() {
        let mut core = ModelCore::default();
        RelationshipsBuilder::new(&mut core.relationships)
            .register_component(ComponentId::new(ComponentType::Horizon, Uuid::new_v4()))
            .expect("register");
        assert!(matches!(core.validate(), Err(LithosError::InvariantViolation(_))));
    }
}
