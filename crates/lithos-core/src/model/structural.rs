//! Structural model: faults, horizons, fault blocks and units, the
//! relationships linking them to mesh pieces, and coordinate systems.

use super::{HorizonsStack, Model, ModelCore};
use crate::components::{
    ContactKind, Fault, FaultBlock, FaultKind, Horizon, HorizonKind, StratigraphicUnit,
};
use crate::crs::CoordinateSystem;
use crate::kernel::{MeshKernel, Point3};
use crate::ordering::OrderingBuilder;
use crate::relationships::RelationshipsBuilder;
use crate::types::{ComponentId, ComponentType, LithosError};
use uuid::Uuid;

// =============================================================================
// STRUCTURAL MODEL
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct StructuralModel {
    core: ModelCore,
}

impl StructuralModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            core: ModelCore::named(name),
        }
    }

    pub fn builder(&mut self) -> StructuralModelBuilder<'_> {
        StructuralModelBuilder { core: &mut self.core }
    }

    #[must_use]
    pub fn nb_faults(&self) -> usize {
        self.core.registries.faults.len()
    }

    #[must_use]
    pub fn nb_horizons(&self) -> usize {
        self.core.registries.horizons.len()
    }

    #[must_use]
    pub fn nb_fault_blocks(&self) -> usize {
        self.core.registries.fault_blocks.len()
    }

    #[must_use]
    pub fn nb_stratigraphic_units(&self) -> usize {
        self.core.registries.stratigraphic_units.len()
    }

    pub fn fault(&self, id: &Uuid) -> Result<&Fault, LithosError> {
        self.core.registries.faults.get(id)
    }

    pub fn horizon(&self, id: &Uuid) -> Result<&Horizon, LithosError> {
        self.core.registries.horizons.get(id)
    }

    pub fn fault_block(&self, id: &Uuid) -> Result<&FaultBlock, LithosError> {
        self.core.registries.fault_blocks.get(id)
    }

    pub fn stratigraphic_unit(&self, id: &Uuid) -> Result<&StratigraphicUnit, LithosError> {
        self.core.registries.stratigraphic_units.get(id)
    }

    pub fn faults(&self) -> impl Iterator<Item = &Fault> + '_ {
        self.core.registries.faults.iter()
    }

    pub fn horizons(&self) -> impl Iterator<Item = &Horizon> + '_ {
        self.core.registries.horizons.iter()
    }

    pub fn fault_blocks(&self) -> impl Iterator<Item = &FaultBlock> + '_ {
        self.core.registries.fault_blocks.iter()
    }

    pub fn stratigraphic_units(&self) -> impl Iterator<Item = &StratigraphicUnit> + '_ {
        self.core.registries.stratigraphic_units.iter()
    }

    /// Mesh pieces implementing a geological component.
    pub fn items_of(&self, collection: &ComponentId) -> Result<Vec<ComponentId>, LithosError> {
        self.core.relationships.items_of(collection)
    }

    /// Geological components a mesh piece belongs to.
    pub fn collections_of(&self, item: &ComponentId) -> Result<Vec<ComponentId>, LithosError> {
        self.core.relationships.collections_of(item)
    }

    pub fn coordinate_system(&self, name: &str) -> Option<&CoordinateSystem> {
        self.core.coordinate_systems.get(name)
    }

    pub fn coordinate_systems(&self) -> impl Iterator<Item = (&str, &CoordinateSystem)> + '_ {
        self.core
            .coordinate_systems
            .iter()
            .map(|(name, crs)| (name.as_str(), crs))
    }

    pub fn active_coordinate_system(&self) -> Option<(&str, &CoordinateSystem)> {
        let name = self.core.active_coordinate_system.as_deref()?;
        self.core
            .coordinate_systems
            .get(name)
            .map(|crs| (name, crs))
    }

    /// The stratigraphic unit containing `point`, located through the mesh
    /// kernel and the collection edges of the enclosing block.
    pub fn stratigraphic_unit_at(
        &self,
        kernel: &impl MeshKernel,
        point: &Point3,
    ) -> Result<Option<Uuid>, LithosError> {
        self.collection_at(kernel, point, ComponentType::StratigraphicUnit)
    }

    /// The fault block containing `point`.
    pub fn fault_block_at(
        &self,
        kernel: &impl MeshKernel,
        point: &Point3,
    ) -> Result<Option<Uuid>, LithosError> {
        self.collection_at(kernel, point, ComponentType::FaultBlock)
    }

    fn collection_at(
        &self,
        kernel: &impl MeshKernel,
        point: &Point3,
        ty: ComponentType,
    ) -> Result<Option<Uuid>, LithosError> {
        let Some(polyhedron) = kernel.containing_polyhedron(point) else {
            return Ok(None);
        };
        Ok(self
            .collections_of(&polyhedron.block)?
            .into_iter()
            .find(|c| c.ty == ty)
            .map(|c| c.id))
    }
}

impl Model for StructuralModel {
    const KIND: &'static str = "StructuralModel";
    const SUPPORTED: &'static [ComponentType] = &ComponentType::GEOLOGICAL;

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn from_core(core: ModelCore) -> Result<Self, LithosError> {
        core.validate()?;
        if let Some(active) = &core.active_coordinate_system {
            if !core.coordinate_systems.contains_key(active) {
                return Err(LithosError::invariant(format!(
                    "active coordinate system '{active}' is not defined"
                )));
            }
        }
        Ok(Self { core })
    }

    fn into_core(self) -> ModelCore {
        self.core
    }
}

impl From<HorizonsStack> for StructuralModel {
    fn from(stack: HorizonsStack) -> Self {
        Self {
            core: stack.into_core(),
        }
    }
}

// =============================================================================
// BUILDER
// =============================================================================

pub struct StructuralModelBuilder<'a> {
    core: &'a mut ModelCore,
}

impl StructuralModelBuilder<'_> {
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.core.identity.name = name.into();
    }

    // -------------------------------------------------------------------------
    // Faults
    // -------------------------------------------------------------------------

    pub fn add_fault(&mut self, kind: Option<FaultKind>) -> Result<Uuid, LithosError> {
        let id = self.core.add_component::<Fault>()?;
        self.core.component_mut::<Fault>(&id)?.set_kind(kind);
        Ok(id)
    }

    pub fn add_fault_with_id(&mut self, id: Uuid) -> Result<(), LithosError> {
        self.core.add_component_with_id::<Fault>(id)
    }

    pub fn set_fault_name(&mut self, id: &Uuid, name: impl Into<String>) -> Result<(), LithosError> {
        self.core.set_component_name::<Fault>(id, name)
    }

    pub fn set_fault_kind(&mut self, id: &Uuid, kind: Option<FaultKind>) -> Result<(), LithosError> {
        self.core.component_mut::<Fault>(id)?.set_kind(kind);
        Ok(())
    }

    pub fn remove_fault(&mut self, id: &Uuid) -> Result<Fault, LithosError> {
        self.core.remove_component::<Fault>(id)
    }

    // -------------------------------------------------------------------------
    // Horizons
    // -------------------------------------------------------------------------

    pub fn add_horizon(&mut self, kind: Option<HorizonKind>) -> Result<Uuid, LithosError> {
        let id = self.core.add_component::<Horizon>()?;
        self.core.component_mut::<Horizon>(&id)?.set_kind(kind);
        Ok(id)
    }

    pub fn add_horizon_with_id(&mut self, id: Uuid) -> Result<(), LithosError> {
        self.core.add_component_with_id::<Horizon>(id)
    }

    pub fn set_horizon_name(&mut self, id: &Uuid, name: impl Into<String>) -> Result<(), LithosError> {
        self.core.set_component_name::<Horizon>(id, name)
    }

    pub fn set_horizon_kind(&mut self, id: &Uuid, kind: Option<HorizonKind>) -> Result<(), LithosError> {
        self.core.component_mut::<Horizon>(id)?.set_kind(kind);
        Ok(())
    }

    pub fn set_horizon_contact(&mut self, id: &Uuid, contact: ContactKind) -> Result<(), LithosError> {
        self.core.component_mut::<Horizon>(id)?.set_contact(contact);
        Ok(())
    }

    pub fn remove_horizon(&mut self, id: &Uuid) -> Result<Horizon, LithosError> {
        self.core.remove_component::<Horizon>(id)
    }

    // -------------------------------------------------------------------------
    // Fault blocks and stratigraphic units
    // -------------------------------------------------------------------------

    pub fn add_fault_block(&mut self) -> Result<Uuid, LithosError> {
        self.core.add_component::<FaultBlock>()
    }

    pub fn add_fault_block_with_id(&mut self, id: Uuid) -> Result<(), LithosError> {
        self.core.add_component_with_id::<FaultBlock>(id)
    }

    pub fn set_fault_block_name(&mut self, id: &Uuid, name: impl Into<String>) -> Result<(), LithosError> {
        self.core.set_component_name::<FaultBlock>(id, name)
    }

    pub fn remove_fault_block(&mut self, id: &Uuid) -> Result<FaultBlock, LithosError> {
        self.core.remove_component::<FaultBlock>(id)
    }

    pub fn add_stratigraphic_unit(&mut self) -> Result<Uuid, LithosError> {
        self.core.add_component::<StratigraphicUnit>()
    }

    pub fn add_stratigraphic_unit_with_id(&mut self, id: Uuid) -> Result<(), LithosError> {
        self.core.add_component_with_id::<StratigraphicUnit>(id)
    }

    pub fn set_stratigraphic_unit_name(
        &mut self,
        id: &Uuid,
        name: impl Into<String>,
    ) -> Result<(), LithosError> {
        self.core.set_component_name::<StratigraphicUnit>(id, name)
    }

    pub fn remove_stratigraphic_unit(&mut self, id: &Uuid) -> Result<StratigraphicUnit, LithosError> {
        self.core.remove_component::<StratigraphicUnit>(id)
    }

    // -------------------------------------------------------------------------
    // Mesh pieces and relationships
    // -------------------------------------------------------------------------

    /// Register a mesh-kernel piece so it can take part in relationships.
    pub fn register_mesh_component(&mut self, id: ComponentId) -> Result<(), LithosError> {
        self.relationships().register_component(id)
    }

    pub fn unregister_mesh_component(&mut self, id: &ComponentId) -> Result<(), LithosError> {
        self.relationships().unregister_component(id)
    }

    pub fn add_boundary_relation(
        &mut self,
        boundary: ComponentId,
        incident: ComponentId,
    ) -> Result<(), LithosError> {
        self.relationships().add_boundary_relation(boundary, incident)
    }

    /// Record that mesh piece `item` implements part of `collection`.
    pub fn add_item_in_collection(
        &mut self,
        item: ComponentId,
        collection: ComponentId,
    ) -> Result<(), LithosError> {
        self.relationships().add_item_in_collection(item, collection)
    }

    /// Edge-level access. Geological ids cannot be registered or
    /// unregistered through it.
    pub fn relationships(&mut self) -> RelationshipsBuilder<'_> {
        RelationshipsBuilder::for_model(&mut self.core.relationships)
    }

    pub fn ordering(&mut self) -> OrderingBuilder<'_> {
        OrderingBuilder::new(&mut self.core.relationships)
    }

    // -------------------------------------------------------------------------
    // Coordinate systems
    // -------------------------------------------------------------------------

    pub fn add_coordinate_system(
        &mut self,
        name: impl Into<String>,
        system: CoordinateSystem,
    ) -> Result<(), LithosError> {
        let name = name.into();
        if self.core.coordinate_systems.contains_key(&name) {
            return Err(LithosError::invariant(format!(
                "coordinate system '{name}' already exists"
            )));
        }
        self.core.coordinate_systems.insert(name, system);
        Ok(())
    }

    pub fn set_active_coordinate_system(&mut self, name: &str) -> Result<(), LithosError> {
        if !self.core.coordinate_systems.contains_key(name) {
            return Err(LithosError::invariant(format!(
                "coordinate system '{name}' is not defined"
            )));
        }
        self.core.active_coordinate_system = Some(name.to_string());
        Ok(())
    }

    pub fn remove_coordinate_system(&mut self, name: &str) -> Option<CoordinateSystem> {
        if self.core.active_coordinate_system.as_deref() == Some(name) {
            self.core.active_coordinate_system = None;
        }
        self.core.coordinate_systems.remove(name)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::GeographicInfo;
    use crate::kernel::PolyhedronRef;

    struct SingleBlockKernel {
        block: ComponentId,
    }

    impl MeshKernel for SingleBlockKernel {
        fn containing_polyhedron(&self, point: &Point3) -> Option<PolyhedronRef> {
            (point.z <= 0.0).then_some(PolyhedronRef {
                block: self.block,
                polyhedron: 7,
            })
        }
    }

    #[test]
    fn point_location_goes_through_collection_edges() {
        let mut model = StructuralModel::named("basin");
        let block = ComponentId::new(ComponentType::Block, Uuid::new_v4());
        let mut builder = model.builder();
        let unit = builder.add_stratigraphic_unit().expect("unit");
        let fault_block = builder.add_fault_block().expect("fault block");
        builder.register_mesh_component(block).expect("block");
        builder
            .add_item_in_collection(block, ComponentId::new(ComponentType::StratigraphicUnit, unit))
            .expect("item");
        builder
            .add_item_in_collection(block, ComponentId::new(ComponentType::FaultBlock, fault_block))
            .expect("item");

        let kernel = SingleBlockKernel { block };
        let inside = Point3::new(1.0, 2.0, -10.0);
        let outside = Point3::new(1.0, 2.0, 10.0);
        assert_eq!(model.stratigraphic_unit_at(&kernel, &inside).expect("query"), Some(unit));
        assert_eq!(model.fault_block_at(&kernel, &inside).expect("query"), Some(fault_block));
        assert_eq!(model.stratigraphic_unit_at(&kernel, &outside).expect("query"), None);
    }

    #[test]
    fn removing_a_fault_drops_its_items() {
        let mut model = StructuralModel::new();
        let surface = ComponentId::new(ComponentType::Surface, Uuid::new_v4());
        let mut builder = model.builder();
        let fault = builder.add_fault(Some(FaultKind::Normal)).expect("fault");
        let fault_cid = ComponentId::new(ComponentType::Fault, fault);
        builder.register_mesh_component(surface).expect("surface");
        builder.add_item_in_collection(surface, fault_cid).expect("item");
        assert_eq!(model.items_of(&fault_cid).expect("items"), vec![surface]);
        assert_eq!(model.fault(&fault).expect("fault").kind(), Some(FaultKind::Normal));

        model.builder().remove_fault(&fault).expect("remove");
        assert_eq!(model.nb_faults(), 0);
        assert!(model.collections_of(&surface).expect("collections").is_empty());
    }

    #[test]
    fn geological_ids_cannot_be_registered_as_mesh() {
        let mut model = StructuralModel::new();
        let result = model
            .builder()
            .register_mesh_component(ComponentId::new(ComponentType::Horizon, Uuid::new_v4()));
        assert!(matches!(result, Err(LithosError::InvariantViolation(_))));
    }

    #[test]
    fn relationships_handle_keeps_registries_in_sync() {
        let mut model = StructuralModel::new();
        let surface = ComponentId::new(ComponentType::Surface, Uuid::new_v4());
        let ghost = ComponentId::new(ComponentType::Fault, Uuid::new_v4());
        let mut builder = model.builder();
        let fault = ComponentId::new(ComponentType::Fault, builder.add_fault(None).expect("fault"));
        builder.register_mesh_component(surface).expect("surface");

        let registered = builder.relationships().register_component(ghost);
        assert!(matches!(registered, Err(LithosError::InvariantViolation(_))));
        let unregistered = builder.relationships().unregister_component(&fault);
        assert!(matches!(unregistered, Err(LithosError::InvariantViolation(_))));

        assert!(model.relationships().is_registered(&fault));
        assert!(!model.relationships().is_registered(&ghost));
        model
            .builder()
            .add_item_in_collection(surface, fault)
            .expect("stored fault still usable");
        model.core().validate().expect("consistent");
        let (copy, _) = crate::clone::CloneEngine::default()
            .clone_model(&model)
            .expect("clone");
        assert_eq!(copy.nb_faults(), 1);
    }

    #[test]
    fn coordinate_systems() {
        let mut model = StructuralModel::new();
        let mut builder = model.builder();
        builder
            .add_coordinate_system(
                "utm",
                CoordinateSystem::Geographic(GeographicInfo::new("EPSG", "32631", "UTM 31N")),
            )
            .expect("add");
        assert!(builder.set_active_coordinate_system("lambert").is_err());
        builder.set_active_coordinate_system("utm").expect("active");

        let (name, _) = model.active_coordinate_system().expect("active");
        assert_eq!(name, "utm");
        assert!(model.builder().remove_coordinate_system("utm").is_some());
        assert!(model.active_coordinate_system().is_none());
    }

    #[test]
    fn stack_converts_into_model() {
        let mut stack = HorizonsStack::named("column");
        let mut builder = stack.builder();
        let h = builder.add_horizon().expect("h");
        let u = builder.add_stratigraphic_unit().expect("u");
        builder.set_horizon_above(&h, &u).expect("above");

        let model = StructuralModel::from(stack);
        assert_eq!(model.name(), "column");
        assert_eq!(model.nb_horizons(), 1);
        assert_eq!(model.relationships().edge_count(), 2);
    }
}
