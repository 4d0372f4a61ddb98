//! # Model Cloning
//!
//! Deep copy of a model under an identity policy. Every component of the
//! source gets an image id (kept or freshly minted), registries are copied
//! under those images, and every edge is rebuilt between the images.
//!
//! The result is isomorphic to the source: same counts per type, same
//! names and kinds, same edges once ids are translated through the
//! returned [`CloneMapping`].

use crate::components::{Fault, FaultBlock, Horizon, StratigraphicUnit};
use crate::mapping::{CloneMapping, IdentityPolicy};
use crate::model::{Model, ModelCore, Stored};
use crate::ordering::OrderingBuilder;
use crate::types::{ComponentId, ComponentType, Identity, LithosError};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

/// Clone driver holding one identity policy per component type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneEngine {
    policies: BTreeMap<ComponentType, IdentityPolicy>,
}

impl Default for CloneEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CloneEngine {
    /// Engine using [`IdentityPolicy::default_for`] on every type.
    #[must_use]
    pub fn new() -> Self {
        Self {
            policies: BTreeMap::new(),
        }
    }

    /// Same policy for every geological type. Mesh pieces keep their ids
    /// since the kernel owns them.
    #[must_use]
    pub fn uniform(policy: IdentityPolicy) -> Self {
        Self {
            policies: ComponentType::GEOLOGICAL
                .into_iter()
                .map(|ty| (ty, policy))
                .collect(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, ty: ComponentType, policy: IdentityPolicy) -> Self {
        self.policies.insert(ty, policy);
        self
    }

    #[must_use]
    pub fn policy(&self, ty: ComponentType) -> IdentityPolicy {
        self.policies
            .get(&ty)
            .copied()
            .unwrap_or_else(|| IdentityPolicy::default_for(ty))
    }

    /// Clone `source`, returning the copy and the id translation used.
    ///
    /// The copy gets a fresh model id and the source's name.
    pub fn clone_model<M: Model>(&self, source: &M) -> Result<(M, CloneMapping), LithosError> {
        let src = source.core();
        let mut mapping = CloneMapping::new();
        let mut core = ModelCore {
            identity: Identity::named(src.identity.name.clone()),
            coordinate_systems: src.coordinate_systems.clone(),
            active_coordinate_system: src.active_coordinate_system.clone(),
            ..ModelCore::default()
        };

        self.clone_registry::<Fault>(src, &mut core, &mut mapping)?;
        self.clone_registry::<Horizon>(src, &mut core, &mut mapping)?;
        self.clone_registry::<FaultBlock>(src, &mut core, &mut mapping)?;
        self.clone_registry::<StratigraphicUnit>(src, &mut core, &mut mapping)?;

        // Mesh pieces only live in the graph.
        for cid in src.relationships.components() {
            if !cid.ty.is_geological() {
                let image = ComponentId::new(cid.ty, self.image(&mut mapping, cid)?);
                core.relationships.register_component(image)?;
            }
        }

        for edge in src.relationships.edges().filter(|e| !e.kind.is_ordering()) {
            core.relationships.add_edge(
                mapping.translate(&edge.from)?,
                mapping.translate(&edge.to)?,
                edge.kind,
            )?;
        }
        OrderingBuilder::new(&mut core.relationships)
            .copy_stratigraphic_relationships(&mapping, &src.relationships)?;

        debug!(
            kind = M::KIND,
            source = %src.identity.id,
            copy = %core.identity.id,
            mapped = mapping.len(),
            "Model cloned"
        );
        Ok((M::from_core(core)?, mapping))
    }

    fn clone_registry<T: Stored>(
        &self,
        src: &ModelCore,
        dst: &mut ModelCore,
        mapping: &mut CloneMapping,
    ) -> Result<(), LithosError> {
        for component in T::registry(&src.registries).iter() {
            let image = self.image(mapping, &component.component_id())?;
            dst.insert_component(component.with_id(image))?;
        }
        Ok(())
    }

    /// The image of `cid`, minting and recording it on first sight.
    fn image(&self, mapping: &mut CloneMapping, cid: &ComponentId) -> Result<Uuid, LithosError> {
        if let Some(existing) = mapping.get(cid.ty).filter(|m| m.has_mapping_input(&cid.id)) {
            return existing.in2out(&cid.id);
        }
        let image = match self.policy(cid.ty) {
            IdentityPolicy::Shared => cid.id,
            IdentityPolicy::Instance => Uuid::new_v4(),
        };
        mapping.map(cid.ty, cid.id, image)?;
        Ok(image)
    }
}

/// Clone with the default policies.
pub fn clone_model<M: Model>(source: &M) -> Result<(M, CloneMapping), LithosError> {
    CloneEngine::new().clone_model(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Component, FaultKind};
    use crate::model::StructuralModel;

    fn sample() -> (StructuralModel, Uuid, Uuid, Uuid, ComponentId) {
        let mut model = StructuralModel::named("sample");
        let surface = ComponentId::new(ComponentType::Surface, Uuid::new_v4());
        let mut builder = model.builder();
        let fault = builder.add_fault(Some(FaultKind::Reverse)).expect("fault");
        builder.set_fault_name(&fault, "F1").expect("name");
        let horizon = builder.add_horizon(None).expect("horizon");
        let unit = builder.add_stratigraphic_unit().expect("unit");
        builder
            .ordering()
            .add_horizon_above(
                ComponentId::new(ComponentType::Horizon, horizon),
                ComponentId::new(ComponentType::StratigraphicUnit, unit),
            )
            .expect("above");
        builder.register_mesh_component(surface).expect("surface");
        builder
            .add_item_in_collection(surface, ComponentId::new(ComponentType::Fault, fault))
            .expect("item");
        (model, fault, horizon, unit, surface)
    }

    #[test]
    fn default_policies_keep_shared_ids() {
        let (model, fault, horizon, unit, surface) = sample();
        let (copy, mapping) = clone_model(&model).expect("clone");

        assert_ne!(copy.id(), model.id());
        assert_eq!(copy.name(), "sample");
        assert_eq!(mapping.in2out(ComponentType::Horizon, &horizon).expect("h"), horizon);
        assert_eq!(mapping.in2out(ComponentType::StratigraphicUnit, &unit).expect("u"), unit);
        assert_eq!(mapping.in2out(ComponentType::Surface, &surface.id).expect("s"), surface.id);

        let new_fault = mapping.in2out(ComponentType::Fault, &fault).expect("fault");
        assert_ne!(new_fault, fault);
        let copied = copy.fault(&new_fault).expect("copied fault");
        assert_eq!(copied.name(), "F1");
        assert_eq!(copied.kind(), Some(FaultKind::Reverse));
        assert_eq!(
            copy.items_of(&ComponentId::new(ComponentType::Fault, new_fault)).expect("items"),
            vec![surface]
        );
    }

    #[test]
    fn every_edge_has_an_image() {
        let (model, ..) = sample();
        let engine = CloneEngine::uniform(IdentityPolicy::Instance);
        let (copy, mapping) = engine.clone_model(&model).expect("clone");

        assert!(mapping.is_injective());
        assert_eq!(copy.relationships().edge_count(), model.relationships().edge_count());
        for edge in model.relationships().edges() {
            let from = mapping.translate(&edge.from).expect("from");
            let to = mapping.translate(&edge.to).expect("to");
            assert!(copy.relationships().has_edge(&from, &to, edge.kind));
        }
    }

    #[test]
    fn explicit_policy_overrides_default() {
        let engine = CloneEngine::new().with_policy(ComponentType::Fault, IdentityPolicy::Shared);
        assert_eq!(engine.policy(ComponentType::Fault), IdentityPolicy::Shared);
        assert_eq!(engine.policy(ComponentType::FaultBlock), IdentityPolicy::Instance);
    }
}
