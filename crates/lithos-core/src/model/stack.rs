//! Horizons stack: horizons and stratigraphic units in one ordered column.

use super::{Model, ModelCore, StructuralModel};
use crate::clone::CloneEngine;
use crate::components::{Component, ContactKind, Horizon, HorizonKind, StratigraphicUnit};
use crate::mapping::{CloneMapping, IdentityPolicy};
use crate::ordering::{OrderingBuilder, StratigraphicOrdering};
use crate::types::{ComponentId, ComponentType, LithosError};
use std::collections::BTreeSet;
use tracing::warn;
use uuid::Uuid;

fn horizon_id(id: Uuid) -> ComponentId {
    ComponentId::new(ComponentType::Horizon, id)
}

fn unit_id(id: Uuid) -> ComponentId {
    ComponentId::new(ComponentType::StratigraphicUnit, id)
}

/// The single id in `ids`, `None` when empty.
fn unique_by_name(
    mut ids: impl Iterator<Item = Uuid>,
    ty: ComponentType,
    name: &str,
) -> Result<Option<Uuid>, LithosError> {
    let first = ids.next();
    if ids.next().is_some() {
        return Err(LithosError::invariant(format!(
            "several {ty} components are named '{name}'"
        )));
    }
    Ok(first)
}

/// Alternate both name lists, starting with the longer one (horizons on a
/// tie).
fn interleave<'a, S: AsRef<str>>(
    horizons: &'a [S],
    units: &'a [S],
) -> Result<Vec<(ComponentType, &'a str)>, LithosError> {
    if horizons.len().abs_diff(units.len()) > 1 {
        return Err(LithosError::invariant(format!(
            "{} horizons cannot alternate with {} stratigraphic units",
            horizons.len(),
            units.len()
        )));
    }
    for (ty, names) in [
        (ComponentType::Horizon, horizons),
        (ComponentType::StratigraphicUnit, units),
    ] {
        let mut seen = BTreeSet::new();
        for name in names {
            let name: &str = name.as_ref();
            if !seen.insert(name) {
                return Err(LithosError::invariant(format!(
                    "{ty} name '{name}' is given twice"
                )));
            }
        }
    }

    let horizons = (ComponentType::Horizon, horizons);
    let units = (ComponentType::StratigraphicUnit, units);
    let (first, second) = if units.1.len() > horizons.1.len() {
        (units, horizons)
    } else {
        (horizons, units)
    };
    let mut column = Vec::with_capacity(first.1.len() + second.1.len());
    for (i, name) in first.1.iter().enumerate() {
        column.push((first.0, name.as_ref()));
        if let Some(name) = second.1.get(i) {
            column.push((second.0, name.as_ref()));
        }
    }
    Ok(column)
}

// =============================================================================
// HORIZONS STACK
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct HorizonsStack {
    core: ModelCore,
}

impl HorizonsStack {
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

    pub fn builder(&mut self) -> HorizonsStackBuilder<'_> {
        HorizonsStackBuilder { core: &mut self.core }
    }

    /// Build a named column, top first.
    ///
    /// Horizons and units alternate. The longer list gives both ends of the
    /// column, and with lists of equal length the top is a horizon. Lists
    /// differing in length by more than one, or repeating a name, fail with
    /// `InvariantViolation`.
    pub fn from_top_to_bottom_names<S: AsRef<str>>(
        horizons: &[S],
        units: &[S],
    ) -> Result<Self, LithosError> {
        Self::from_column(&interleave(horizons, units)?)
    }

    /// Build a named column, bottom first. See
    /// [`HorizonsStack::from_top_to_bottom_names`].
    pub fn from_bottom_to_top_names<S: AsRef<str>>(
        horizons: &[S],
        units: &[S],
    ) -> Result<Self, LithosError> {
        let mut column = interleave(horizons, units)?;
        column.reverse();
        Self::from_column(&column)
    }

    fn from_column(column: &[(ComponentType, &str)]) -> Result<Self, LithosError> {
        let mut stack = Self::new();
        let mut builder = stack.builder();
        let mut ids = Vec::with_capacity(column.len());
        for (ty, name) in column {
            let cid = if *ty == ComponentType::Horizon {
                let id = builder.add_horizon()?;
                builder.set_horizon_name(&id, *name)?;
                horizon_id(id)
            } else {
                let id = builder.add_stratigraphic_unit()?;
                builder.set_stratigraphic_unit_name(&id, *name)?;
                unit_id(id)
            };
            ids.push(cid);
        }
        let mut ordering = builder.ordering();
        for (upper, lower) in ids.iter().zip(ids.iter().skip(1)) {
            ordering.add_above_relation(*upper, *lower)?;
        }
        Ok(stack)
    }

    #[must_use]
    pub fn nb_horizons(&self) -> usize {
        self.core.registries.horizons.len()
    }

    #[must_use]
    pub fn nb_stratigraphic_units(&self) -> usize {
        self.core.registries.stratigraphic_units.len()
    }

    pub fn horizon(&self, id: &Uuid) -> Result<&Horizon, LithosError> {
        self.core.registries.horizons.get(id)
    }

    pub fn stratigraphic_unit(&self, id: &Uuid) -> Result<&StratigraphicUnit, LithosError> {
        self.core.registries.stratigraphic_units.get(id)
    }

    #[must_use]
    pub fn has_horizon(&self, id: &Uuid) -> bool {
        self.core.registries.horizons.has(id)
    }

    #[must_use]
    pub fn has_stratigraphic_unit(&self, id: &Uuid) -> bool {
        self.core.registries.stratigraphic_units.has(id)
    }

    pub fn horizons(&self) -> impl Iterator<Item = &Horizon> + '_ {
        self.core.registries.horizons.iter()
    }

    pub fn stratigraphic_units(&self) -> impl Iterator<Item = &StratigraphicUnit> + '_ {
        self.core.registries.stratigraphic_units.iter()
    }

    /// Id of the horizon called `name`.
    ///
    /// `None` when no horizon has that name, `InvariantViolation` when
    /// several do.
    pub fn horizon_id_from_name(&self, name: &str) -> Result<Option<Uuid>, LithosError> {
        let ids = self.core.registries.horizons.find_by_name(name).map(Component::id);
        unique_by_name(ids, ComponentType::Horizon, name)
    }

    /// Id of the stratigraphic unit called `name`, with the same rules as
    /// [`HorizonsStack::horizon_id_from_name`].
    pub fn stratigraphic_unit_id_from_name(&self, name: &str) -> Result<Option<Uuid>, LithosError> {
        let ids = self
            .core
            .registries
            .stratigraphic_units
            .find_by_name(name)
            .map(Component::id);
        unique_by_name(ids, ComponentType::StratigraphicUnit, name)
    }

    /// Whole column, top to bottom.
    pub fn stack_order(&self) -> Result<Vec<ComponentId>, LithosError> {
        self.ordering().stack_order()
    }

    /// Highest horizon of the column.
    pub fn top_horizon(&self) -> Result<Option<Uuid>, LithosError> {
        Ok(self
            .stack_order()?
            .into_iter()
            .find(|c| c.ty == ComponentType::Horizon)
            .map(|c| c.id))
    }

    /// Lowest horizon of the column.
    pub fn bottom_horizon(&self) -> Result<Option<Uuid>, LithosError> {
        Ok(self
            .stack_order()?
            .into_iter()
            .rev()
            .find(|c| c.ty == ComponentType::Horizon)
            .map(|c| c.id))
    }

    /// True when `horizon` lies directly on `unit` and truncates it.
    pub fn is_eroded_by(&self, unit: &Uuid, horizon: &Uuid) -> Result<bool, LithosError> {
        let contact = self.horizon(horizon)?.contact();
        self.stratigraphic_unit(unit)?;
        let under = self.ordering().under(&horizon_id(*horizon))?;
        Ok(contact.erodes_under() && under == Some(unit_id(*unit)))
    }

    /// True when `unit` lies directly on `horizon` and laps onto it.
    pub fn is_baselap_of(&self, horizon: &Uuid, unit: &Uuid) -> Result<bool, LithosError> {
        let contact = self.horizon(horizon)?.contact();
        self.stratigraphic_unit(unit)?;
        let above = self.ordering().above(&horizon_id(*horizon))?;
        Ok(contact.baselaps_above() && above == Some(unit_id(*unit)))
    }
}

impl Model for HorizonsStack {
    const KIND: &'static str = "HorizonsStack";
    const SUPPORTED: &'static [ComponentType] =
        &[ComponentType::Horizon, ComponentType::StratigraphicUnit];

    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn from_core(core: ModelCore) -> Result<Self, LithosError> {
        for ty in [ComponentType::Fault, ComponentType::FaultBlock] {
            if core.registries.len_of(ty) > 0 {
                return Err(LithosError::invariant(format!(
                    "a horizons stack cannot hold {ty} components"
                )));
            }
        }
        if let Some(cid) = core
            .relationships
            .components()
            .find(|c| !c.ty.is_stratigraphic())
        {
            return Err(LithosError::invariant(format!(
                "a horizons stack cannot reference {cid}"
            )));
        }
        if let Some(edge) = core.relationships.edges().find(|e| !e.kind.is_ordering()) {
            return Err(LithosError::invariant(format!(
                "a horizons stack cannot hold {} edges",
                edge.kind
            )));
        }
        if !core.coordinate_systems.is_empty() {
            return Err(LithosError::invariant(
                "a horizons stack cannot hold coordinate systems",
            ));
        }
        core.validate()?;
        Ok(Self { core })
    }

    fn into_core(self) -> ModelCore {
        self.core
    }
}

impl TryFrom<StructuralModel> for HorizonsStack {
    type Error = LithosError;

    fn try_from(model: StructuralModel) -> Result<Self, Self::Error> {
        Self::from_core(model.into_core())
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Result of splitting a unit around a new horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertedHorizonInfo {
    pub new_horizon_id: Uuid,
    pub stratigraphic_unit_above_id: Uuid,
    pub stratigraphic_unit_under_id: Uuid,
}

pub struct HorizonsStackBuilder<'a> {
    core: &'a mut ModelCore,
}

impl HorizonsStackBuilder<'_> {
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.core.identity.name = name.into();
    }

    pub fn add_horizon(&mut self) -> Result<Uuid, LithosError> {
        self.core.add_component::<Horizon>()
    }

    pub fn add_horizon_with_id(&mut self, id: Uuid) -> Result<(), LithosError> {
        self.core.add_component_with_id::<Horizon>(id)
    }

    pub fn add_stratigraphic_unit(&mut self) -> Result<Uuid, LithosError> {
        self.core.add_component::<StratigraphicUnit>()
    }

    pub fn add_stratigraphic_unit_with_id(&mut self, id: Uuid) -> Result<(), LithosError> {
        self.core.add_component_with_id::<StratigraphicUnit>(id)
    }

    pub fn set_horizon_name(&mut self, id: &Uuid, name: impl Into<String>) -> Result<(), LithosError> {
        self.core.set_component_name::<Horizon>(id, name)
    }

    pub fn set_horizon_kind(&mut self, id: &Uuid, kind: Option<HorizonKind>) -> Result<(), LithosError> {
        self.core.component_mut::<Horizon>(id)?.set_kind(kind);
        Ok(())
    }

    pub fn set_stratigraphic_unit_name(
        &mut self,
        id: &Uuid,
        name: impl Into<String>,
    ) -> Result<(), LithosError> {
        self.core.set_component_name::<StratigraphicUnit>(id, name)
    }

    /// Set how `horizon` contacts its neighbours.
    ///
    /// The contact is stored even when the neighbour it describes is not
    /// placed yet; that case is logged.
    pub fn set_horizon_contact(&mut self, id: &Uuid, contact: ContactKind) -> Result<(), LithosError> {
        let ordering = StratigraphicOrdering::new(&self.core.relationships);
        let hid = horizon_id(*id);
        if contact.erodes_under() && ordering.under(&hid)?.is_none() {
            warn!(horizon = %id, "No unit under horizon, erosional contact has no effect yet");
        }
        if contact.baselaps_above() && ordering.above(&hid)?.is_none() {
            warn!(horizon = %id, "No unit above horizon, baselap contact has no effect yet");
        }
        self.core.component_mut::<Horizon>(id)?.set_contact(contact);
        Ok(())
    }

    /// Remove a horizon and every relation it takes part in.
    pub fn remove_horizon(&mut self, id: &Uuid) -> Result<Horizon, LithosError> {
        self.core.remove_component::<Horizon>(id)
    }

    pub fn remove_stratigraphic_unit(&mut self, id: &Uuid) -> Result<StratigraphicUnit, LithosError> {
        self.core.remove_component::<StratigraphicUnit>(id)
    }

    /// Place `horizon` directly above `unit`.
    pub fn set_horizon_above(&mut self, horizon: &Uuid, unit: &Uuid) -> Result<(), LithosError> {
        self.ordering()
            .add_horizon_above(horizon_id(*horizon), unit_id(*unit))
    }

    /// Place `horizon` directly under `unit`.
    pub fn set_horizon_under(&mut self, horizon: &Uuid, unit: &Uuid) -> Result<(), LithosError> {
        self.ordering()
            .add_horizon_under(horizon_id(*horizon), unit_id(*unit))
    }

    pub fn ordering(&mut self) -> OrderingBuilder<'_> {
        OrderingBuilder::new(&mut self.core.relationships)
    }

    /// Split `unit` in two around a new horizon.
    ///
    /// The neighbours of `unit` are rewired onto the new upper and lower
    /// units, then `unit` is removed. On error the stack is left unchanged.
    pub fn add_horizon_in_stratigraphic_unit(
        &mut self,
        unit: &Uuid,
    ) -> Result<InsertedHorizonInfo, LithosError> {
        let mut work = self.core.clone();
        let info = HorizonsStackBuilder { core: &mut work }.split_unit(unit)?;
        *self.core = work;
        Ok(info)
    }

    fn split_unit(&mut self, unit: &Uuid) -> Result<InsertedHorizonInfo, LithosError> {
        self.core.registries.stratigraphic_units.get(unit)?;
        let old = unit_id(*unit);
        let ordering = StratigraphicOrdering::new(&self.core.relationships);
        let above = ordering.above(&old)?;
        let under = ordering.under(&old)?;

        let info = InsertedHorizonInfo {
            new_horizon_id: self.add_horizon()?,
            stratigraphic_unit_above_id: self.add_stratigraphic_unit()?,
            stratigraphic_unit_under_id: self.add_stratigraphic_unit()?,
        };
        let horizon = horizon_id(info.new_horizon_id);
        let upper = unit_id(info.stratigraphic_unit_above_id);
        let lower = unit_id(info.stratigraphic_unit_under_id);

        self.core.remove_component::<StratigraphicUnit>(unit)?;
        let mut ordering = self.ordering();
        ordering.add_above_relation(upper, horizon)?;
        ordering.add_above_relation(horizon, lower)?;
        if let Some(above) = above {
            ordering.add_above_relation(above, upper)?;
        }
        if let Some(under) = under {
            ordering.add_above_relation(lower, under)?;
        }
        Ok(info)
    }

    /// Copy `source` into this (empty) stack with fresh ids.
    ///
    /// The target keeps its own id and name.
    pub fn copy(&mut self, source: &HorizonsStack) -> Result<CloneMapping, LithosError> {
        let nb_components = self.core.registries.horizons.len()
            + self.core.registries.stratigraphic_units.len();
        if nb_components != 0 {
            return Err(LithosError::invariant(
                "HorizonsStack should be empty before copy",
            ));
        }
        let (copy, mapping) = CloneEngine::uniform(IdentityPolicy::Instance).clone_model(source)?;
        let identity = self.core.identity.clone();
        *self.core = copy.into_core();
        self.core.identity = identity;
        Ok(mapping)
    }

    /// Repair the ordering after checking every stack member is stored.
    pub fn repair_ordering(&mut self) -> Result<usize, LithosError> {
        let relations = StratigraphicOrdering::new(&self.core.relationships).relations();
        for (upper, lower) in relations {
            for cid in [upper, lower] {
                if !self.core.registries.contains(&cid) {
                    return Err(LithosError::invariant(format!(
                        "stack references {cid}, which is not in the model"
                    )));
                }
            }
        }
        self.ordering().repair_if_possible()
    }

    /// Remove an ordering relation between two stack members.
    pub fn remove_relation(&mut self, first: &ComponentId, second: &ComponentId) -> Result<(), LithosError> {
        self.ordering().remove_relation(first, second)
    }
}

// =============================================================================
// TESTS
// =============================================================================
