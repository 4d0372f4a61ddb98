//! # Clone Mappings
//!
//! Injective `old id -> new id` translations, one per component type,
//! built once per clone or copy and discarded afterwards.

use crate::types::{ComponentId, ComponentType, LithosError};
use std::collections::BTreeMap;
use uuid::Uuid;

// =============================================================================
// IDENTITY POLICY
// =============================================================================

/// Whether a component keeps its id when its model is cloned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdentityPolicy {
    /// Template entity referenced across models: id kept.
    Shared,
    /// Entity owned by exactly one model: fresh id minted.
    Instance,
}

impl IdentityPolicy {
    /// Policy applied when the caller does not override it.
    ///
    /// Horizons and units act as the stratigraphic reference shared by every
    /// copy. Faults and fault blocks are occurrences owned by one model.
    /// Mesh-kernel pieces are owned by the kernel and cannot be re-minted here.
    #[must_use]
    pub const fn default_for(ty: ComponentType) -> Self {
        match ty {
            ComponentType::Fault | ComponentType::FaultBlock => Self::Instance,
            ComponentType::Horizon
            | ComponentType::StratigraphicUnit
            | ComponentType::Corner
            | ComponentType::Line
            | ComponentType::Surface
            | ComponentType::Block => Self::Shared,
        }
    }
}

// =============================================================================
// BIJECTIVE MAPPING
// =============================================================================

/// One-to-one uuid translation for a single component type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BijectiveMapping {
    in2out: BTreeMap<Uuid, Uuid>,
    out2in: BTreeMap<Uuid, Uuid>,
}

impl BijectiveMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `input -> output`.
    ///
    /// Re-recording the same pair is a no-op. Mapping an input twice or
    /// reusing an output fails with `MappingError`.
    pub fn map(&mut self, input: Uuid, output: Uuid) -> Result<(), LithosError> {
        match (self.in2out.get(&input), self.out2in.get(&output)) {
            (Some(existing), _) if *existing == output => return Ok(()),
            (Some(existing), _) => {
                return Err(LithosError::mapping(format!(
                    "{input} is already mapped to {existing}"
                )));
            }
            (None, Some(previous)) => {
                return Err(LithosError::mapping(format!(
                    "{output} is already the image of {previous}"
                )));
            }
            (None, None) => {}
        }
        self.in2out.insert(input, output);
        self.out2in.insert(output, input);
        Ok(())
    }

    pub fn in2out(&self, input: &Uuid) -> Result<Uuid, LithosError> {
        self.in2out
            .get(input)
            .copied()
            .ok_or_else(|| LithosError::mapping(format!("{input} was never mapped")))
    }

    pub fn out2in(&self, output: &Uuid) -> Result<Uuid, LithosError> {
        self.out2in
            .get(output)
            .copied()
            .ok_or_else(|| LithosError::mapping(format!("{output} is not an image")))
    }

    #[must_use]
    pub fn has_mapping_input(&self, input: &Uuid) -> bool {
        self.in2out.contains_key(input)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.in2out.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.in2out.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &Uuid)> + '_ {
        self.in2out.iter()
    }
}

// =============================================================================
// CLONE MAPPING
// =============================================================================

/// Per-type mappings produced by one clone or copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneMapping {
    mappings: BTreeMap<ComponentType, BijectiveMapping>,
}

impl CloneMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&mut self, ty: ComponentType, input: Uuid, output: Uuid) -> Result<(), LithosError> {
        self.mappings.entry(ty).or_default().map(input, output)
    }

    pub fn in2out(&self, ty: ComponentType, input: &Uuid) -> Result<Uuid, LithosError> {
        self.mappings
            .get(&ty)
            .ok_or_else(|| LithosError::mapping(format!("no {ty} was mapped")))?
            .in2out(input)
    }

    /// Translate a full component id; the type tag is preserved.
    pub fn translate(&self, id: &ComponentId) -> Result<ComponentId, LithosError> {
        Ok(ComponentId::new(id.ty, self.in2out(id.ty, &id.id)?))
    }

    #[must_use]
    pub fn get(&self, ty: ComponentType) -> Option<&BijectiveMapping> {
        self.mappings.get(&ty)
    }

    pub fn types(&self) -> impl Iterator<Item = ComponentType> + '_ {
        self.mappings.keys().copied()
    }

    /// Total number of mapped ids over every type.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.values().map(BijectiveMapping::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when no two inputs of a type share an output.
    #[must_use]
    pub fn is_injective(&self) -> bool {
        self.mappings.values().all(|m| {
            m.in2out.len() == m.out2in.len()
                && m.in2out
                    .iter()
                    .all(|(input, output)| m.out2in.get(output) == Some(input))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_input_is_mapping_error() {
        let mapping = CloneMapping::new();
        let id = ComponentId::new(ComponentType::Fault, Uuid::new_v4());
        assert!(matches!(mapping.translate(&id), Err(LithosError::MappingError(_))));
    }

    #[test]
    fn conflicting_pairs_are_rejected() {
        let mut mapping = BijectiveMapping::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        mapping.map(a, b).expect("map");
        mapping.map(a, b).expect("same pair");

        assert!(mapping.map(a, c).is_err());
        assert!(mapping.map(c, b).is_err());
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.out2in(&b).expect("out2in"), a);
    }

    #[test]
    fn translate_keeps_type_tag() {
        let mut mapping = CloneMapping::new();
        let (old, new) = (Uuid::new_v4(), Uuid::new_v4());
        mapping.map(ComponentType::Horizon, old, new).expect("map");

        let translated = mapping
            .translate(&ComponentId::new(ComponentType::Horizon, old))
            .expect("translate");
        assert_eq!(translated, ComponentId::new(ComponentType::Horizon, new));
        // Same uuid under another type is a different component.
        assert!(mapping.in2out(ComponentType::StratigraphicUnit, &old).is_err());
        assert!(mapping.is_injective());
    }

    #[test]
    fn default_policies() {
        assert_eq!(IdentityPolicy::default_for(ComponentType::Fault), IdentityPolicy::Instance);
        assert_eq!(IdentityPolicy::default_for(ComponentType::Horizon), IdentityPolicy::Shared);
    }
}
