//! # Component Registry
//!
//! Typed entity store keyed by uuid.
//!
//! Read access is unrestricted. Every mutating operation is `pub(crate)` on
//! the registry itself and re-exposed publicly only through
//! [`RegistryBuilder`], which borrows the registry exclusively.

use crate::components::Component;
use crate::types::{ComponentId, ComponentType, LithosError};
use std::collections::BTreeMap;
use uuid::Uuid;

// =============================================================================
// READ-ONLY VIEW
// =============================================================================

/// Type-erased read access to one registry.
///
/// Lets generic code (clone, archive, diagnostics) walk every registry of a
/// model without knowing the concrete component type.
pub trait RegistryView {
    fn component_type(&self) -> ComponentType;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, id: &Uuid) -> bool;

    /// All ids, in ascending order.
    fn component_ids(&self) -> Vec<Uuid>;

    fn name_of(&self, id: &Uuid) -> Option<&str>;
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Store of every component of type `T` in one model.
#[derive(Debug, Clone)]
pub struct ComponentRegistry<T: Component> {
    components: BTreeMap<Uuid, T>,
}

impl<T: Component> Default for ComponentRegistry<T> {
    fn default() -> Self {
        Self {
            components: BTreeMap::new(),
        }
    }
}

impl<T: Component> ComponentRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a component, failing with `ComponentNotFound` if absent.
    pub fn get(&self, id: &Uuid) -> Result<&T, LithosError> {
        self.components
            .get(id)
            .ok_or_else(|| LithosError::ComponentNotFound(ComponentId::new(T::TYPE, *id)))
    }

    #[must_use]
    pub fn has(&self, id: &Uuid) -> bool {
        self.components.contains_key(id)
    }

    /// Iterate over all components. Restartable; order is by id.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.components.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.components.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Find components by name. Names are not unique.
    pub fn find_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a T> + 'a {
        self.components.values().filter(move |c| c.name() == name)
    }

    pub(crate) fn create(&mut self) -> Uuid {
        let mut id = Uuid::new_v4();
        while self.components.contains_key(&id) {
            id = Uuid::new_v4();
        }
        self.components.insert(id, T::new(id));
        id
    }

    pub(crate) fn create_with_id(&mut self, id: Uuid) -> Result<(), LithosError> {
        self.insert(T::new(id))
    }

    /// Insert a fully populated component, keeping its id.
    pub(crate) fn insert(&mut self, component: T) -> Result<(), LithosError> {
        let id = component.id();
        if self.components.contains_key(&id) {
            return Err(LithosError::DuplicateId(ComponentId::new(T::TYPE, id)));
        }
        self.components.insert(id, component);
        Ok(())
    }

    pub(crate) fn delete(&mut self, id: &Uuid) -> Result<T, LithosError> {
        self.components
            .remove(id)
            .ok_or_else(|| LithosError::ComponentNotFound(ComponentId::new(T::TYPE, *id)))
    }

    pub(crate) fn get_mut(&mut self, id: &Uuid) -> Result<&mut T, LithosError> {
        self.components
            .get_mut(id)
            .ok_or_else(|| LithosError::ComponentNotFound(ComponentId::new(T::TYPE, *id)))
    }
}

impl<T: Component> RegistryView for ComponentRegistry<T> {
    fn component_type(&self) -> ComponentType {
        T::TYPE
    }

    fn len(&self) -> usize {
        self.components.len()
    }

    fn contains(&self, id: &Uuid) -> bool {
        self.has(id)
    }

    fn component_ids(&self) -> Vec<Uuid> {
        self.ids().collect()
    }

    fn name_of(&self, id: &Uuid) -> Option<&str> {
        self.components.get(id).map(|c| c.name())
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Exclusive write handle over one registry.
///
/// Deleting a component does not touch any relationship graph: callers
/// detach incident edges first (model builders do this for you).
pub struct RegistryBuilder<'a, T: Component> {
    registry: &'a mut ComponentRegistry<T>,
}

impl<'a, T: Component> RegistryBuilder<'a, T> {
    pub fn new(registry: &'a mut ComponentRegistry<T>) -> Self {
        Self { registry }
    }

    /// Mint a fresh id and store a default component under it.
    pub fn create(&mut self) -> Uuid {
        self.registry.create()
    }

    /// Store a default component under an explicit id.
    pub fn create_with_id(&mut self, id: Uuid) -> Result<(), LithosError> {
        self.registry.create_with_id(id)
    }

    pub fn insert(&mut self, component: T) -> Result<(), LithosError> {
        self.registry.insert(component)
    }

    pub fn delete(&mut self, id: &Uuid) -> Result<T, LithosError> {
        self.registry.delete(id)
    }

    pub fn set_name(&mut self, id: &Uuid, name: impl Into<String>) -> Result<(), LithosError> {
        self.registry.get_mut(id)?.set_name(name.into());
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::components::{Fault, Horizon};

    #[test]
    fn create_mints_distinct_ids() {
        let mut registry = ComponentRegistry::<Fault>::new();
        let mut builder = RegistryBuilder::new(&mut registry);
        let a = builder.create();
        let b = builder.create();

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.has(&a));
        assert_eq!(registry.get(&b).unwrap().id(), b);
    }

    #[test]
    fn create_with_existing_id_is_duplicate() {
        let mut registry = ComponentRegistry::<Horizon>::new();
        let mut builder = RegistryBuilder::new(&mut registry);
        let id = Uuid::new_v4();
        builder.create_with_id(id).expect("first");

        let result = builder.create_with_id(id);
        assert!(matches!(
            result,
            Err(LithosError::DuplicateId(cid)) if cid.id == id && cid.ty == ComponentType::Horizon
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn get_missing_is_not_found() {
        let registry = ComponentRegistry::<Fault>::new();
        let result = registry.get(&Uuid::new_v4());
        assert!(matches!(result, Err(LithosError::ComponentNotFound(_))));
    }

    #[test]
    fn delete_removes_and_returns_component() {
        let mut registry = ComponentRegistry::<Fault>::new();
        let mut builder = RegistryBuilder::new(&mut registry);
        let id = builder.create();
        builder.set_name(&id, "F1").expect("name");

        let removed = builder.delete(&id).expect("delete");
        assert_eq!(removed.name(), "F1");
        assert!(builder.delete(&id).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn iteration_is_restartable_and_complete() {
        let mut registry = ComponentRegistry::<Horizon>::new();
        let mut builder = RegistryBuilder::new(&mut registry);
        for _ in 0..5 {
            builder.create();
        }

        let first: Vec<Uuid> = registry.iter().map(|h| h.id()).collect();
        let second: Vec<Uuid> = registry.iter().map(|h| h.id()).collect();
        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
        assert_eq!(first, registry.component_ids());
    }

    #[test]
    fn find_by_name_matches_all() {
        let mut registry = ComponentRegistry::<Horizon>::new();
        let mut builder = RegistryBuilder::new(&mut registry);
        let a = builder.create();
        let b = builder.create();
        builder.set_name(&a, "H").unwrap();
        builder.set_name(&b, "H").unwrap();

        assert_eq!(registry.find_by_name("H").count(), 2);
        assert_eq!(registry.find_by_name("G").count(), 0);
        assert_eq!(registry.name_of(&a), Some("H"));
    }
}
