//! # Relationship Graph
//!
//! Generic edge store over component ids.
//!
//! Edges form a set of `(from, to, kind)` triples. Both directions are
//! indexed, so every query is a lookup from either endpoint.
//!
//! Invariants:
//! - an edge references only registered ids
//! - at most one outgoing `Above` and one outgoing `Under` edge per node
//! - unregistering a component removes every incident edge

use crate::ordering::OrderingBuilder;
use crate::types::{ComponentId, Edge, EdgeKind, LithosError};
use std::collections::{BTreeMap, BTreeSet};

type Adjacency = BTreeMap<ComponentId, BTreeSet<(EdgeKind, ComponentId)>>;

// =============================================================================
// GRAPH
// =============================================================================

/// The relationship graph of one model.
///
/// Nodes are component ids, edges are typed and directed. Uses `BTreeMap`
/// and `BTreeSet` only, so iteration order is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipGraph {
    /// Registered components
    components: BTreeSet<ComponentId>,

    /// from -> (kind, to)
    outgoing: Adjacency,

    /// to -> (kind, from)
    incoming: Adjacency,
}

impl RelationshipGraph {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    /// Check if `id` is a node of the graph.
    #[must_use]
    pub fn is_registered(&self, id: &ComponentId) -> bool {
        self.components.contains(id)
    }

    /// Every registered id, ordered by type then uuid.
    pub fn components(&self) -> impl Iterator<Item = &ComponentId> + '_ {
        self.components.iter()
    }

    /// Get the number of registered components.
    #[must_use]
    pub fn nb_components(&self) -> usize {
        self.components.len()
    }

    /// Every edge, ordered by source then kind then target.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.outgoing.iter().flat_map(|(from, targets)| {
            targets
                .iter()
                .map(move |(kind, to)| Edge::new(*from, *to, *kind))
        })
    }

    /// Get the total number of edges. A mirrored pair counts twice.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(BTreeSet::len).sum()
    }

    /// Check if the exact edge `(from, to, kind)` exists.
    #[must_use]
    pub fn has_edge(&self, from: &ComponentId, to: &ComponentId, kind: EdgeKind) -> bool {
        self.outgoing
            .get(from)
            .is_some_and(|targets| targets.contains(&(kind, *to)))
    }

    /// Targets of the edges of `kind` leaving `id`.
    pub fn targets(&self, id: &ComponentId, kind: EdgeKind) -> impl Iterator<Item = ComponentId> + '_ {
        Self::neighbors(&self.outgoing, id, kind)
    }

    /// Sources of the edges of `kind` reaching `id`.
    pub fn sources(&self, id: &ComponentId, kind: EdgeKind) -> impl Iterator<Item = ComponentId> + '_ {
        Self::neighbors(&self.incoming, id, kind)
    }

    /// Every edge touching `id`, in either direction.
    #[must_use]
    pub fn incident_edges(&self, id: &ComponentId) -> Vec<Edge> {
        let mut edges = BTreeSet::new();
        if let Some(targets) = self.outgoing.get(id) {
            edges.extend(targets.iter().map(|(kind, to)| Edge::new(*id, *to, *kind)));
        }
        if let Some(sources) = self.incoming.get(id) {
            edges.extend(
                sources
                    .iter()
                    .map(|(kind, from)| Edge::new(*from, *id, *kind)),
            );
        }
        edges.into_iter().collect()
    }

    /// Components bounding `id`.
    ///
    /// Read from `Boundary` edges reaching `id` and from `Incidence` edges
    /// leaving it, so a half-written relation is still found.
    pub fn boundaries_of(&self, id: &ComponentId) -> Result<Vec<ComponentId>, LithosError> {
        self.ensure_registered(id)?;
        let mut result: BTreeSet<ComponentId> = self.sources(id, EdgeKind::Boundary).collect();
        result.extend(self.targets(id, EdgeKind::Incidence));
        Ok(result.into_iter().collect())
    }

    /// Components `id` is a boundary of. Both directions are read, as in
    /// [`RelationshipGraph::boundaries_of`].
    pub fn incidences_of(&self, id: &ComponentId) -> Result<Vec<ComponentId>, LithosError> {
        self.ensure_registered(id)?;
        let mut result: BTreeSet<ComponentId> = self.targets(id, EdgeKind::Boundary).collect();
        result.extend(self.sources(id, EdgeKind::Incidence));
        Ok(result.into_iter().collect())
    }

    /// Items of the collection `collection`.
    pub fn items_of(&self, collection: &ComponentId) -> Result<Vec<ComponentId>, LithosError> {
        self.ensure_registered(collection)?;
        Ok(self.sources(collection, EdgeKind::CollectionItem).collect())
    }

    /// Collections `item` belongs to.
    pub fn collections_of(&self, item: &ComponentId) -> Result<Vec<ComponentId>, LithosError> {
        self.ensure_registered(item)?;
        Ok(self.targets(item, EdgeKind::CollectionItem).collect())
    }

    /// `ComponentNotFound` unless `id` is registered.
    pub(crate) fn ensure_registered(&self, id: &ComponentId) -> Result<(), LithosError> {
        if self.components.contains(id) {
            Ok(())
        } else {
            Err(LithosError::ComponentNotFound(*id))
        }
    }

    fn neighbors<'a>(
        index: &'a Adjacency,
        id: &ComponentId,
        kind: EdgeKind,
    ) -> impl Iterator<Item = ComponentId> + 'a {
        index
            .get(id)
            .into_iter()
            .flat_map(move |set| set.range((kind, ComponentId::MIN)..=(kind, ComponentId::MAX)))
            .map(|(_, other)| *other)
    }

    // -------------------------------------------------------------------------
    // Mutation (reachable through RelationshipsBuilder only)
    // -------------------------------------------------------------------------

    /// Add `id` as a node. Fails with `DuplicateId` if it is already one.
    pub(crate) fn register_component(&mut self, id: ComponentId) -> Result<(), LithosError> {
        if !self.components.insert(id) {
            return Err(LithosError::DuplicateId(id));
        }
        Ok(())
    }

    /// Remove `id` and, before it, every edge incident to it.
    pub(crate) fn unregister_component(&mut self, id: &ComponentId) -> Result<(), LithosError> {
        self.ensure_registered(id)?;
        for edge in self.incident_edges(id) {
            self.detach(&edge);
        }
        self.outgoing.remove(id);
        self.incoming.remove(id);
        self.components.remove(id);
        Ok(())
    }

    /// Insert one edge once `check_edge` accepts it.
    pub(crate) fn add_edge(
        &mut self,
        from: ComponentId,
        to: ComponentId,
        kind: EdgeKind,
    ) -> Result<(), LithosError> {
        self.check_edge(&from, &to, kind)?;
        self.attach(Edge::new(from, to, kind));
        Ok(())
    }

    /// Add an edge and its mirror, or neither.
    pub(crate) fn add_mirrored_edge(
        &mut self,
        from: ComponentId,
        to: ComponentId,
        kind: EdgeKind,
    ) -> Result<(), LithosError> {
        let edge = Edge::new(from, to, kind);
        let mirror = edge.mirrored().ok_or_else(|| {
            LithosError::invariant(format!("{kind} edges have no mirrored counterpart"))
        })?;
        self.check_edge(&edge.from, &edge.to, edge.kind)?;
        self.check_edge(&mirror.from, &mirror.to, mirror.kind)?;
        self.attach(edge);
        self.attach(mirror);
        Ok(())
    }

    /// Remove one edge. Fails with `EdgeNotFound` if it does not exist.
    pub(crate) fn remove_edge(
        &mut self,
        from: &ComponentId,
        to: &ComponentId,
        kind: EdgeKind,
    ) -> Result<(), LithosError> {
        let edge = Edge::new(*from, *to, kind);
        if !self.detach(&edge) {
            return Err(LithosError::EdgeNotFound {
                from: *from,
                to: *to,
                kind,
            });
        }
        Ok(())
    }

    /// Validate an edge before insertion. An edge already present is valid.
    fn check_edge(
        &self,
        from: &ComponentId,
        to: &ComponentId,
        kind: EdgeKind,
    ) -> Result<(), LithosError> {
        self.ensure_registered(from)?;
        self.ensure_registered(to)?;
        if from == to {
            return Err(LithosError::invariant(format!(
                "{kind} edge from {from} to itself"
            )));
        }
        if self.has_edge(from, to, kind) {
            return Ok(());
        }
        if kind.is_ordering() {
            if let Some(existing) = self.targets(from, kind).next() {
                return Err(LithosError::invariant(format!(
                    "{from} already has an outgoing {kind} edge to {existing}"
                )));
            }
        }
        Ok(())
    }

    /// Index `edge` in both directions.
    fn attach(&mut self, edge: Edge) {
        self.outgoing
            .entry(edge.from)
            .or_default()
            .insert((edge.kind, edge.to));
        self.incoming
            .entry(edge.to)
            .or_default()
            .insert((edge.kind, edge.from));
    }

    /// Drop `edge` from both indexes. Returns false if it was absent.
    fn detach(&mut self, edge: &Edge) -> bool {
        let removed = Self::remove_entry(&mut self.outgoing, &edge.from, (edge.kind, edge.to));
        if removed {
            Self::remove_entry(&mut self.incoming, &edge.to, (edge.kind, edge.from));
        }
        removed
    }

    /// Remove one adjacency entry, dropping the set once it is empty.
    fn remove_entry(
        index: &mut Adjacency,
        key: &ComponentId,
        entry: (EdgeKind, ComponentId),
    ) -> bool {
        let Some(set) = index.get_mut(key) else {
            return false;
        };
        let removed = set.remove(&entry);
        if set.is_empty() {
            index.remove(key);
        }
        removed
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Exclusive write handle over a relationship graph.
///
/// A handle obtained from a model builder only registers and unregisters
/// mesh-kernel pieces: geological ids follow their registry.
pub struct RelationshipsBuilder<'a> {
    graph: &'a mut RelationshipGraph,
    model_owned: bool,
}

impl<'a> RelationshipsBuilder<'a> {
    /// Handle over a free-standing graph. Any component type is accepted.
    pub fn new(graph: &'a mut RelationshipGraph) -> Self {
        Self {
            graph,
            model_owned: false,
        }
    }

    /// Handle over the graph of a model.
    pub(crate) fn for_model(graph: &'a mut RelationshipGraph) -> Self {
        Self {
            graph,
            model_owned: true,
        }
    }

    /// Register `id` as a node of the graph.
    ///
    /// Fails with `DuplicateId` when `id` is already registered, and with
    /// `InvariantViolation` for a geological id on a model handle.
    pub fn register_component(&mut self, id: ComponentId) -> Result<(), LithosError> {
        self.ensure_unowned(&id, "add it through its registry")?;
        self.graph.register_component(id)
    }

    /// Unregister `id`. Incident edges are removed silently first.
    ///
    /// Fails with `ComponentNotFound` when `id` is not registered, and with
    /// `InvariantViolation` for a geological id on a model handle.
    pub fn unregister_component(&mut self, id: &ComponentId) -> Result<(), LithosError> {
        self.ensure_unowned(id, "remove it through its registry")?;
        self.graph.unregister_component(id)
    }

    fn ensure_unowned(&self, id: &ComponentId, hint: &str) -> Result<(), LithosError> {
        if self.model_owned && id.ty.is_geological() {
            return Err(LithosError::invariant(format!("{id} is geological; {hint}")));
        }
        Ok(())
    }

    /// Add one edge, without its mirror.
    ///
    /// Both endpoints must be registered and distinct. Adding an edge that
    /// already exists is a no-op.
    pub fn add_edge(
        &mut self,
        from: ComponentId,
        to: ComponentId,
        kind: EdgeKind,
    ) -> Result<(), LithosError> {
        self.graph.add_edge(from, to, kind)
    }

    /// Remove one edge. Fails with `EdgeNotFound` if it does not exist.
    pub fn remove_edge(
        &mut self,
        from: &ComponentId,
        to: &ComponentId,
        kind: EdgeKind,
    ) -> Result<(), LithosError> {
        self.graph.remove_edge(from, to, kind)
    }

    /// Record that `boundary` bounds `incident` (Boundary edge + Incidence mirror).
    pub fn add_boundary_relation(
        &mut self,
        boundary: ComponentId,
        incident: ComponentId,
    ) -> Result<(), LithosError> {
        self.graph
            .add_mirrored_edge(boundary, incident, EdgeKind::Boundary)
    }

    /// Remove a boundary relation and, if present, its `Incidence` mirror.
    ///
    /// Fails with `EdgeNotFound` when the `Boundary` edge is absent.
    pub fn remove_boundary_relation(
        &mut self,
        boundary: &ComponentId,
        incident: &ComponentId,
    ) -> Result<(), LithosError> {
        self.graph
            .remove_edge(boundary, incident, EdgeKind::Boundary)?;
        // The mirror may be absent when the Boundary edge was added on its own.
        let _ = self
            .graph
            .remove_edge(incident, boundary, EdgeKind::Incidence);
        Ok(())
    }

    /// Record that `item` is one of the pieces of `collection`.
    ///
    /// A single `CollectionItem` edge, never mirrored.
    pub fn add_item_in_collection(
        &mut self,
        item: ComponentId,
        collection: ComponentId,
    ) -> Result<(), LithosError> {
        self.graph
            .add_edge(item, collection, EdgeKind::CollectionItem)
    }

    /// Remove `item` from `collection`. Fails with `EdgeNotFound` if it was
    /// not an item.
    pub fn remove_item_from_collection(
        &mut self,
        item: &ComponentId,
        collection: &ComponentId,
    ) -> Result<(), LithosError> {
        self.graph
            .remove_edge(item, collection, EdgeKind::CollectionItem)
    }

    /// Stratigraphic ordering operations over the same graph.
    pub fn ordering(&mut self) -> OrderingBuilder<'_> {
        OrderingBuilder::new(self.graph)
    }
}

// =============================================================================
// TESTS
// =============================================================================
