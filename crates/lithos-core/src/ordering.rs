//! # Stratigraphic Ordering
//!
//! Above/Under specialization of the relationship graph.
//!
//! A relation "X lies directly above Y" is stored as the mirrored pair
//! `Above(X, Y)` + `Under(Y, X)`, so both neighbours of a node are direct
//! lookups. The stack is valid when the relation forms one simple path
//! alternating horizons and stratigraphic units.
//!
//! - [`StratigraphicOrdering`]: read-only queries
//! - [`OrderingBuilder`]: mutation, repair, and copy through a mapping

use crate::mapping::CloneMapping;
use crate::relationships::RelationshipGraph;
use crate::types::{ComponentId, ComponentType, EdgeKind, LithosError};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

// =============================================================================
// READ-ONLY VIEW
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct StratigraphicOrdering<'a> {
    graph: &'a RelationshipGraph,
}

impl<'a> StratigraphicOrdering<'a> {
    pub fn new(graph: &'a RelationshipGraph) -> Self {
        Self { graph }
    }

    /// The component directly above `id`, if any.
    pub fn above(&self, id: &ComponentId) -> Result<Option<ComponentId>, LithosError> {
        self.graph.ensure_registered(id)?;
        Ok(self
            .graph
            .targets(id, EdgeKind::Under)
            .next()
            .or_else(|| self.graph.sources(id, EdgeKind::Above).next()))
    }

    /// The component directly under `id`, if any.
    pub fn under(&self, id: &ComponentId) -> Result<Option<ComponentId>, LithosError> {
        self.graph.ensure_registered(id)?;
        Ok(self
            .graph
            .targets(id, EdgeKind::Above)
            .next()
            .or_else(|| self.graph.sources(id, EdgeKind::Under).next()))
    }

    /// True when `target` lies somewhere above `from` in the stack.
    ///
    /// Follows `Under` edges upward from `from`. A component is never above
    /// itself.
    pub fn is_above(&self, from: &ComponentId, target: &ComponentId) -> Result<bool, LithosError> {
        self.graph.ensure_registered(target)?;
        let mut visited = BTreeSet::from([*from]);
        let mut current = self.above(from)?;
        while let Some(next) = current {
            if !visited.insert(next) {
                // Cycle: the stack is broken, stop walking.
                return Ok(false);
            }
            if next == *target {
                return Ok(true);
            }
            current = self.above(&next)?;
        }
        Ok(false)
    }

    /// Every "directly above" pair `(upper, lower)` implied by the edges.
    #[must_use]
    pub fn relations(&self) -> BTreeSet<(ComponentId, ComponentId)> {
        StackAnalysis::pairs(self.graph)
    }

    /// The whole stack from top to bottom.
    ///
    /// Fails with `InvariantViolation` unless the relations form a single
    /// simple path. An empty stack yields an empty list.
    pub fn stack_order(&self) -> Result<Vec<ComponentId>, LithosError> {
        let analysis = StackAnalysis::run(self.graph);
        analysis.ensure_consistent()?;
        match analysis.chains.len() {
            0 => Ok(Vec::new()),
            1 => Ok(analysis.chains.into_iter().flatten().collect()),
            n => Err(LithosError::invariant(format!(
                "stack is split into {n} disconnected pieces"
            ))),
        }
    }

    /// Stack members with nothing above them.
    #[must_use]
    pub fn tops(&self) -> Vec<ComponentId> {
        let analysis = StackAnalysis::run(self.graph);
        analysis
            .nodes
            .iter()
            .filter(|n| !analysis.uppers.contains_key(*n))
            .copied()
            .collect()
    }

    /// Stack members with nothing under them.
    #[must_use]
    pub fn bottoms(&self) -> Vec<ComponentId> {
        let analysis = StackAnalysis::run(self.graph);
        analysis
            .nodes
            .iter()
            .filter(|n| !analysis.lowers.contains_key(*n))
            .copied()
            .collect()
    }
}

// =============================================================================
// STACK ANALYSIS
// =============================================================================

/// Structural diagnosis of the ordering edges of a graph.
struct StackAnalysis {
    pairs: BTreeSet<(ComponentId, ComponentId)>,
    nodes: BTreeSet<ComponentId>,
    uppers: BTreeMap<ComponentId, BTreeSet<ComponentId>>,
    lowers: BTreeMap<ComponentId, BTreeSet<ComponentId>>,
    /// Independent defects that cannot be fixed without guessing.
    defects: Vec<String>,
    /// Maximal top-to-bottom paths. Only filled when there are no defects.
    chains: Vec<Vec<ComponentId>>,
}

impl StackAnalysis {
    fn pairs(graph: &RelationshipGraph) -> BTreeSet<(ComponentId, ComponentId)> {
        graph
            .edges()
            .filter_map(|edge| match edge.kind {
                EdgeKind::Above => Some((edge.from, edge.to)),
                EdgeKind::Under => Some((edge.to, edge.from)),
                _ => None,
            })
            .collect()
    }

    fn run(graph: &RelationshipGraph) -> Self {
        let pairs = Self::pairs(graph);
        let mut nodes = BTreeSet::new();
        let mut uppers: BTreeMap<ComponentId, BTreeSet<ComponentId>> = BTreeMap::new();
        let mut lowers: BTreeMap<ComponentId, BTreeSet<ComponentId>> = BTreeMap::new();
        for (upper, lower) in &pairs {
            nodes.insert(*upper);
            nodes.insert(*lower);
            lowers.entry(*upper).or_default().insert(*lower);
            uppers.entry(*lower).or_default().insert(*upper);
        }

        let mut defects = Vec::new();
        for node in &nodes {
            if !node.ty.is_stratigraphic() {
                defects.push(format!("{node} cannot be part of a stratigraphic stack"));
            }
        }
        for (node, set) in &lowers {
            if set.len() > 1 {
                defects.push(format!("{node} has {} components directly under it", set.len()));
            }
        }
        for (node, set) in &uppers {
            if set.len() > 1 {
                defects.push(format!("{node} has {} components directly above it", set.len()));
            }
        }
        for (upper, lower) in &pairs {
            if upper.ty == lower.ty {
                defects.push(format!("{upper} lies directly above {lower} of the same kind"));
            }
        }

        let mut analysis = Self {
            pairs,
            nodes,
            uppers,
            lowers,
            defects,
            chains: Vec::new(),
        };
        if analysis.defects.is_empty() {
            analysis.build_chains();
        }
        analysis
    }

    fn build_chains(&mut self) {
        let mut visited = BTreeSet::new();
        for top in self.nodes.iter().filter(|n| !self.uppers.contains_key(*n)) {
            let mut chain = vec![*top];
            visited.insert(*top);
            let mut current = *top;
            while let Some(next) = self.lowers.get(&current).and_then(|s| s.first()) {
                if !visited.insert(*next) {
                    break;
                }
                chain.push(*next);
                current = *next;
            }
            self.chains.push(chain);
        }
        if visited.len() < self.nodes.len() {
            let cycle: Vec<String> = self
                .nodes
                .difference(&visited)
                .map(ToString::to_string)
                .collect();
            self.defects
                .push(format!("cycle through {}", cycle.join(", ")));
        }
    }

    fn ensure_consistent(&self) -> Result<(), LithosError> {
        if self.defects.is_empty() {
            Ok(())
        } else {
            Err(LithosError::invariant(self.defects.join("; ")))
        }
    }

    /// The single pair joining two chains, when exactly one order is valid.
    fn infer_join(&self) -> Result<Option<(ComponentId, ComponentId)>, LithosError> {
        match self.chains.as_slice() {
            [] | [_] => Ok(None),
            [first, second] => {
                let candidates: Vec<(ComponentId, ComponentId)> = [(first, second), (second, first)]
                    .into_iter()
                    .filter_map(|(upper, lower)| {
                        let bottom = upper.last()?;
                        let top = lower.first()?;
                        (bottom.ty != top.ty).then_some((*bottom, *top))
                    })
                    .collect();
                match candidates.as_slice() {
                    [single] => Ok(Some(*single)),
                    [] => Err(LithosError::invariant(
                        "two stack pieces cannot be joined in any order",
                    )),
                    _ => Err(LithosError::invariant(
                        "two stack pieces can be joined in either order",
                    )),
                }
            }
            chains => Err(LithosError::invariant(format!(
                "stack is split into {} disconnected pieces",
                chains.len()
            ))),
        }
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Exclusive write handle over the ordering edges of a graph.
pub struct OrderingBuilder<'a> {
    graph: &'a mut RelationshipGraph,
}

impl<'a> OrderingBuilder<'a> {
    pub fn new(graph: &'a mut RelationshipGraph) -> Self {
        Self { graph }
    }

    /// Record that `horizon` lies directly above `unit`.
    pub fn add_horizon_above(
        &mut self,
        horizon: ComponentId,
        unit: ComponentId,
    ) -> Result<(), LithosError> {
        check_types(&horizon, &unit)?;
        self.graph
            .add_mirrored_edge(horizon, unit, EdgeKind::Above)
    }

    /// Record that `horizon` lies directly under `unit`.
    pub fn add_horizon_under(
        &mut self,
        horizon: ComponentId,
        unit: ComponentId,
    ) -> Result<(), LithosError> {
        check_types(&horizon, &unit)?;
        self.graph
            .add_mirrored_edge(horizon, unit, EdgeKind::Under)
    }

    /// Record that `upper` lies directly above `lower`, whatever their kinds.
    pub fn add_above_relation(
        &mut self,
        upper: ComponentId,
        lower: ComponentId,
    ) -> Result<(), LithosError> {
        for id in [&upper, &lower] {
            if !id.ty.is_stratigraphic() {
                return Err(LithosError::invariant(format!(
                    "{id} cannot be part of a stratigraphic stack"
                )));
            }
        }
        self.graph
            .add_mirrored_edge(upper, lower, EdgeKind::Above)
    }

    /// Remove whichever Above/Under pair connects the two ids.
    pub fn remove_relation(
        &mut self,
        first: &ComponentId,
        second: &ComponentId,
    ) -> Result<(), LithosError> {
        let candidates = [
            (*first, *second, EdgeKind::Above),
            (*second, *first, EdgeKind::Under),
            (*second, *first, EdgeKind::Above),
            (*first, *second, EdgeKind::Under),
        ];
        let present: Vec<_> = candidates
            .into_iter()
            .filter(|(from, to, kind)| self.graph.has_edge(from, to, *kind))
            .collect();
        if present.is_empty() {
            return Err(LithosError::EdgeNotFound {
                from: *first,
                to: *second,
                kind: EdgeKind::Above,
            });
        }
        for (from, to, kind) in present {
            self.graph.remove_edge(&from, &to, kind)?;
        }
        Ok(())
    }

    /// Complete a partially specified stack.
    ///
    /// Restores missing mirror edges and, when the stack is split in exactly
    /// two pieces that can only be joined one way, the joining pair. Returns
    /// the number of edges inserted.
    ///
    /// Branching, cycles, non-stratigraphic members, or more than two pieces
    /// fail with `InvariantViolation` and leave the graph untouched.
    pub fn repair_if_possible(&mut self) -> Result<usize, LithosError> {
        let analysis = StackAnalysis::run(self.graph);
        analysis.ensure_consistent()?;
        let mut pairs = analysis.pairs.clone();
        if let Some(join) = analysis.infer_join()? {
            debug!(upper = %join.0, lower = %join.1, "Joining stack pieces");
            pairs.insert(join);
        }

        let mut repaired = self.graph.clone();
        let mut inserted = 0usize;
        for (upper, lower) in pairs {
            for (from, to, kind) in [(upper, lower, EdgeKind::Above), (lower, upper, EdgeKind::Under)] {
                if !repaired.has_edge(&from, &to, kind) {
                    repaired.add_edge(from, to, kind)?;
                    inserted += 1;
                }
            }
        }
        *self.graph = repaired;
        if inserted > 0 {
            debug!(inserted, "Stratigraphic stack repaired");
        }
        Ok(inserted)
    }

    /// Rebuild every Above/Under edge of `source` in this graph, translating
    /// endpoints through `mapping`.
    ///
    /// Every endpoint must be mapped and its image already registered here,
    /// otherwise nothing is inserted and `MappingError` is returned.
    pub fn copy_stratigraphic_relationships(
        &mut self,
        mapping: &CloneMapping,
        source: &RelationshipGraph,
    ) -> Result<(), LithosError> {
        let mut translated = Vec::new();
        for edge in source.edges().filter(|e| e.kind.is_ordering()) {
            let from = mapping.translate(&edge.from)?;
            let to = mapping.translate(&edge.to)?;
            for id in [&from, &to] {
                if !self.graph.is_registered(id) {
                    return Err(LithosError::mapping(format!(
                        "{id} is mapped but not allocated in the target"
                    )));
                }
            }
            translated.push((from, to, edge.kind));
        }

        let mut target = self.graph.clone();
        for (from, to, kind) in translated {
            target.add_edge(from, to, kind)?;
        }
        *self.graph = target;
        Ok(())
    }
}

fn check_types(horizon: &ComponentId, unit: &ComponentId) -> Result<(), LithosError> {
    if horizon.ty != ComponentType::Horizon {
        return Err(LithosError::invariant(format!("{horizon} is not a horizon")));
    }
    if unit.ty != ComponentType::StratigraphicUnit {
        return Err(LithosError::invariant(format!(
            "{unit} is not a stratigraphic unit"
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
