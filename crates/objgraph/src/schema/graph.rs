//! Directed graph over entity types with deterministic topological sort.

use std::collections::{BTreeMap, BTreeSet};

use super::types::EntityType;
use crate::error::Error;

/// A directed graph whose nodes are entity types and whose edges point
/// from a referencing type to the referenced type.
///
/// All containers are ordered by [`EntityType`]'s name-based ordering, so
/// iteration and sorting are deterministic for identical input graphs.
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    nodes: BTreeSet<EntityType>,
    outgoing: BTreeMap<EntityType, BTreeSet<EntityType>>,
    incoming: BTreeMap<EntityType, BTreeSet<EntityType>>,
}

impl TypeGraph {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node.
    pub fn add_node(&mut self, node: EntityType) {
        self.nodes.insert(node);
    }

    /// Add an edge (and both endpoints) from `from` to `to`.
    pub fn add_edge(&mut self, from: EntityType, to: EntityType) {
        self.add_node(from);
        self.add_node(to);
        self.outgoing.entry(from).or_default().insert(to);
        self.incoming.entry(to).or_default().insert(from);
    }

    /// All nodes, in deterministic order.
    pub fn nodes(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.nodes.iter().copied()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether an edge from `from` to `to` exists.
    pub fn has_edge(&self, from: EntityType, to: EntityType) -> bool {
        self.outgoing
            .get(&from)
            .is_some_and(|targets| targets.contains(&to))
    }

    /// The types `from` has edges to.
    pub fn targets_of(&self, from: EntityType) -> impl Iterator<Item = EntityType> + '_ {
        self.outgoing
            .get(&from)
            .into_iter()
            .flat_map(|targets| targets.iter().copied())
    }

    /// Number of edges into `to`.
    pub fn incoming_count(&self, to: EntityType) -> usize {
        self.incoming.get(&to).map_or(0, BTreeSet::len)
    }

    /// Kahn topological sort: every edge's source sorts before its target.
    ///
    /// The ready set is kept ordered, so identical graphs always sort to
    /// the same order. Fails with [`Error::CircularDependency`] if the
    /// graph is not a DAG.
    pub fn topo_sort(&self) -> Result<Vec<EntityType>, Error> {
        let mut indegree: BTreeMap<EntityType, usize> = self
            .nodes
            .iter()
            .map(|&node| (node, self.incoming_count(node)))
            .collect();

        let mut ready: BTreeSet<EntityType> = indegree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&node, _)| node)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(&node) = ready.iter().next() {
            ready.remove(&node);
            order.push(node);
            for target in self.targets_of(node) {
                if let Some(degree) = indegree.get_mut(&target) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(target);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            let stuck = indegree
                .iter()
                .find(|(node, _)| !order.contains(node))
                .map(|(node, _)| node.name())
                .unwrap_or("<unknown>");
            return Err(Error::CircularDependency { entity: stuck });
        }
        Ok(order)
    }
}
