//! Rooted traversal trees over the type graph.

use super::foreign_key::ForeignKey;
use super::types::EntityType;

/// Outcome of visiting one node during a [`Node::walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Descend into the node's children.
    Continue,
    /// Skip the node's children but keep walking siblings.
    SkipChildren,
    /// Abort the walk entirely.
    Stop,
}

/// One node of a rooted traversal of the type graph.
///
/// The tree is built eagerly from a starting entity type by following
/// foreign keys; a node whose type already appears among its own ancestors
/// is marked `circular` and has no children, so the tree is always finite.
#[derive(Debug, Clone)]
pub struct Node {
    entity_type: EntityType,
    foreign_keys: Vec<ForeignKey>,
    children: Vec<Node>,
    circular: bool,
}

impl Node {
    pub(crate) fn new(
        entity_type: EntityType,
        foreign_keys: Vec<ForeignKey>,
        children: Vec<Node>,
    ) -> Self {
        Self {
            entity_type,
            foreign_keys,
            children,
            circular: false,
        }
    }

    pub(crate) fn circular(entity_type: EntityType, foreign_keys: Vec<ForeignKey>) -> Self {
        Self {
            entity_type,
            foreign_keys,
            children: Vec::new(),
            circular: true,
        }
    }

    /// The entity type at this node.
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// The foreign keys declared from this node's type.
    ///
    /// For non-circular nodes, `children()` holds one child per foreign
    /// key, in the same order.
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// The child nodes reached by following this node's foreign keys.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Whether this node's type already appears among its own ancestors in
    /// this traversal. Circular nodes are never recursed through.
    pub fn is_circular(&self) -> bool {
        self.circular
    }

    /// Walk this node's descendants depth-first. Returns `false` when the
    /// visitor stopped the walk early.
    pub fn walk<F>(&self, visit: &mut F) -> bool
    where
        F: FnMut(&Node) -> Visit,
    {
        for child in &self.children {
            match visit(child) {
                Visit::Continue => {
                    if !child.walk(visit) {
                        return false;
                    }
                }
                Visit::SkipChildren => {}
                Visit::Stop => return false,
            }
        }
        true
    }

    /// The first descendant of the given type, if any.
    pub fn find(&self, entity_type: EntityType) -> Option<&Node> {
        for child in &self.children {
            if child.entity_type == entity_type {
                return Some(child);
            }
            if let Some(found) = child.find(entity_type) {
                return Some(found);
            }
        }
        None
    }
}
