//! The schema: a validated registry of entity descriptors.

use std::collections::{BTreeMap, BTreeSet};

use super::descriptor::EntityDescriptor;
use super::foreign_key::ForeignKey;
use super::graph::TypeGraph;
use super::node::Node;
use super::types::EntityType;
use crate::error::Error;

/// Holds all of the metadata about an object graph: the registered entity
/// descriptors and the primary and foreign keys declared on them.
///
/// A schema is built once at startup, validated, and then treated as
/// immutable. Any registration after a successful [`Schema::validate`]
/// marks the schema dirty and requires re-validation before use.
#[derive(Debug, Default)]
pub struct Schema {
    validated: bool,
    descriptors: BTreeMap<EntityType, EntityDescriptor>,
}

impl Schema {
    /// An empty, unvalidated schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, replacing any previous registration for the
    /// same entity type. Marks the schema dirty.
    pub fn add_entity_descriptor(&mut self, descriptor: EntityDescriptor) {
        self.validated = false;
        self.descriptors.insert(descriptor.entity_type(), descriptor);
    }

    /// Builder-style [`Schema::add_entity_descriptor`].
    pub fn with_entity(mut self, descriptor: EntityDescriptor) -> Self {
        self.add_entity_descriptor(descriptor);
        self
    }

    /// Whether the schema has been validated since the last registration.
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    fn assert_validated(&self) -> Result<(), Error> {
        if self.validated {
            Ok(())
        } else {
            Err(Error::SchemaNotValidated)
        }
    }

    /// The descriptor registered for exactly this entity type.
    pub fn entity_descriptor(&self, entity_type: EntityType) -> Option<&EntityDescriptor> {
        self.descriptors.get(&entity_type)
    }

    /// All descriptors registered for this type, either directly or via a
    /// graph-key alias.
    pub fn descriptors_for(&self, entity_type: EntityType) -> Vec<&EntityDescriptor> {
        self.descriptors
            .values()
            .filter(|d| d.entity_type() == entity_type || d.graph_key() == entity_type)
            .collect()
    }

    /// The graph key under which instances of this type are stored.
    /// Unregistered types resolve to themselves.
    pub fn graph_key_for(&self, entity_type: EntityType) -> EntityType {
        self.descriptors
            .get(&entity_type)
            .map_or(entity_type, EntityDescriptor::graph_key)
    }

    /// All registered entity types.
    pub fn entity_types(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.descriptors.keys().copied()
    }

    /// All registered descriptors.
    pub fn entity_descriptors(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.descriptors.values()
    }

    /// The foreign keys declared on this type (directly or via alias).
    pub fn describe_foreign_keys_from(&self, entity_type: EntityType) -> Vec<&ForeignKey> {
        self.descriptors_for(entity_type)
            .into_iter()
            .flat_map(|d| d.foreign_keys().iter())
            .collect()
    }

    /// The foreign keys declared on other types pointing to this type.
    pub fn describe_foreign_keys_to(&self, entity_type: EntityType) -> Vec<&ForeignKey> {
        self.descriptors
            .values()
            .flat_map(|d| d.foreign_keys().iter())
            .filter(|fk| fk.to_type() == entity_type)
            .collect()
    }

    /// The foreign keys declared from one type to another.
    pub fn describe_foreign_keys_between(
        &self,
        from: EntityType,
        to: EntityType,
    ) -> Vec<&ForeignKey> {
        self.describe_foreign_keys_from(from)
            .into_iter()
            .filter(|fk| fk.to_type() == to)
            .collect()
    }

    /// Every foreign key declared in the schema.
    pub fn describe_foreign_keys(&self) -> Vec<&ForeignKey> {
        self.descriptors
            .values()
            .flat_map(|d| d.foreign_keys().iter())
            .collect()
    }

    /// Validate the schema. All-or-nothing: on the first problem the
    /// schema stays unvalidated and the error is returned.
    ///
    /// Checks that every descriptor has a primary key, that every accessor
    /// reads from the type it was registered on, and that every foreign
    /// key points to a registered type (directly or via a graph-key
    /// alias).
    pub fn validate(&mut self) -> Result<(), Error> {
        for descriptor in self.descriptors.values() {
            let entity = descriptor.entity_type();

            let pk = descriptor
                .primary_key()
                .ok_or(Error::MissingPrimaryKey { entity: entity.name() })?;
            if pk.source() != entity {
                return Err(Error::AccessorTypeMismatch {
                    entity: entity.name(),
                    found: pk.source().name(),
                });
            }

            for fk in descriptor.foreign_keys() {
                if fk.key().source() != entity {
                    return Err(Error::AccessorTypeMismatch {
                        entity: entity.name(),
                        found: fk.key().source().name(),
                    });
                }
                let target = fk.to_type();
                let known = self
                    .descriptors
                    .values()
                    .any(|d| d.entity_type() == target || d.graph_key() == target);
                if !known {
                    return Err(Error::UnknownForeignKeyTarget {
                        from: entity.name(),
                        to: target.name(),
                    });
                }
            }
        }

        self.validated = true;
        Ok(())
    }

    /// Describe the rooted traversal tree starting at the given type.
    ///
    /// Requires a validated schema. Nodes whose type already appears among
    /// their own ancestors are marked circular and not recursed through,
    /// so the tree is finite even for self-referential schemas.
    pub fn describe(&self, entity_type: EntityType) -> Result<Node, Error> {
        self.assert_validated()?;
        if self.descriptors_for(entity_type).is_empty() {
            return Err(Error::UnknownEntityDescriptor {
                entity: entity_type.name(),
            });
        }
        let mut ancestors = Vec::new();
        Ok(self.build_node(entity_type, &mut ancestors))
    }

    fn build_node(&self, entity_type: EntityType, ancestors: &mut Vec<EntityType>) -> Node {
        let foreign_keys: Vec<ForeignKey> = self
            .describe_foreign_keys_from(entity_type)
            .into_iter()
            .cloned()
            .collect();

        if ancestors.contains(&entity_type) {
            return Node::circular(entity_type, foreign_keys);
        }

        ancestors.push(entity_type);
        let children = foreign_keys
            .iter()
            .map(|fk| self.build_node(fk.to_type(), ancestors))
            .collect();
        ancestors.pop();

        Node::new(entity_type, foreign_keys, children)
    }

    /// Build the type graph reachable from the given starting types.
    ///
    /// Fails with [`Error::CircularDependency`] if the walk revisits a
    /// type already on its own ancestor chain: cyclic schemas have no
    /// terminating expansion and cannot be planned.
    pub fn graph(&self, start_types: &[EntityType]) -> Result<TypeGraph, Error> {
        self.assert_validated()?;
        let mut graph = TypeGraph::new();
        let starts: BTreeSet<EntityType> = start_types.iter().copied().collect();
        for start in starts {
            let node = self.describe(start)?;
            Self::collect_graph(&node, &mut graph)?;
        }
        Ok(graph)
    }

    fn collect_graph(node: &Node, graph: &mut TypeGraph) -> Result<(), Error> {
        if node.is_circular() {
            return Err(Error::CircularDependency {
                entity: node.entity_type().name(),
            });
        }
        graph.add_node(node.entity_type());
        for (fk, child) in node.foreign_keys().iter().zip(node.children()) {
            graph.add_edge(node.entity_type(), fk.to_type());
            Self::collect_graph(child, graph)?;
        }
        Ok(())
    }
}
