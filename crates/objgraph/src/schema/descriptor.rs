//! Entity descriptors.

use super::foreign_key::ForeignKey;
use super::key::Key;
use super::types::EntityType;

/// Metadata about one registered entity type: its primary key, the graph
/// key it is stored under, and its declared foreign keys.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    entity_type: EntityType,
    graph_key: EntityType,
    primary_key: Option<Key>,
    foreign_keys: Vec<ForeignKey>,
}

impl EntityDescriptor {
    /// An empty descriptor for `T`, stored under its own type by default.
    pub fn of<T: 'static>() -> Self {
        let entity_type = EntityType::of::<T>();
        Self {
            entity_type,
            graph_key: entity_type,
            primary_key: None,
            foreign_keys: Vec::new(),
        }
    }

    /// Set the primary key accessor.
    pub fn with_primary_key(mut self, key: Key) -> Self {
        self.primary_key = Some(key);
        self
    }

    /// Store this entity's instances under the alias type `G` instead of
    /// the entity type itself. Used to unify polymorphic variants sharing
    /// one backing store.
    pub fn with_graph_key<G: 'static>(mut self) -> Self {
        self.graph_key = EntityType::of::<G>();
        self
    }

    /// Declare a foreign key to `To` read by the given accessor.
    pub fn with_foreign_key<To: 'static>(mut self, key: Key) -> Self {
        self.foreign_keys
            .push(ForeignKey::new(self.entity_type, EntityType::of::<To>(), key));
        self
    }

    /// Declare a foreign key to `To` followed only when the query supplies
    /// an argument of type `A` satisfying the predicate.
    pub fn with_conditional_foreign_key<To, A, P>(mut self, key: Key, predicate: P) -> Self
    where
        To: 'static,
        A: Send + Sync + 'static,
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        self.foreign_keys.push(ForeignKey::conditional(
            self.entity_type,
            EntityType::of::<To>(),
            key,
            predicate,
        ));
        self
    }

    /// The entity type this descriptor describes.
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// The alias type instances are stored under in the object graph.
    pub fn graph_key(&self) -> EntityType {
        self.graph_key
    }

    /// The primary key accessor, if one has been set.
    pub fn primary_key(&self) -> Option<&Key> {
        self.primary_key.as_ref()
    }

    /// The declared foreign keys, in declaration order.
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }
}
