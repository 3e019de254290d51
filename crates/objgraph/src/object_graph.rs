//! The object graph: the shared, typed result store.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::Error;
use crate::schema::{EntityRef, EntityType, KeyValue, Schema};

type Bucket = Arc<DashMap<KeyValue, EntityRef>>;

#[derive(Default)]
struct GraphInner {
    /// Graph-key aliases snapshotted from the schema (only types whose
    /// alias differs from the type itself).
    aliases: HashMap<EntityType, EntityType>,
    /// Entities keyed by graph type, then by primary key.
    results: DashMap<EntityType, Bucket>,
}

/// The per-request (or accumulated) store of resolved entities, keyed by
/// (graph key, primary key).
///
/// An `ObjectGraph` is a cheaply cloneable handle: clones share the same
/// underlying store, which is what lets concurrent loaders merge results
/// into one graph. Use [`ObjectGraph::deep_copy`] for an independent copy.
/// All mutation is safe under concurrent writers; writes to different ids
/// of the same type do not block each other.
#[derive(Clone, Default)]
pub struct ObjectGraph {
    inner: Arc<GraphInner>,
}

impl std::fmt::Debug for ObjectGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for bucket in self.inner.results.iter() {
            map.entry(&bucket.key().name(), &bucket.value().len());
        }
        map.finish()
    }
}

impl ObjectGraph {
    /// An empty graph resolving aliases according to the given schema.
    pub fn new(schema: &Schema) -> Self {
        let aliases = schema
            .entity_descriptors()
            .filter(|d| d.graph_key() != d.entity_type())
            .map(|d| (d.entity_type(), d.graph_key()))
            .collect();
        Self {
            inner: Arc::new(GraphInner {
                aliases,
                results: DashMap::new(),
            }),
        }
    }

    /// The graph key under which instances of this type are stored.
    pub fn graph_key(&self, entity_type: EntityType) -> EntityType {
        self.inner
            .aliases
            .get(&entity_type)
            .copied()
            .unwrap_or(entity_type)
    }

    fn bucket(&self, entity_type: EntityType) -> Option<Bucket> {
        let key = self.graph_key(entity_type);
        self.inner.results.get(&key).map(|b| b.value().clone())
    }

    fn bucket_or_insert(&self, entity_type: EntityType) -> Bucket {
        let key = self.graph_key(entity_type);
        self.inner
            .results
            .entry(key)
            .or_default()
            .value()
            .clone()
    }

    /// Store an entity under its type's graph key. A second write to the
    /// same (type, id) slot overwrites the first.
    pub fn add_result(&self, entity_type: EntityType, id: KeyValue, value: EntityRef) {
        self.bucket_or_insert(entity_type).insert(id, value);
    }

    /// Typed convenience over [`ObjectGraph::add_result`].
    pub fn insert<T: Send + Sync + 'static>(&self, id: impl Into<KeyValue>, value: T) {
        self.add_result(EntityType::of::<T>(), id.into(), Arc::new(value));
    }

    /// Store an entity unless the (type, id) slot is already occupied:
    /// merge semantics, where the first writer wins. Used when seeding
    /// roots and merging loader results into a supplemented graph.
    pub fn merge_result(&self, entity_type: EntityType, id: KeyValue, value: EntityRef) {
        self.bucket_or_insert(entity_type)
            .entry(id)
            .or_insert(value);
    }

    /// The entity of the given type with the given id.
    pub fn get(&self, entity_type: EntityType, id: &KeyValue) -> Option<EntityRef> {
        self.bucket(entity_type)?.get(id).map(|e| e.value().clone())
    }

    /// Typed lookup: the `T` stored under `T`'s graph key with this id.
    pub fn get_as<T: Send + Sync + 'static>(&self, id: &KeyValue) -> Option<Arc<T>> {
        self.get(EntityType::of::<T>(), id)
            .and_then(|e| e.downcast::<T>().ok())
    }

    /// Like [`ObjectGraph::get_as`], but an absent entity is an error.
    pub fn get_required<T: Send + Sync + 'static>(&self, id: &KeyValue) -> Result<Arc<T>, Error> {
        self.get_as::<T>(id).ok_or_else(|| Error::EntityNotFound {
            entity: EntityType::of::<T>().name(),
            id: id.to_string(),
        })
    }

    /// Whether an entity of the given type with the given id is present.
    pub fn has(&self, entity_type: EntityType, id: &KeyValue) -> bool {
        self.bucket(entity_type)
            .is_some_and(|bucket| bucket.contains_key(id))
    }

    /// A snapshot of all entities of the given type.
    pub fn get_all(&self, entity_type: EntityType) -> Vec<EntityRef> {
        self.bucket(entity_type)
            .map(|bucket| bucket.iter().map(|e| e.value().clone()).collect())
            .unwrap_or_default()
    }

    /// The subset of `ids` present, in the order of `ids`; absent ids are
    /// silently dropped.
    pub fn get_many(&self, entity_type: EntityType, ids: &[KeyValue]) -> Vec<EntityRef> {
        match self.bucket(entity_type) {
            Some(bucket) => ids
                .iter()
                .filter_map(|id| bucket.get(id).map(|e| e.value().clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// A snapshot of all ids of the given type.
    pub fn ids(&self, entity_type: EntityType) -> Vec<KeyValue> {
        self.bucket(entity_type)
            .map(|bucket| bucket.iter().map(|e| e.key().clone()).collect())
            .unwrap_or_default()
    }

    /// The graph types with at least one stored entity.
    pub fn types(&self) -> Vec<EntityType> {
        self.inner.results.iter().map(|b| *b.key()).collect()
    }

    /// Total number of stored entities.
    pub fn len(&self) -> usize {
        self.inner.results.iter().map(|b| b.value().len()).sum()
    }

    /// Whether the graph stores no entities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Union `other`'s entries into this graph. On a (type, id) collision
    /// this graph's existing entry wins.
    pub fn merge(&self, other: &ObjectGraph) {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return;
        }
        for entry in other.inner.results.iter() {
            let dst = self.bucket_or_insert(*entry.key());
            for item in entry.value().iter() {
                dst.entry(item.key().clone())
                    .or_insert_with(|| item.value().clone());
            }
        }
    }

    /// An independent copy of this graph sharing the entity instances but
    /// not the store.
    pub fn deep_copy(&self) -> ObjectGraph {
        let copy = ObjectGraph {
            inner: Arc::new(GraphInner {
                aliases: self.inner.aliases.clone(),
                results: DashMap::new(),
            }),
        };
        copy.merge(self);
        copy
    }
}
