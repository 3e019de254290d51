//! Property accessors for primary and foreign keys.
//!
//! A [`Key`] is the injected "read(instance) -> value" capability attached to
//! every key declaration: a `Send + Sync` closure from a type-erased entity
//! instance to zero or more [`KeyValue`]s. Keys are built through typed
//! constructors so the closure body stays fully type-checked.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::types::{EntityType, Ids, KeyValue};

type ReadFn = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Ids + Send + Sync>;

/// A read-only accessor from an entity instance to a key value.
#[derive(Clone)]
pub struct Key {
    source: EntityType,
    read: ReadFn,
}

impl Key {
    /// An accessor for a required single-valued key.
    pub fn new<T, V, F>(accessor: F) -> Self
    where
        T: 'static,
        V: Into<KeyValue>,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        Self {
            source: EntityType::of::<T>(),
            read: Arc::new(move |obj| match obj.downcast_ref::<T>() {
                Some(entity) => Ids::One(accessor(entity).into()),
                None => Ids::None,
            }),
        }
    }

    /// An accessor for an optional single-valued key.
    pub fn optional<T, V, F>(accessor: F) -> Self
    where
        T: 'static,
        V: Into<KeyValue>,
        F: Fn(&T) -> Option<V> + Send + Sync + 'static,
    {
        Self {
            source: EntityType::of::<T>(),
            read: Arc::new(move |obj| match obj.downcast_ref::<T>() {
                Some(entity) => match accessor(entity) {
                    Some(id) => Ids::One(id.into()),
                    None => Ids::None,
                },
                None => Ids::None,
            }),
        }
    }

    /// An accessor for a multi-valued key (to-many relations).
    pub fn many<T, V, I, F>(accessor: F) -> Self
    where
        T: 'static,
        V: Into<KeyValue>,
        I: IntoIterator<Item = V>,
        F: Fn(&T) -> I + Send + Sync + 'static,
    {
        Self {
            source: EntityType::of::<T>(),
            read: Arc::new(move |obj| match obj.downcast_ref::<T>() {
                Some(entity) => {
                    Ids::Many(accessor(entity).into_iter().map(Into::into).collect())
                }
                None => Ids::None,
            }),
        }
    }

    /// A composite key combining the parts into a [`KeyValue::Composite`].
    ///
    /// The composite reads as absent when any part reads as absent.
    pub fn composite(parts: impl IntoIterator<Item = Key>) -> Self {
        Self::composite_with(parts, KeyValue::composite)
    }

    /// A composite key with a caller-supplied converter combining the part
    /// values into one key value.
    pub fn composite_with<C>(parts: impl IntoIterator<Item = Key>, converter: C) -> Self
    where
        C: Fn(Vec<KeyValue>) -> KeyValue + Send + Sync + 'static,
    {
        let parts: Vec<Key> = parts.into_iter().collect();
        let source = parts
            .first()
            .map(|k| k.source)
            .unwrap_or_else(EntityType::of::<()>);
        Self {
            source,
            read: Arc::new(move |obj| {
                let mut values = Vec::with_capacity(parts.len());
                for part in &parts {
                    match part.read(obj).into_one() {
                        Some(value) => values.push(value),
                        None => return Ids::None,
                    }
                }
                Ids::One(converter(values))
            }),
        }
    }

    /// The entity type this accessor reads from.
    pub fn source(&self) -> EntityType {
        self.source
    }

    /// Read the key value(s) off an instance. An instance of a different
    /// type than the accessor was built for reads as no value.
    pub fn read(&self, obj: &(dyn Any + Send + Sync)) -> Ids {
        (self.read)(obj)
    }

    /// Read a single key value off an instance.
    pub fn read_one(&self, obj: &(dyn Any + Send + Sync)) -> Option<KeyValue> {
        self.read(obj).into_one()
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("source", &self.source.name())
            .finish_non_exhaustive()
    }
}
