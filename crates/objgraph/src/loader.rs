//! Loader registration and invocation.
//!
//! Every entity type is assumed loadable by primary key with a multi-get
//! pattern; the registered loader function is the single interface the
//! engine uses to fetch entities. Each loader call is an independent,
//! idempotent bulk read — retry policy, if desired, belongs inside the
//! loader implementation.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::debug::{DebugCollector, LoaderCall};
use crate::error::{BoxError, Error};
use crate::query::QueryArgs;
use crate::schema::{EntityRef, EntityType, KeyValue};

type LoadFn = Arc<
    dyn Fn(Option<&(dyn Any + Send + Sync)>, &[KeyValue]) -> Result<Vec<EntityRef>, BoxError>
        + Send
        + Sync,
>;

/// A registered loader for one entity type.
#[derive(Clone)]
pub struct EntityLoader {
    entity_type: EntityType,
    argument_type: Option<EntityType>,
    load: LoadFn,
}

impl EntityLoader {
    /// The entity type this loader produces.
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// The argument type this loader requires, if any.
    pub fn argument_type(&self) -> Option<EntityType> {
        self.argument_type
    }
}

impl std::fmt::Debug for EntityLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityLoader")
            .field("entity_type", &self.entity_type.name())
            .field("argument_type", &self.argument_type.map(|t| t.name()))
            .finish_non_exhaustive()
    }
}

/// The registry of loader functions, one per entity type.
#[derive(Debug, Clone, Default)]
pub struct LoaderRegistry {
    loaders: HashMap<EntityType, EntityLoader>,
}

impl LoaderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bulk loader for `E`.
    pub fn with_loader<E, F>(mut self, loader: F) -> Self
    where
        E: Send + Sync + 'static,
        F: Fn(&[KeyValue]) -> Result<Vec<E>, BoxError> + Send + Sync + 'static,
    {
        let entity_type = EntityType::of::<E>();
        self.loaders.insert(
            entity_type,
            EntityLoader {
                entity_type,
                argument_type: None,
                load: Arc::new(move |_, ids| {
                    Ok(loader(ids)?
                        .into_iter()
                        .map(|entity| Arc::new(entity) as EntityRef)
                        .collect())
                }),
            },
        );
        self
    }

    /// Register a bulk loader for `E` that requires an argument of type
    /// `P` from the query's argument list.
    pub fn with_loader_expecting<P, E, F>(mut self, loader: F) -> Self
    where
        P: Send + Sync + 'static,
        E: Send + Sync + 'static,
        F: Fn(&P, &[KeyValue]) -> Result<Vec<E>, BoxError> + Send + Sync + 'static,
    {
        let entity_type = EntityType::of::<E>();
        self.loaders.insert(
            entity_type,
            EntityLoader {
                entity_type,
                argument_type: Some(EntityType::of::<P>()),
                load: Arc::new(move |arg, ids| {
                    let arg = arg
                        .and_then(|a| a.downcast_ref::<P>())
                        .ok_or("loader argument type mismatch")?;
                    Ok(loader(arg, ids)?
                        .into_iter()
                        .map(|entity| Arc::new(entity) as EntityRef)
                        .collect())
                }),
            },
        );
        self
    }

    /// The loader registered for a type, if any.
    pub fn loader(&self, entity_type: EntityType) -> Option<&EntityLoader> {
        self.loaders.get(&entity_type)
    }

    /// Load entities of the given type with the given ids.
    ///
    /// Resolves the loader and its argument, invokes it, and wraps any
    /// loader fault in [`Error::LoaderFailed`] carrying the entity type
    /// and a bounded sample of the requested ids. A loader returning fewer
    /// entities than ids requested is not an error.
    pub fn load(
        &self,
        entity_type: EntityType,
        args: &QueryArgs,
        ids: &[KeyValue],
        collector: Option<&DebugCollector>,
    ) -> Result<Vec<EntityRef>, Error> {
        let loader = self
            .loaders
            .get(&entity_type)
            .ok_or(Error::UnconfiguredLoader {
                entity: entity_type.name(),
            })?;

        let argument = match loader.argument_type {
            Some(required) => Some(args.find_erased(required.id()).ok_or(
                Error::MissingLoaderArgument {
                    entity: entity_type.name(),
                    argument: required.name(),
                },
            )?),
            None => None,
        };

        let started = Instant::now();
        let result = (loader.load)(argument, ids);
        let elapsed = started.elapsed();

        match result {
            Ok(entities) => {
                debug!(
                    entity = %entity_type,
                    requested = ids.len(),
                    loaded = entities.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "loader invoked"
                );
                if let Some(collector) = collector {
                    collector.record_loader_call(LoaderCall {
                        entity_type,
                        requested_ids: ids.len(),
                        loaded: entities.len(),
                        elapsed,
                    });
                }
                Ok(entities)
            }
            Err(source) => Err(Error::LoaderFailed {
                entity: entity_type.name(),
                id_sample: id_sample(ids),
                source,
            }),
        }
    }
}

/// Format the first 5 ids for diagnostics.
fn id_sample(ids: &[KeyValue]) -> String {
    let mut sample = ids
        .iter()
        .take(5)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if ids.len() > 5 {
        sample.push_str(", ...");
    }
    sample
}
