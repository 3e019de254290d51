//! Per-request execution state and the operation interpreter.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tracing::{debug, trace};

use super::parallel;
use crate::debug::DebugCollector;
use crate::engine::EngineShared;
use crate::error::Error;
use crate::object_graph::ObjectGraph;
use crate::plan::Operation;
use crate::query::{Query, QueryArgs};
use crate::schema::{EntityRef, EntityType, KeyValue};

/// Bookkeeping for the ids that still need to be loaded and the ids that
/// have already been requested, per entity type.
///
/// Ids that were requested but not returned by a loader stay in the loaded
/// set so they are never re-requested within the same execution.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingKeys {
    inner: Arc<PendingInner>,
}

#[derive(Debug, Default)]
struct PendingInner {
    to_load: DashMap<EntityType, DashSet<KeyValue>>,
    loaded: DashMap<EntityType, DashSet<KeyValue>>,
}

impl PendingKeys {
    fn add(&self, entity_type: EntityType, id: KeyValue) {
        if let Some(loaded) = self.inner.loaded.get(&entity_type) {
            if loaded.contains(&id) {
                return;
            }
        }
        self.inner
            .to_load
            .entry(entity_type)
            .or_default()
            .insert(id);
    }

    fn take(&self, entity_type: EntityType) -> Vec<KeyValue> {
        self.inner
            .to_load
            .remove(&entity_type)
            .map(|(_, ids)| ids.into_iter().collect())
            .unwrap_or_default()
    }

    fn mark_loaded(&self, entity_type: EntityType, ids: &[KeyValue]) {
        let loaded = self.inner.loaded.entry(entity_type).or_default();
        for id in ids {
            loaded.insert(id.clone());
        }
    }
}

/// Everything a plan operation needs, cloneable into parallel workers.
#[derive(Clone)]
pub(crate) struct RequestState {
    pub(crate) shared: Arc<EngineShared>,
    pub(crate) graph: ObjectGraph,
    pending: PendingKeys,
    args: Arc<QueryArgs>,
    debug: Option<DebugCollector>,
}

impl RequestState {
    pub(crate) fn execute_operation(&self, operation: &Operation) -> Result<(), Error> {
        match operation {
            Operation::GatherForeignKeysTo(entity_type) => self.gather(*entity_type),
            Operation::LoadEntities(entity_type) => self.load(*entity_type),
            Operation::Parallel(operations) => parallel::run_group(self, operations),
        }
    }

    /// Scan known entities for ids referencing `target` that are not yet
    /// present in the graph, and add them to the pending set.
    pub(crate) fn gather(&self, target: EntityType) -> Result<(), Error> {
        let mut gathered = 0usize;
        for fk in self.shared.schema.describe_foreign_keys_to(target) {
            if !fk.should_follow(&self.args) {
                continue;
            }
            for entity in self.graph.get_all(fk.from_type()) {
                for id in fk.read(entity.as_ref()) {
                    if self.graph.has(target, &id) {
                        continue;
                    }
                    self.pending.add(target, id);
                    gathered += 1;
                }
            }
        }
        trace!(entity = %target, gathered, "gathered foreign keys");
        Ok(())
    }

    /// Load the pending ids for `target` and merge the results into the
    /// graph. A no-op when nothing is pending.
    pub(crate) fn load(&self, target: EntityType) -> Result<(), Error> {
        let ids = self.pending.take(target);
        if ids.is_empty() {
            return Ok(());
        }

        let entities =
            self.shared
                .loaders
                .load(target, &self.args, &ids, self.debug.as_ref())?;

        let descriptor = self.shared.schema.entity_descriptor(target).ok_or(
            Error::UnknownEntityDescriptor {
                entity: target.name(),
            },
        )?;
        let pk = descriptor
            .primary_key()
            .ok_or(Error::MissingPrimaryKey {
                entity: target.name(),
            })?;

        for entity in entities {
            let id = pk
                .read_one(entity.as_ref())
                .ok_or(Error::PrimaryKeyNull {
                    entity: target.name(),
                })?;
            self.graph.merge_result(target, id, entity);
        }
        self.pending.mark_loaded(target, &ids);
        Ok(())
    }
}

/// An execution context is created for every [`Query`] that is executed.
/// It coordinates the plan, the loaders, and the object graph for one
/// request and is discarded afterwards.
pub struct ExecutionContext {
    state: RequestState,
    entity_types: BTreeSet<EntityType>,
    root_objects: Vec<(EntityType, EntityRef)>,
    executed: bool,
}

impl ExecutionContext {
    pub(crate) fn new(shared: Arc<EngineShared>, query: Query) -> Self {
        let (entity_types, root_objects, args, existing_graph, debug) = query.into_parts();
        let graph = existing_graph.unwrap_or_else(|| ObjectGraph::new(&shared.schema));
        Self {
            state: RequestState {
                shared,
                graph,
                pending: PendingKeys::default(),
                args: Arc::new(args),
                debug,
            },
            entity_types,
            root_objects,
            executed: false,
        }
    }

    /// Execute the query and return the resulting object graph.
    ///
    /// A second call on the same context is a no-op returning the
    /// already-computed graph.
    pub fn execute(&mut self) -> Result<ObjectGraph, Error> {
        if self.executed {
            return Ok(self.state.graph.clone());
        }

        self.seed_roots()?;

        let plan = self
            .state
            .shared
            .plans
            .plan_for(&self.state.shared.schema, self.entity_types.clone())?;
        if let Some(collector) = &self.state.debug {
            collector.record_plan(plan.clone());
        }

        debug!(
            roots = self.root_objects.len(),
            operations = plan.operations().len(),
            "executing query"
        );
        for operation in plan.operations() {
            self.state.execute_operation(operation)?;
        }

        if let Some(collector) = &self.state.debug {
            collector.record_object_graph(self.state.graph.clone());
        }
        self.executed = true;
        Ok(self.state.graph.clone())
    }

    /// Seed the object graph with the query's root objects, keyed by their
    /// runtime types' primary keys.
    fn seed_roots(&self) -> Result<(), Error> {
        for (entity_type, root) in &self.root_objects {
            let descriptor = self.state.shared.schema.entity_descriptor(*entity_type).ok_or(
                Error::UnknownEntityDescriptor {
                    entity: entity_type.name(),
                },
            )?;
            let pk = descriptor
                .primary_key()
                .ok_or(Error::MissingPrimaryKey {
                    entity: entity_type.name(),
                })?;
            let id = pk
                .read_one(root.as_ref())
                .ok_or(Error::PrimaryKeyNull {
                    entity: entity_type.name(),
                })?;
            self.state
                .graph
                .merge_result(*entity_type, id, root.clone());
        }
        Ok(())
    }
}
