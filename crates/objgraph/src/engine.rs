//! The engine: the embeddable facade tying schema, loaders, plans, and
//! execution together.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::execute::ExecutionContext;
use crate::loader::LoaderRegistry;
use crate::object_graph::ObjectGraph;
use crate::plan::{ExecutionPlan, PlanCache};
use crate::query::{Query, QueryArgs};
use crate::schema::{EntityType, KeyValue, Schema};

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum worker threads for one parallel plan group.
    pub parallelism: usize,
    /// Join deadline for a parallel plan group.
    pub parallel_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallelism: 8,
            parallel_timeout: Duration::from_secs(30),
        }
    }
}

/// State shared by the engine and every request it executes.
pub(crate) struct EngineShared {
    pub(crate) schema: Schema,
    pub(crate) loaders: LoaderRegistry,
    pub(crate) plans: PlanCache,
    pub(crate) config: EngineConfig,
}

/// Resolves object graphs from root entities by batch-loading their
/// declared relationships, one loader call per entity type per level.
///
/// An engine is constructed once from a validated [`Schema`] and a
/// [`LoaderRegistry`] and shared across requests; execution plans are
/// cached process-wide per distinct starting-type set.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<EngineShared>,
}

impl Engine {
    /// An engine with default configuration.
    ///
    /// Fails with [`Error::SchemaNotValidated`] unless the schema has been
    /// validated.
    pub fn new(schema: Schema, loaders: LoaderRegistry) -> Result<Self, Error> {
        Self::with_config(schema, loaders, EngineConfig::default())
    }

    /// An engine with the given configuration.
    pub fn with_config(
        schema: Schema,
        loaders: LoaderRegistry,
        config: EngineConfig,
    ) -> Result<Self, Error> {
        if !schema.is_validated() {
            return Err(Error::SchemaNotValidated);
        }
        Ok(Self {
            shared: Arc::new(EngineShared {
                schema,
                loaders,
                plans: PlanCache::new(),
                config,
            }),
        })
    }

    /// The schema this engine resolves against.
    pub fn schema(&self) -> &Schema {
        &self.shared.schema
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// An empty object graph resolving aliases per this engine's schema.
    pub fn create_empty_graph(&self) -> ObjectGraph {
        ObjectGraph::new(&self.shared.schema)
    }

    /// The cached (or freshly computed) plan for the starting types.
    pub fn plan_for(&self, start_types: &[EntityType]) -> Result<Arc<ExecutionPlan>, Error> {
        let start_types: BTreeSet<EntityType> = start_types.iter().copied().collect();
        self.shared.plans.plan_for(&self.shared.schema, start_types)
    }

    /// Human-readable plan for the starting types.
    pub fn explain(&self, start_types: &[EntityType]) -> Result<String, Error> {
        Ok(self.plan_for(start_types)?.explain())
    }

    /// A fresh execution context for the query.
    pub fn execution_context(&self, query: Query) -> ExecutionContext {
        ExecutionContext::new(self.shared.clone(), query)
    }

    /// Execute a query and return the resulting object graph.
    pub fn execute(&self, query: Query) -> Result<ObjectGraph, Error> {
        self.execution_context(query).execute()
    }

    /// Execute for a single root entity, deriving the starting type from
    /// `T`.
    pub fn execute_for_root<T: Send + Sync + 'static>(&self, root: T) -> Result<ObjectGraph, Error> {
        self.execute(Query::new().with_root_entity(root))
    }

    /// Execute for several root entities of one type.
    pub fn execute_for_roots<T: Send + Sync + 'static>(
        &self,
        roots: impl IntoIterator<Item = T>,
    ) -> Result<ObjectGraph, Error> {
        self.execute(Query::new().with_root_entities(roots))
    }

    /// Load entities of type `T` directly through the registered loader,
    /// outside of any query.
    pub fn load<T: Send + Sync + 'static>(
        &self,
        ids: impl IntoIterator<Item = impl Into<KeyValue>>,
    ) -> Result<Vec<Arc<T>>, Error> {
        let ids: Vec<KeyValue> = ids.into_iter().map(Into::into).collect();
        let entities =
            self.shared
                .loaders
                .load(EntityType::of::<T>(), &QueryArgs::default(), &ids, None)?;
        Ok(entities
            .into_iter()
            .filter_map(|entity| entity.downcast::<T>().ok())
            .collect())
    }

    /// Load specific ids of one type into an existing graph, following
    /// their relationships, without a root-object seed. Returns the graph
    /// unchanged when the loader finds none of the ids.
    pub fn supplement<T: Send + Sync + 'static>(
        &self,
        graph: ObjectGraph,
        ids: impl IntoIterator<Item = impl Into<KeyValue>>,
    ) -> Result<ObjectGraph, Error> {
        let ids: Vec<KeyValue> = ids.into_iter().map(Into::into).collect();
        let entities =
            self.shared
                .loaders
                .load(EntityType::of::<T>(), &QueryArgs::default(), &ids, None)?;
        if entities.is_empty() {
            return Ok(graph);
        }
        self.execute(
            Query::new()
                .with_root_refs(EntityType::of::<T>(), entities)
                .with_existing_graph(graph),
        )
    }
}
