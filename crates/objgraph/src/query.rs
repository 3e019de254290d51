//! Queries: what to load and from which roots.

use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::debug::DebugCollector;
use crate::object_graph::ObjectGraph;
use crate::schema::{EntityRef, EntityType};

/// The ordered list of argument values supplied with a query.
///
/// Arguments are consulted by predicate-gated foreign keys and by loaders
/// registered as expecting an argument; matching is by argument type.
#[derive(Clone, Default)]
pub struct QueryArgs {
    args: Vec<EntityRef>,
}

impl std::fmt::Debug for QueryArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryArgs")
            .field("len", &self.args.len())
            .finish()
    }
}

impl QueryArgs {
    /// Append an argument value.
    pub fn push<A: Send + Sync + 'static>(&mut self, arg: A) {
        self.args.push(Arc::new(arg));
    }

    /// The first argument of type `A`, if any.
    pub fn find<A: Send + Sync + 'static>(&self) -> Option<&A> {
        self.args.iter().find_map(|arg| arg.downcast_ref::<A>())
    }

    /// The first argument matching the given type token, type-erased.
    pub fn find_erased(&self, type_id: std::any::TypeId) -> Option<&(dyn Any + Send + Sync)> {
        self.args
            .iter()
            .find(|arg| (***arg).type_id() == type_id)
            .map(AsRef::as_ref)
    }

    /// Iterate the arguments in the order they were supplied.
    pub fn iter(&self) -> impl Iterator<Item = &(dyn Any + Send + Sync)> {
        self.args.iter().map(AsRef::as_ref)
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether no arguments were supplied.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Defines which objects in a graph to load: one or more starting entity
/// types, the root objects to seed the graph with, optional arguments, and
/// optionally an existing graph to supplement.
#[derive(Default)]
pub struct Query {
    entity_types: BTreeSet<EntityType>,
    root_objects: Vec<(EntityType, EntityRef)>,
    arguments: QueryArgs,
    existing_graph: Option<ObjectGraph>,
    debug: Option<DebugCollector>,
}

impl Query {
    /// An empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `T` to the starting entity types.
    pub fn with_entity_type<T: 'static>(mut self) -> Self {
        self.entity_types.insert(EntityType::of::<T>());
        self
    }

    /// Add starting entity types.
    pub fn with_entity_types(mut self, types: impl IntoIterator<Item = EntityType>) -> Self {
        self.entity_types.extend(types);
        self
    }

    /// Add a root object without adding its type to the starting set.
    pub fn with_root_object<T: Send + Sync + 'static>(mut self, root: T) -> Self {
        self.root_objects
            .push((EntityType::of::<T>(), Arc::new(root)));
        self
    }

    /// Add root objects without adding their type to the starting set.
    pub fn with_root_objects<T: Send + Sync + 'static>(
        mut self,
        roots: impl IntoIterator<Item = T>,
    ) -> Self {
        for root in roots {
            self = self.with_root_object(root);
        }
        self
    }

    /// Add a root object and its type to the starting set.
    pub fn with_root_entity<T: Send + Sync + 'static>(self, root: T) -> Self {
        self.with_entity_type::<T>().with_root_object(root)
    }

    /// Add root objects and their type to the starting set.
    pub fn with_root_entities<T: Send + Sync + 'static>(
        self,
        roots: impl IntoIterator<Item = T>,
    ) -> Self {
        self.with_entity_type::<T>().with_root_objects(roots)
    }

    pub(crate) fn with_root_refs(
        mut self,
        entity_type: EntityType,
        roots: impl IntoIterator<Item = EntityRef>,
    ) -> Self {
        self.entity_types.insert(entity_type);
        self.root_objects
            .extend(roots.into_iter().map(|root| (entity_type, root)));
        self
    }

    /// Supply an argument consulted by gated foreign keys and
    /// argument-expecting loaders.
    pub fn with_argument<A: Send + Sync + 'static>(mut self, arg: A) -> Self {
        self.arguments.push(arg);
        self
    }

    /// Accumulate results into an existing graph instead of a fresh one.
    pub fn with_existing_graph(mut self, graph: ObjectGraph) -> Self {
        self.existing_graph = Some(graph);
        self
    }

    /// Attach a debug collector for the duration of this query.
    pub fn with_debug_collector(mut self, collector: &DebugCollector) -> Self {
        self.debug = Some(collector.clone());
        self
    }

    /// The starting entity types.
    pub fn entity_types(&self) -> &BTreeSet<EntityType> {
        &self.entity_types
    }

    /// The root objects with their runtime types.
    pub fn root_objects(&self) -> &[(EntityType, EntityRef)] {
        &self.root_objects
    }

    /// The supplied arguments.
    pub fn arguments(&self) -> &QueryArgs {
        &self.arguments
    }

    /// Whether an existing graph was attached.
    pub fn has_existing_graph(&self) -> bool {
        self.existing_graph.is_some()
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        BTreeSet<EntityType>,
        Vec<(EntityType, EntityRef)>,
        QueryArgs,
        Option<ObjectGraph>,
        Option<DebugCollector>,
    ) {
        (
            self.entity_types,
            self.root_objects,
            self.arguments,
            self.existing_graph,
            self.debug,
        )
    }
}
