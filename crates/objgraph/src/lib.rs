//! objgraph - plan-driven object-graph resolution with batched loading.
//!
//! Consumers declare a schema of entity types, their primary keys, and the
//! foreign keys between them, and register one bulk loader per entity type.
//! The engine computes and caches an execution plan per starting-type set,
//! then gathers foreign-key ids level by level and loads each entity type
//! at most once per level, deduplicating ids already resolved - avoiding
//! per-object "N+1" loads against the backing stores.
//!
//! ```
//! use objgraph::{
//!     Engine, EntityDescriptor, Key, KeyValue, LoaderRegistry, Schema,
//! };
//!
//! #[derive(Clone)]
//! struct Book {
//!     id: String,
//!     author_id: String,
//! }
//! #[derive(Clone)]
//! struct Author {
//!     id: String,
//! }
//!
//! # fn main() -> Result<(), objgraph::Error> {
//! let mut schema = Schema::new()
//!     .with_entity(
//!         EntityDescriptor::of::<Book>()
//!             .with_primary_key(Key::new(|b: &Book| b.id.clone()))
//!             .with_foreign_key::<Author>(Key::new(|b: &Book| b.author_id.clone())),
//!     )
//!     .with_entity(
//!         EntityDescriptor::of::<Author>()
//!             .with_primary_key(Key::new(|a: &Author| a.id.clone())),
//!     );
//! schema.validate()?;
//!
//! let loaders = LoaderRegistry::new().with_loader(|ids: &[KeyValue]| {
//!     Ok(ids
//!         .iter()
//!         .map(|id| Author { id: id.to_string() })
//!         .collect())
//! });
//!
//! let engine = Engine::new(schema, loaders)?;
//! let graph = engine.execute_for_root(Book {
//!     id: "b1".into(),
//!     author_id: "a1".into(),
//! })?;
//!
//! assert!(graph.get_as::<Author>(&KeyValue::from("a1")).is_some());
//! # Ok(())
//! # }
//! ```

pub mod debug;
pub mod engine;
pub mod error;
pub mod execute;
pub mod loader;
pub mod object_graph;
pub mod plan;
pub mod query;
pub mod schema;

pub use debug::{DebugCollector, DebugInfo, LoaderCall};
pub use engine::{Engine, EngineConfig};
pub use error::{BoxError, Error};
pub use execute::ExecutionContext;
pub use loader::{EntityLoader, LoaderRegistry};
pub use object_graph::ObjectGraph;
pub use plan::{ExecutionPlan, ExecutionPlanner, Operation, PlanCache};
pub use query::{Query, QueryArgs};
pub use schema::{
    EntityDescriptor, EntityRef, EntityType, ForeignKey, Ids, Key, KeyValue, Node, Schema,
    TypeGraph, Visit,
};
