//! Core error types.

use thiserror::Error;

/// A fault raised by a caller-supplied loader function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by schema construction, planning, and execution.
#[derive(Debug, Error)]
pub enum Error {
    /// A registered entity type has no primary key.
    #[error("{entity} is missing a primary key")]
    MissingPrimaryKey {
        /// Entity type name.
        entity: &'static str,
    },

    /// A foreign key references an entity type with no descriptor.
    #[error("foreign key {from} -> {to} references an unregistered entity type")]
    UnknownForeignKeyTarget {
        /// Referencing entity type name.
        from: &'static str,
        /// Referenced entity type name.
        to: &'static str,
    },

    /// An accessor registered on one entity type reads from another.
    #[error("accessor registered on {entity} reads from {found}")]
    AccessorTypeMismatch {
        /// Entity type the accessor was registered on.
        entity: &'static str,
        /// Type the accessor actually reads from.
        found: &'static str,
    },

    /// The schema's type graph contains a cycle that never terminates.
    #[error("circular type dependency detected at {entity}")]
    CircularDependency {
        /// Entity type at which the cycle was detected.
        entity: &'static str,
    },

    /// The schema was used before (or after a registration invalidated)
    /// a successful `validate()` call.
    #[error("schema has not been validated")]
    SchemaNotValidated,

    /// No entity descriptor is registered for a type.
    #[error("no entity descriptor registered for {entity}")]
    UnknownEntityDescriptor {
        /// Entity type name.
        entity: &'static str,
    },

    /// A required entity is absent from an object graph.
    #[error("entity of type {entity} with id {id} not found")]
    EntityNotFound {
        /// Entity type name.
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// An entity instance's primary key read as no value.
    #[error("primary key read as null for {entity}")]
    PrimaryKeyNull {
        /// Entity type name.
        entity: &'static str,
    },

    /// No loader is registered for an entity type the plan needs.
    #[error("no loader configured for entity type {entity}")]
    UnconfiguredLoader {
        /// Entity type name.
        entity: &'static str,
    },

    /// A loader requires an argument the query did not supply.
    #[error("loader for {entity} requires an argument of type {argument}")]
    MissingLoaderArgument {
        /// Entity type name.
        entity: &'static str,
        /// Required argument type name.
        argument: &'static str,
    },

    /// A loader raised a fault while loading a batch of ids.
    #[error("loader for {entity} failed (ids: {id_sample}): {source}")]
    LoaderFailed {
        /// Entity type name.
        entity: &'static str,
        /// Sample of the requested ids (first 5).
        id_sample: String,
        /// The underlying loader fault.
        #[source]
        source: BoxError,
    },

    /// A parallel load group did not complete before its join deadline.
    #[error("parallel load group timed out after {elapsed_ms}ms")]
    ParallelTimeout {
        /// Configured join deadline in milliseconds.
        elapsed_ms: u64,
    },

    /// A parallel load worker terminated without reporting a result.
    #[error("parallel load worker terminated abnormally")]
    ParallelWorkerLost,
}
