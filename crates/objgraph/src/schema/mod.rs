//! Schema model: entity descriptors, keys, foreign keys, and the type graph.

mod descriptor;
mod foreign_key;
mod graph;
mod key;
mod node;
mod schema;
mod types;

pub use descriptor::EntityDescriptor;
pub use foreign_key::ForeignKey;
pub use graph::TypeGraph;
pub use key::Key;
pub use node::{Node, Visit};
pub use schema::Schema;
pub use types::{EntityRef, EntityType, Ids, KeyValue};
