//! Foreign-key edges between entity types.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::key::Key;
use super::types::{EntityType, Ids};
use crate::query::QueryArgs;

type GatePredicate = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> bool + Send + Sync>;

/// A predicate gate attached to a conditional foreign key.
#[derive(Clone)]
struct ArgumentGate {
    argument_type: EntityType,
    predicate: GatePredicate,
}

/// A directional reference from one entity type to another, read via an
/// accessor and optionally gated by a predicate over query arguments.
///
/// Equality and hashing are defined by `(from, to, argument type)`: foreign
/// keys between the same two types gated by different argument types are
/// distinct edges, while the accessor itself carries no identity.
#[derive(Clone)]
pub struct ForeignKey {
    from: EntityType,
    to: EntityType,
    key: Key,
    gate: Option<ArgumentGate>,
}

impl ForeignKey {
    /// An unconditional foreign key.
    pub fn new(from: EntityType, to: EntityType, key: Key) -> Self {
        Self {
            from,
            to,
            key,
            gate: None,
        }
    }

    /// A foreign key followed only when the query supplies an argument of
    /// type `A` satisfying the predicate.
    pub fn conditional<A, P>(from: EntityType, to: EntityType, key: Key, predicate: P) -> Self
    where
        A: Send + Sync + 'static,
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        Self {
            from,
            to,
            key,
            gate: Some(ArgumentGate {
                argument_type: EntityType::of::<A>(),
                predicate: Arc::new(move |arg| {
                    arg.downcast_ref::<A>().is_some_and(&predicate)
                }),
            }),
        }
    }

    /// The referencing entity type.
    pub fn from_type(&self) -> EntityType {
        self.from
    }

    /// The referenced entity type.
    pub fn to_type(&self) -> EntityType {
        self.to
    }

    /// The accessor reading the foreign id(s).
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The gating argument type, if this key is conditional.
    pub fn argument_type(&self) -> Option<EntityType> {
        self.gate.as_ref().map(|g| g.argument_type)
    }

    /// Whether this foreign key should be followed for the given arguments.
    ///
    /// Unconditional keys are always followed; conditional keys require at
    /// least one supplied argument of the gating type for which the
    /// predicate holds.
    pub fn should_follow(&self, args: &QueryArgs) -> bool {
        match &self.gate {
            None => true,
            Some(gate) => args.iter().any(|arg| (gate.predicate)(arg)),
        }
    }

    /// Read the foreign id(s) off a referencing instance.
    pub fn read(&self, obj: &(dyn Any + Send + Sync)) -> Ids {
        self.key.read(obj)
    }
}

impl PartialEq for ForeignKey {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from
            && self.to == other.to
            && self.argument_type() == other.argument_type()
    }
}

impl Eq for ForeignKey {}

impl Hash for ForeignKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.from.hash(state);
        self.to.hash(state);
        self.argument_type().hash(state);
    }
}

impl fmt::Debug for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignKey")
            .field("from", &self.from.name())
            .field("to", &self.to.name())
            .field("argument_type", &self.argument_type().map(|t| t.name()))
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)?;
        if let Some(arg) = self.argument_type() {
            write!(f, " (arg: {arg})")?;
        }
        Ok(())
    }
}
