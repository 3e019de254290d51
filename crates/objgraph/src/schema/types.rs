//! Entity type tokens and opaque key values.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Shared handle to a type-erased entity instance.
pub type EntityRef = Arc<dyn Any + Send + Sync>;

/// A token identifying a Rust type participating in a schema: an entity
/// type, a graph-key alias, or a loader/predicate argument type.
///
/// Equality and hashing use the underlying [`TypeId`]; ordering uses the
/// type name (with the id as tiebreak) so that schema walks and topological
/// sorts are deterministic for a given set of types.
#[derive(Debug, Clone, Copy)]
pub struct EntityType {
    id: TypeId,
    name: &'static str,
}

impl EntityType {
    /// The token for `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying type id.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The fully-qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type name without its module path.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityType {}

impl Hash for EntityType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for EntityType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntityType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(other.name)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// An opaque, immutable, hashable key value: a primary key, a foreign id,
/// or a composite of several parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    /// Signed integer id.
    Int(i64),
    /// Unsigned integer id.
    UInt(u64),
    /// String id.
    Str(String),
    /// Raw byte id.
    Bytes(Vec<u8>),
    /// Ordered tuple of parts; equal iff all parts are equal.
    Composite(Vec<KeyValue>),
}

impl KeyValue {
    /// Combine parts into a composite key value.
    pub fn composite(parts: impl IntoIterator<Item = KeyValue>) -> Self {
        Self::Composite(parts.into_iter().collect())
    }
}

impl From<i32> for KeyValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for KeyValue {
    fn from(v: u32) -> Self {
        Self::UInt(v.into())
    }
}

impl From<u64> for KeyValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for KeyValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<u8>> for KeyValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
            Self::Bytes(v) => {
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::Composite(parts) => {
                write!(f, "(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{part}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// The result of one accessor read: no value, a single id, or several ids
/// (to-many relations).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ids {
    /// The property read as absent.
    None,
    /// A single id.
    One(KeyValue),
    /// Multiple ids.
    Many(Vec<KeyValue>),
}

impl Ids {
    /// Whether the read produced no ids.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::One(_) => false,
            Self::Many(ids) => ids.is_empty(),
        }
    }

    /// The single id, if the read produced exactly one.
    pub fn into_one(self) -> Option<KeyValue> {
        match self {
            Self::One(id) => Some(id),
            _ => None,
        }
    }
}

impl IntoIterator for Ids {
    type Item = KeyValue;
    type IntoIter = std::vec::IntoIter<KeyValue>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            Self::None => Vec::new().into_iter(),
            Self::One(id) => vec![id].into_iter(),
            Self::Many(ids) => ids.into_iter(),
        }
    }
}
