//! Execution plan operations.

use std::fmt;

use crate::schema::EntityType;

/// One step of an execution plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Scan currently-known entities for ids referencing the type that are
    /// not yet present in the object graph.
    GatherForeignKeysTo(EntityType),
    /// Invoke the loader for the type with the gathered, deduplicated ids.
    LoadEntities(EntityType),
    /// Gather/load pairs for types with no ordering dependency on one
    /// another; may be executed concurrently.
    Parallel(Vec<Operation>),
}

impl Operation {
    /// Estimated cost of the operation.
    pub fn cost(&self) -> f64 {
        match self {
            Self::GatherForeignKeysTo(_) => 0.1,
            Self::LoadEntities(_) => 1.0,
            Self::Parallel(ops) => {
                ops.iter().map(Operation::cost).sum::<f64>() + ops.len() as f64 * 0.1
            }
        }
    }

    /// Human-readable form of the operation.
    pub fn explain(&self) -> String {
        match self {
            Self::GatherForeignKeysTo(entity) => {
                format!("gather foreign keys to {entity}")
            }
            Self::LoadEntities(entity) => {
                format!("({:.3}) load {entity}", self.cost())
            }
            Self::Parallel(ops) => {
                let mut out = format!("({:.3}) in parallel: [\n", self.cost());
                for op in ops {
                    out.push_str("    ");
                    out.push_str(&op.explain());
                    out.push('\n');
                }
                out.push_str("   ]");
                out
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.explain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Author;

    #[test]
    fn test_costs() {
        let gather = Operation::GatherForeignKeysTo(EntityType::of::<Author>());
        let load = Operation::LoadEntities(EntityType::of::<Author>());
        assert!(gather.cost() < load.cost());

        let group = Operation::Parallel(vec![gather.clone(), load.clone()]);
        assert!(group.cost() > gather.cost() + load.cost());
    }

    #[test]
    fn test_explain() {
        let gather = Operation::GatherForeignKeysTo(EntityType::of::<Author>());
        assert_eq!(gather.explain(), "gather foreign keys to Author");

        let load = Operation::LoadEntities(EntityType::of::<Author>());
        assert_eq!(load.explain(), "(1.000) load Author");
    }
}
