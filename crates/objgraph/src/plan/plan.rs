//! Execution plans.

use std::collections::BTreeSet;
use std::fmt;

use super::operation::Operation;
use crate::schema::EntityType;

/// An ordered, immutable-once-built sequence of operations computed for a
/// set of starting entity types.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    start_types: BTreeSet<EntityType>,
    operations: Vec<Operation>,
}

impl ExecutionPlan {
    pub(crate) fn new(start_types: BTreeSet<EntityType>, operations: Vec<Operation>) -> Self {
        Self {
            start_types,
            operations,
        }
    }

    /// The starting entity types this plan was computed for.
    pub fn start_types(&self) -> &BTreeSet<EntityType> {
        &self.start_types
    }

    /// The operations, in execution order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Total estimated cost of the plan.
    pub fn cost(&self) -> f64 {
        self.operations.iter().map(Operation::cost).sum()
    }

    /// Human-readable form of the plan.
    pub fn explain(&self) -> String {
        let mut out = format!("({:.3}) execution plan:\n", self.cost());
        for start in &self.start_types {
            out.push_str(" * ");
            out.push_str(start.name());
            out.push('\n');
        }
        for op in &self.operations {
            out.push_str(" - ");
            out.push_str(&op.explain());
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.explain())
    }
}
