//! The execution planner.
//!
//! Converts a set of starting entity types into an [`ExecutionPlan`]: the
//! reachable type graph is topologically sorted, then scanned left to right
//! into batches of types with no dependency on one another. Each batch is
//! one round-trip level; all types within it may be gathered and loaded
//! without further gathering in between.

use std::collections::BTreeSet;

use tracing::debug;

use super::operation::Operation;
use super::plan::ExecutionPlan;
use crate::error::Error;
use crate::schema::{EntityType, Schema};

/// Plans entity loading for a validated schema.
pub struct ExecutionPlanner<'a> {
    schema: &'a Schema,
}

impl<'a> ExecutionPlanner<'a> {
    /// A planner over the given schema.
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Compute the plan for the given starting entity types.
    pub fn plan(&self, start_types: &BTreeSet<EntityType>) -> Result<ExecutionPlan, Error> {
        let starts: Vec<EntityType> = start_types.iter().copied().collect();
        let graph = self.schema.graph(&starts)?;
        let order = graph.topo_sort()?;

        let mut operations = Vec::new();
        let mut batch: Vec<EntityType> = Vec::new();
        for entity_type in order {
            // A batch boundary is needed once the type depends on anything
            // placed in the current batch.
            if batch.iter().any(|&b| graph.has_edge(b, entity_type)) {
                Self::flush_batch(&mut operations, &mut batch);
            }
            batch.push(entity_type);
        }
        Self::flush_batch(&mut operations, &mut batch);

        let plan = ExecutionPlan::new(start_types.clone(), operations);
        debug!(
            start_types = %starts.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
            operations = plan.operations().len(),
            "computed execution plan"
        );
        Ok(plan)
    }

    fn flush_batch(operations: &mut Vec<Operation>, batch: &mut Vec<EntityType>) {
        match batch.len() {
            0 => {}
            1 => {
                let entity_type = batch[0];
                operations.push(Operation::GatherForeignKeysTo(entity_type));
                operations.push(Operation::LoadEntities(entity_type));
            }
            _ => {
                let mut group = Vec::with_capacity(batch.len() * 2);
                for &entity_type in batch.iter() {
                    group.push(Operation::GatherForeignKeysTo(entity_type));
                    group.push(Operation::LoadEntities(entity_type));
                }
                operations.push(Operation::Parallel(group));
            }
        }
        batch.clear();
    }
}
