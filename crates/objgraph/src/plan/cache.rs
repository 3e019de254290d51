//! Process-wide cache of computed execution plans.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;

use super::plan::ExecutionPlan;
use super::planner::ExecutionPlanner;
use crate::error::Error;
use crate::schema::{EntityType, Schema};

/// Caches plans keyed by the exact set of starting entity types.
///
/// Plans are immutable once constructed; insertion uses insert-if-absent
/// semantics, so a cache hit always returns the identical plan.
#[derive(Debug, Default)]
pub struct PlanCache {
    plans: DashMap<BTreeSet<EntityType>, Arc<ExecutionPlan>>,
}

impl PlanCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached plan for the starting set, computing and inserting it on
    /// a miss.
    pub fn plan_for(
        &self,
        schema: &Schema,
        start_types: BTreeSet<EntityType>,
    ) -> Result<Arc<ExecutionPlan>, Error> {
        if let Some(plan) = self.plans.get(&start_types) {
            return Ok(plan.clone());
        }
        let plan = Arc::new(ExecutionPlanner::new(schema).plan(&start_types)?);
        Ok(self
            .plans
            .entry(start_types)
            .or_insert(plan)
            .value()
            .clone())
    }

    /// Number of cached plans.
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Drop all cached plans.
    pub fn clear(&self) {
        self.plans.clear();
    }
}
