//! Optional per-request debug capture.
//!
//! A [`DebugCollector`] is an explicit observer attached to a query for the
//! duration of one request. When installed it receives every computed
//! execution plan, every resulting object graph, and one record per loader
//! invocation; when absent there is no overhead and no global state.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::object_graph::ObjectGraph;
use crate::plan::ExecutionPlan;
use crate::schema::EntityType;

/// One loader invocation.
#[derive(Debug, Clone)]
pub struct LoaderCall {
    /// The loaded entity type.
    pub entity_type: EntityType,
    /// Number of ids requested.
    pub requested_ids: usize,
    /// Number of entities the loader returned.
    pub loaded: usize,
    /// Wall-clock time spent in the loader.
    pub elapsed: Duration,
}

/// Everything captured during the requests a collector was attached to.
#[derive(Debug, Clone, Default)]
pub struct DebugInfo {
    /// Execution plans, in the order they were resolved.
    pub plans: Vec<Arc<ExecutionPlan>>,
    /// Result object graphs, one per completed execution.
    pub object_graphs: Vec<ObjectGraph>,
    /// Loader invocation records.
    pub loader_calls: Vec<LoaderCall>,
}

/// A cloneable handle collecting debug information for one or more
/// requests. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct DebugCollector {
    inner: Arc<Mutex<DebugInfo>>,
}

impl DebugCollector {
    /// An empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_plan(&self, plan: Arc<ExecutionPlan>) {
        self.inner.lock().plans.push(plan);
    }

    pub(crate) fn record_object_graph(&self, graph: ObjectGraph) {
        self.inner.lock().object_graphs.push(graph);
    }

    pub(crate) fn record_loader_call(&self, call: LoaderCall) {
        self.inner.lock().loader_calls.push(call);
    }

    /// A snapshot of everything collected so far.
    pub fn snapshot(&self) -> DebugInfo {
        self.inner.lock().clone()
    }

    /// Take everything collected so far, leaving the collector empty.
    pub fn take(&self) -> DebugInfo {
        std::mem::take(&mut *self.inner.lock())
    }
}
