use futures::future::BoxFuture;

use crate::error::Result;
use crate::execution::{ExecutionFilter, ExecutionLogEntry, ExecutionRecord, LogFilter};
use crate::types::*;
use crate::workflow::{WorkflowGraph, WorkflowStats};

/// One step of a workflow.
pub trait Agent: Send + Sync + 'static {
    /// Registry key this implementation is bound to.
    fn agent_type(&self) -> &str;

    /// Run the agent against the threaded input.
    ///
    /// Expected failures are returned as `Ok` with `success = false`.
    /// `Err` is reserved for faults; the engine reports those generically.
    fn execute(
        &self,
        input: serde_json::Value,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<AgentExecutionResult>>;
}

/// Persistence of workflow graphs and their rollup counters.
pub trait WorkflowStore: Send + Sync + 'static {
    /// Insert or replace a workflow. Rollup counters of an existing row are kept.
    fn save_workflow(&self, workflow: &WorkflowGraph) -> BoxFuture<'_, Result<()>>;

    fn get_workflow(&self, id: &str) -> BoxFuture<'_, Result<Option<WorkflowGraph>>>;

    fn list_workflows(&self, org_id: Option<&str>) -> BoxFuture<'_, Result<Vec<WorkflowGraph>>>;

    /// Delete a workflow with its executions and logs. Returns false if absent.
    fn delete_workflow(&self, id: &str) -> BoxFuture<'_, Result<bool>>;

    fn workflow_stats(&self, id: &str) -> BoxFuture<'_, Result<Option<WorkflowStats>>>;

    /// Bump `execution_count` and one of `success_count` / `failure_count`.
    fn increment_workflow_stats(
        &self,
        workflow_id: &str,
        outcome: RunOutcome,
    ) -> BoxFuture<'_, Result<()>>;
}

/// Persistence of execution records and their logs.
pub trait ExecutionStore: Send + Sync + 'static {
    fn create_execution(&self, record: &ExecutionRecord) -> BoxFuture<'_, Result<()>>;

    /// Write a terminal record and roll it up into its workflow, atomically.
    ///
    /// Keyed by execution id: returns `false` without touching the counters
    /// when the stored record is already terminal.
    fn update_execution(&self, record: &ExecutionRecord) -> BoxFuture<'_, Result<bool>>;

    fn get_execution(&self, id: &ExecutionId) -> BoxFuture<'_, Result<Option<ExecutionRecord>>>;

    /// Newest first.
    fn list_executions(
        &self,
        filter: &ExecutionFilter,
    ) -> BoxFuture<'_, Result<Vec<ExecutionRecord>>>;

    fn delete_execution(&self, id: &ExecutionId) -> BoxFuture<'_, Result<bool>>;

    fn append_logs(&self, entries: &[ExecutionLogEntry]) -> BoxFuture<'_, Result<()>>;

    /// Chronological.
    fn load_logs(
        &self,
        id: &ExecutionId,
        filter: &LogFilter,
    ) -> BoxFuture<'_, Result<Vec<ExecutionLogEntry>>>;
}
