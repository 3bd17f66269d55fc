use std::sync::Arc;

use superagent_agents::AgentRegistry;
use superagent_core::traits::{ExecutionStore, WorkflowStore};
use superagent_engine::ExecutionService;

/// Shared application state for axum handlers.
pub struct AppState {
    pub registry: Arc<AgentRegistry>,
    pub service: ExecutionService,
    pub workflows: Arc<dyn WorkflowStore>,
    pub executions: Arc<dyn ExecutionStore>,
}
