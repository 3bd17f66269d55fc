//! Shared shape of the connector action agents (payments, HR writes).

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use superagent_core::types::AgentExecutionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Update,
    Delete,
    Send,
}

/// Acknowledge an action. Parameters are echoed back under `data`.
pub(crate) fn acknowledge(
    name: &str,
    action: ActionType,
    params: &Map<String, Value>,
) -> AgentExecutionResult {
    AgentExecutionResult::success(
        json!({
            "message": format!("{name} executed successfully"),
            "data": { "action_type": action, "params": params },
            "timestamp": Utc::now(),
        }),
        100,
        0.004,
    )
}
