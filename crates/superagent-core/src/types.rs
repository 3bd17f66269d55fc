use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn short_hex() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Unique execution identifier (`exec_` + 8 hex chars).
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub String);

impl ExecutionId {
    pub fn new() -> Self {
        Self(format!("exec_{}", short_hex()))
    }

    pub fn from_str(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generate a fresh workflow id (`wf_` + 8 hex chars).
pub fn new_workflow_id() -> String {
    format!("wf_{}", short_hex())
}

/// Execution lifecycle state.
///
/// `Running` is the only non-terminal state the engine produces. `Pending`
/// exists for records written by callers before a run is scheduled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// Terminal outcome used by the workflow rollup counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failure,
}

impl RunOutcome {
    pub fn from_status(status: ExecutionStatus) -> Option<Self> {
        match status {
            ExecutionStatus::Completed => Some(Self::Success),
            ExecutionStatus::Failed => Some(Self::Failure),
            _ => None,
        }
    }
}

/// Agent catalog category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentCategory {
    DataRetrieval,
    Action,
    Analysis,
    Communication,
}

/// Static descriptor of an agent type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub agent_type: String,
    pub name: String,
    pub description: String,
    pub category: AgentCategory,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub supported_connectors: Vec<String>,
    /// JSON Schema (draft-07) for the agent's `config` object.
    #[serde(default = "empty_object_schema")]
    pub config_schema: serde_json::Value,
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object" })
}

/// Citation attached to an agent result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Outcome of one agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentExecutionResult {
    pub success: bool,
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentExecutionResult {
    pub fn success(output: serde_json::Value, tokens_used: u64, cost: f64) -> Self {
        Self {
            success: true,
            output,
            tokens_used,
            cost,
            latency_ms: 0,
            sources: vec![],
            error: None,
        }
    }

    /// Expected failure: zero metrics, populated error.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            tokens_used: 0,
            cost: 0.0,
            latency_ms: 0,
            sources: vec![],
            error: Some(error.into()),
        }
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }
}

/// Cross-cutting metadata handed to every agent invocation.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub execution_id: ExecutionId,
    pub workflow_id: String,
    pub agent_id: String,
    /// Tenant scope, opaque to the engine.
    pub org_id: Option<String>,
    pub cancel: CancellationToken,
}

/// Engine event broadcast to all subscribers.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    ExecutionStarted {
        execution_id: ExecutionId,
        workflow_id: String,
        workflow_name: String,
        /// Agent names in run order.
        order: Vec<String>,
    },
    AgentStarted {
        execution_id: ExecutionId,
        agent_id: String,
        agent_name: String,
        agent_type: String,
    },
    AgentCompleted {
        execution_id: ExecutionId,
        agent_id: String,
        tokens_used: u64,
        cost: f64,
        latency_ms: u64,
    },
    AgentFailed {
        execution_id: ExecutionId,
        agent_id: String,
        error: String,
    },
    ExecutionCompleted {
        execution_id: ExecutionId,
        tokens_used: u64,
        cost: f64,
        duration_seconds: f64,
    },
    ExecutionFailed {
        execution_id: ExecutionId,
        error: String,
    },
}

impl EngineEvent {
    pub fn execution_id(&self) -> &ExecutionId {
        match self {
            Self::ExecutionStarted { execution_id, .. }
            | Self::AgentStarted { execution_id, .. }
            | Self::AgentCompleted { execution_id, .. }
            | Self::AgentFailed { execution_id, .. }
            | Self::ExecutionCompleted { execution_id, .. }
            | Self::ExecutionFailed { execution_id, .. } => execution_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_id_format() {
        let id = ExecutionId::new();
        assert!(id.as_str().starts_with("exec_"));
        assert_eq!(id.as_str().len(), 13);
        assert!(new_workflow_id().starts_with("wf_"));
    }

    #[test]
    fn test_status_roundtrip_and_terminal() {
        for status in [
            ExecutionStatus::Pending,
            ExecutionStatus::Running,
            ExecutionStatus::Completed,
            ExecutionStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<ExecutionStatus>().unwrap(), status);
        }
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!("CANCELLED".parse::<ExecutionStatus>().is_err());
    }

    #[test]
    fn test_failure_has_zero_metrics() {
        let r = AgentExecutionResult::failure("connector down");
        assert!(!r.success);
        assert_eq!(r.tokens_used, 0);
        assert_eq!(r.cost, 0.0);
        assert_eq!(r.error.as_deref(), Some("connector down"));
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&AgentCategory::DataRetrieval).unwrap();
        assert_eq!(json, "\"data_retrieval\"");
    }
}
