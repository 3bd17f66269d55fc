use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SuperAgentError};
use crate::types::{AgentExecutionResult, ExecutionId, ExecutionStatus};

/// Caller request to run a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub workflow_id: String,
    /// Free-form text or structured JSON.
    #[serde(default)]
    pub input: serde_json::Value,
}

impl ExecutionRequest {
    pub fn new(workflow_id: &str, input: serde_json::Value) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            input,
        }
    }

    /// Text stored on the record: strings verbatim, anything else as JSON.
    pub fn input_text(&self) -> String {
        match &self.input {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// One entry of `agent_results`: the agent's outcome plus what it was fed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRunRecord {
    pub agent_id: String,
    pub agent_name: String,
    pub agent_type: String,
    pub input: serde_json::Value,
    #[serde(flatten)]
    pub result: AgentExecutionResult,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// A single run of a workflow.
///
/// Created `running`, moved to a terminal status exactly once. Aggregate
/// metrics are accumulated as agent results are pushed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: ExecutionId,
    pub workflow_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    pub status: ExecutionStatus,
    pub input: String,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub agent_results: Vec<AgentRunRecord>,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    /// New record in `running` with `started_at` set now.
    pub fn start(workflow_id: &str, input: String, org_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ExecutionId::new(),
            workflow_id: workflow_id.to_string(),
            org_id,
            status: ExecutionStatus::Running,
            input,
            output: None,
            agent_results: vec![],
            tokens_used: 0,
            cost: 0.0,
            latency_ms: 0,
            duration_seconds: None,
            error: None,
            created_at: now,
            started_at: Some(now),
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append an agent result and fold its metrics into the totals.
    pub fn push_result(&mut self, run: AgentRunRecord) {
        self.tokens_used += run.result.tokens_used;
        self.cost += run.result.cost;
        self.latency_ms += run.result.latency_ms;
        self.agent_results.push(run);
    }

    pub fn result_for(&self, agent_id: &str) -> Option<&AgentRunRecord> {
        self.agent_results.iter().find(|r| r.agent_id == agent_id)
    }

    pub fn complete(&mut self, output: serde_json::Value) -> Result<()> {
        self.transition(ExecutionStatus::Completed)?;
        self.output = Some(output);
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.transition(ExecutionStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Bare `failed` copy to store when this record could not be written.
    ///
    /// Agent results and output are dropped, metrics reset to match.
    pub fn persistence_fallback(&self, error: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            output: None,
            agent_results: vec![],
            tokens_used: 0,
            cost: 0.0,
            latency_ms: 0,
            error: Some(error.into()),
            completed_at: self.completed_at.or_else(|| Some(Utc::now())),
            ..self.clone()
        }
    }

    fn transition(&mut self, to: ExecutionStatus) -> Result<()> {
        if self.is_terminal() || !to.is_terminal() {
            return Err(SuperAgentError::InvalidTransition {
                id: self.id.to_string(),
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        let now = Utc::now();
        let started = self.started_at.unwrap_or(self.created_at);
        let micros = (now - started).num_microseconds().unwrap_or(0).max(0);
        self.status = to;
        self.completed_at = Some(now);
        self.duration_seconds = Some(micros as f64 / 1_000_000.0);
        Ok(())
    }

    pub fn metrics(&self) -> ExecutionMetrics {
        ExecutionMetrics {
            execution_id: self.id.clone(),
            status: self.status,
            tokens_used: self.tokens_used,
            cost: self.cost,
            total_latency_ms: self.latency_ms,
            duration_seconds: self.duration_seconds,
            agents: self
                .agent_results
                .iter()
                .map(|r| AgentMetrics {
                    agent_id: r.agent_id.clone(),
                    agent_name: r.agent_name.clone(),
                    success: r.result.success,
                    tokens_used: r.result.tokens_used,
                    cost: r.result.cost,
                    latency_ms: r.result.latency_ms,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentMetrics {
    pub agent_id: String,
    pub agent_name: String,
    pub success: bool,
    pub tokens_used: u64,
    pub cost: f64,
    pub latency_ms: u64,
}

/// Metrics view served by `/executions/{id}/metrics`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionMetrics {
    pub execution_id: ExecutionId,
    pub status: ExecutionStatus,
    pub tokens_used: u64,
    pub cost: f64,
    pub total_latency_ms: u64,
    pub duration_seconds: Option<f64>,
    pub agents: Vec<AgentMetrics>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Persisted per-execution log line. `component` is "workflow" or an agent id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub execution_id: ExecutionId,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
}

/// Filters for listing executions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionFilter {
    #[serde(default)]
    pub workflow_id: Option<String>,
    /// Only executions started under this tenant
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub status: Option<ExecutionStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

/// Filters for reading execution logs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogFilter {
    #[serde(default)]
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub agent_id: Option<String>,
}

impl LogFilter {
    pub fn matches(&self, entry: &ExecutionLogEntry) -> bool {
        self.level.map_or(true, |l| l == entry.level)
            && self
                .agent_id
                .as_deref()
                .map_or(true, |a| a == entry.component)
    }
}
