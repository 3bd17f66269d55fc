use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SuperAgentError};

/// Canvas layout hint. Irrelevant to execution.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A node in a workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentInstance {
    pub id: String,
    #[serde(alias = "type")]
    pub agent_type: String,
    pub name: String,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AgentInstance {
    pub fn new(id: &str, agent_type: &str, name: &str, config: serde_json::Value) -> Self {
        Self {
            id: id.to_string(),
            agent_type: agent_type.to_string(),
            name: name.to_string(),
            config,
            position: Position::default(),
            description: None,
        }
    }

    /// "Name (id)" label used in error messages and logs.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }
}

/// Directed dependency: `target` runs after `source`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub source: String,
    pub target: String,
    /// `target_key -> source_key` projection applied to the source output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_mapping: Option<HashMap<String, String>>,
}

impl Edge {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            data_mapping: None,
        }
    }
}

/// A stored automation pipeline. Agent order is the authoring order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub agents: Vec<AgentInstance>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default)]
    pub execution_count: u64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl WorkflowGraph {
    pub fn new(id: &str, name: &str, agents: Vec<AgentInstance>, edges: Vec<Edge>) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            agents,
            edges,
            org_id: None,
            execution_count: 0,
            success_count: 0,
            failure_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn agent(&self, id: &str) -> Option<&AgentInstance> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Check node ids are unique and every edge references a known node.
    ///
    /// Cycle detection is left to the planner.
    pub fn validate_shape(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for agent in &self.agents {
            if agent.id.is_empty() {
                return Err(SuperAgentError::InvalidGraph("agent with empty id".into()));
            }
            if !seen.insert(agent.id.as_str()) {
                return Err(SuperAgentError::InvalidGraph(format!(
                    "duplicate agent id '{}'",
                    agent.id
                )));
            }
        }
        for edge in &self.edges {
            for end in [&edge.source, &edge.target] {
                if !seen.contains(end.as_str()) {
                    return Err(SuperAgentError::InvalidGraph(format!(
                        "edge {} -> {} references unknown agent '{}'",
                        edge.source, edge.target, end
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> WorkflowStats {
        WorkflowStats::from_counters(
            &self.id,
            self.execution_count,
            self.success_count,
            self.failure_count,
        )
    }
}

/// Rollup view of a workflow's run history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStats {
    pub workflow_id: String,
    pub execution_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Percentage, rounded to two decimals.
    pub success_rate: f64,
}

impl WorkflowStats {
    pub fn from_counters(workflow_id: &str, executions: u64, successes: u64, failures: u64) -> Self {
        let success_rate = if executions == 0 {
            0.0
        } else {
            ((successes as f64 / executions as f64) * 100.0 * 100.0).round() / 100.0
        };
        Self {
            workflow_id: workflow_id.to_string(),
            execution_count: executions,
            success_count: successes,
            failure_count: failures,
            success_rate,
        }
    }
}
