use serde_json::{json, Value};

use superagent_core::types::{AgentCategory, AgentDefinition};
use superagent_core::workflow::{AgentInstance, Edge, WorkflowGraph};

/// Definition for a mock agent type with no config fields.
pub fn mock_definition(agent_type: &str) -> AgentDefinition {
    AgentDefinition {
        agent_type: agent_type.to_string(),
        name: format!("Mock {agent_type}"),
        description: "Scripted test agent".to_string(),
        category: AgentCategory::Analysis,
        icon: String::new(),
        supported_connectors: vec![],
        config_schema: json!({"type": "object"}),
    }
}

/// Definition whose config requires a string `template` field.
pub fn strict_definition(agent_type: &str) -> AgentDefinition {
    AgentDefinition {
        config_schema: json!({
            "type": "object",
            "properties": {
                "template": {"type": "string"},
                "limit": {"type": "integer", "default": 5}
            },
            "required": ["template"]
        }),
        ..mock_definition(agent_type)
    }
}

/// Node with empty config.
pub fn node(id: &str, agent_type: &str) -> AgentInstance {
    AgentInstance::new(id, agent_type, &id.to_uppercase(), json!({}))
}

pub fn node_with_config(id: &str, agent_type: &str, config: Value) -> AgentInstance {
    AgentInstance::new(id, agent_type, &id.to_uppercase(), config)
}

pub fn workflow(id: &str, agents: Vec<AgentInstance>, edges: &[(&str, &str)]) -> WorkflowGraph {
    let edges = edges.iter().map(|(s, t)| Edge::new(s, t)).collect();
    WorkflowGraph::new(id, &format!("Workflow {id}"), agents, edges)
}

/// Linear workflow `a -> b -> ...` over the given nodes, in order.
pub fn chain(id: &str, agents: Vec<AgentInstance>) -> WorkflowGraph {
    let edges = agents
        .windows(2)
        .map(|pair| Edge::new(&pair[0].id, &pair[1].id))
        .collect();
    WorkflowGraph::new(id, &format!("Workflow {id}"), agents, edges)
}

/// Temporary directory that lives for the duration of a test.
pub fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create temp dir")
}
