mod action;
pub mod darwinbox;
pub mod darwinbox_hr;
pub mod email_outreach;
pub mod hubspot;
pub mod jira;
pub mod sales_intelligence;
pub mod sap;
pub mod servicenow;
pub mod slack;
pub mod stripe;
pub mod workday;
pub mod zendesk;

use serde::de::DeserializeOwned;
use serde_json::Value;

use superagent_core::error::{Result, SuperAgentError};
use superagent_core::traits::Agent;
use superagent_core::types::AgentDefinition;

/// An agent type shipped with the crate.
pub trait BuiltinAgent: Agent + Sized {
    fn definition() -> AgentDefinition;

    /// Build from a config that already passed schema validation.
    fn from_config(config: &Value) -> Result<Self>;
}

/// Deserialize a validated config into the agent's typed settings.
pub(crate) fn parse_config<T: DeserializeOwned>(agent_type: &str, config: &Value) -> Result<T> {
    serde_json::from_value(config.clone()).map_err(|e| SuperAgentError::InvalidConfig {
        agent: agent_type.to_string(),
        message: e.to_string(),
    })
}

/// Keys under which upstream agents publish record lists.
const RECORD_KEYS: &[&str] = &[
    "deals", "records", "contacts", "employees", "leads", "tickets", "issues",
];

/// Validate `config` against the agent's published schema, then build it.
#[cfg(test)]
pub(crate) fn build<A: BuiltinAgent>(config: Value) -> Result<A> {
    let def = A::definition();
    let config = crate::schema::validate_config(&def.agent_type, &def.config_schema, &config)?;
    A::from_config(&config)
}

/// Context for calling a built-in directly in tests.
#[cfg(test)]
pub(crate) fn test_ctx(execution_id: &str, agent_id: &str) -> superagent_core::types::ExecutionContext {
    superagent_core::types::ExecutionContext {
        execution_id: superagent_core::types::ExecutionId::from_str(execution_id),
        workflow_id: "wf_test".into(),
        agent_id: agent_id.into(),
        org_id: None,
        cancel: tokio_util::sync::CancellationToken::new(),
    }
}

/// Pull the first record list out of an upstream payload.
///
/// Looks at the top level first, then under a nested `output` object.
pub(crate) fn find_records(input: &Value) -> Vec<Value> {
    fn scan(obj: &Value) -> Option<Vec<Value>> {
        RECORD_KEYS
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_array).cloned())
    }
    scan(input)
        .filter(|r| !r.is_empty())
        .or_else(|| input.get("output").and_then(scan))
        .unwrap_or_default()
}

/// First string field present on a record.
pub(crate) fn pick_str<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| record.get(*k).and_then(Value::as_str))
}
