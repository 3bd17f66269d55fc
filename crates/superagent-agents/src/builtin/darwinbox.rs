use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use superagent_core::error::Result;
use superagent_core::traits::Agent;
use superagent_core::types::{
    AgentCategory, AgentDefinition, AgentExecutionResult, ExecutionContext,
};

use super::action::{acknowledge, ActionType};
use super::{parse_config, BuiltinAgent};
use crate::schema::schema_for;

const AGENT_TYPE: &str = "darwinbox";
const NAME: &str = "DarwinBox";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DarwinboxConfig {
    #[serde(default = "default_connector")]
    pub connector: String,
    pub action_type: ActionType,
    /// Action parameters
    #[serde(default)]
    pub params: Map<String, Value>,
}

fn default_connector() -> String {
    "darwinbox".into()
}

/// Generic actions against the DarwinBox HR app.
pub struct DarwinboxAgent {
    config: DarwinboxConfig,
}

impl BuiltinAgent for DarwinboxAgent {
    fn definition() -> AgentDefinition {
        AgentDefinition {
            agent_type: AGENT_TYPE.into(),
            name: NAME.into(),
            description: "Connect to the DarwinBox HR app for employee information".into(),
            category: AgentCategory::Action,
            icon: "users".into(),
            supported_connectors: vec!["darwinbox".into()],
            config_schema: schema_for::<DarwinboxConfig>(),
        }
    }

    fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            config: parse_config(AGENT_TYPE, config)?,
        })
    }
}

impl Agent for DarwinboxAgent {
    fn agent_type(&self) -> &str {
        AGENT_TYPE
    }

    fn execute(
        &self,
        _input: Value,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<AgentExecutionResult>> {
        Box::pin(async move {
            tracing::debug!(
                execution_id = %ctx.execution_id,
                action = ?self.config.action_type,
                "DarwinBox action"
            );
            Ok(acknowledge(NAME, self.config.action_type, &self.config.params))
        })
    }
}
