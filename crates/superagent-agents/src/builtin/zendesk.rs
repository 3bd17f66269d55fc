use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use superagent_core::error::Result;
use superagent_core::traits::Agent;
use superagent_core::types::{
    AgentCategory, AgentDefinition, AgentExecutionResult, ExecutionContext,
};

use super::{parse_config, BuiltinAgent};
use crate::connectors;
use crate::schema::schema_for;

const AGENT_TYPE: &str = "zendesk";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ZendeskConfig {
    #[serde(default = "default_status")]
    #[schemars(extend("enum" = ["new", "open", "pending", "solved", "closed"]))]
    pub status: Option<String>,
    #[serde(default)]
    #[schemars(extend("enum" = ["low", "normal", "high", "urgent"]))]
    pub priority: Option<String>,
}

fn default_status() -> Option<String> {
    Some("open".into())
}

pub struct ZendeskAgent {
    config: ZendeskConfig,
}

impl BuiltinAgent for ZendeskAgent {
    fn definition() -> AgentDefinition {
        AgentDefinition {
            agent_type: AGENT_TYPE.into(),
            name: "Zendesk Agent".into(),
            description: "Fetch support tickets filtered by status and priority".into(),
            category: AgentCategory::DataRetrieval,
            icon: "life-buoy".into(),
            supported_connectors: vec!["zendesk".into()],
            config_schema: schema_for::<ZendeskConfig>(),
        }
    }

    fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            config: parse_config(AGENT_TYPE, config)?,
        })
    }
}

impl Agent for ZendeskAgent {
    fn agent_type(&self) -> &str {
        AGENT_TYPE
    }

    fn execute(
        &self,
        _input: Value,
        _ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<AgentExecutionResult>> {
        Box::pin(async move {
            let tickets = connectors::support_tickets(
                self.config.status.as_deref(),
                self.config.priority.as_deref(),
            );
            Ok(AgentExecutionResult::success(
                json!({ "tickets": tickets, "count": tickets.len(), "data_source": "mock" }),
                300,
                0.012,
            ))
        })
    }
}
