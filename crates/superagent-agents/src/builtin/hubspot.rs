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

const AGENT_TYPE: &str = "hubspot";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HubspotConfig {
    #[serde(default)]
    #[schemars(extend("enum" = [
        "lead",
        "marketingqualifiedlead",
        "salesqualifiedlead",
        "customer"
    ]))]
    pub lifecycle_stage: Option<String>,
    /// Minimum lead score
    #[serde(default)]
    #[schemars(range(max = 100))]
    pub min_score: u64,
}

pub struct HubspotAgent {
    config: HubspotConfig,
}

impl BuiltinAgent for HubspotAgent {
    fn definition() -> AgentDefinition {
        AgentDefinition {
            agent_type: AGENT_TYPE.into(),
            name: "HubSpot Agent".into(),
            description: "Find marketing contacts by lifecycle stage and lead score".into(),
            category: AgentCategory::DataRetrieval,
            icon: "users".into(),
            supported_connectors: vec!["hubspot".into()],
            config_schema: schema_for::<HubspotConfig>(),
        }
    }

    fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            config: parse_config(AGENT_TYPE, config)?,
        })
    }
}

impl Agent for HubspotAgent {
    fn agent_type(&self) -> &str {
        AGENT_TYPE
    }

    fn execute(
        &self,
        _input: Value,
        _ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<AgentExecutionResult>> {
        Box::pin(async move {
            let leads = connectors::marketing_contacts(
                self.config.lifecycle_stage.as_deref(),
                self.config.min_score,
            );
            Ok(AgentExecutionResult::success(
                json!({ "leads": leads, "count": leads.len(), "data_source": "mock" }),
                350,
                0.014,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{build, test_ctx};

    #[tokio::test]
    async fn test_qualified_leads_feed_email_outreach_shape() {
        let agent: HubspotAgent = build(json!({"min_score": 70})).unwrap();
        let result = agent
            .execute(Value::Null, test_ctx("exec_hs", "hs"))
            .await
            .unwrap();
        assert_eq!(result.output["count"], 3);
        assert_eq!(crate::builtin::find_records(&result.output).len(), 3);
    }

    #[test]
    fn test_score_above_hundred_rejected() {
        assert!(build::<HubspotAgent>(json!({"min_score": 101})).is_err());
    }
}
