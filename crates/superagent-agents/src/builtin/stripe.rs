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

const AGENT_TYPE: &str = "stripe";
const NAME: &str = "Stripe Payment Agent";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StripeConfig {
    #[serde(default = "default_connector")]
    pub connector: String,
    pub action_type: ActionType,
    /// Action parameters
    #[serde(default)]
    pub params: Map<String, Value>,
}

fn default_connector() -> String {
    "stripe".into()
}

/// Payment and subscription actions against Stripe.
pub struct StripeAgent {
    config: StripeConfig,
}

impl BuiltinAgent for StripeAgent {
    fn definition() -> AgentDefinition {
        AgentDefinition {
            agent_type: AGENT_TYPE.into(),
            name: NAME.into(),
            description: "Process payments and manage subscriptions via Stripe API".into(),
            category: AgentCategory::Action,
            icon: "zap".into(),
            supported_connectors: vec!["stripe".into()],
            config_schema: schema_for::<StripeConfig>(),
        }
    }

    fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            config: parse_config(AGENT_TYPE, config)?,
        })
    }
}

impl Agent for StripeAgent {
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
                "Stripe action"
            );
            Ok(acknowledge(NAME, self.config.action_type, &self.config.params))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{build, test_ctx};
    use serde_json::json;

    #[tokio::test]
    async fn test_acknowledges_action() {
        let agent: StripeAgent =
            build(json!({"action_type": "create", "params": {"amount": 4200}})).unwrap();
        let result = agent
            .execute(Value::Null, test_ctx("exec_stripe", "pay"))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output["message"], "Stripe Payment Agent executed successfully");
        assert_eq!(result.output["data"]["action_type"], "create");
        assert_eq!(result.output["data"]["params"]["amount"], 4200);
        assert_eq!((result.tokens_used, result.cost), (100, 0.004));
    }

    #[test]
    fn test_action_type_is_required() {
        let err = build::<StripeAgent>(json!({})).err().unwrap();
        assert!(err.to_string().contains("action_type"));
        assert!(build::<StripeAgent>(json!({"action_type": "refund"})).is_err());
    }
}
