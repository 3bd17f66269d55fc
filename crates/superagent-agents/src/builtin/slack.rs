use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use superagent_core::error::Result;
use superagent_core::traits::Agent;
use superagent_core::types::{
    AgentCategory, AgentDefinition, AgentExecutionResult, ExecutionContext,
};

use super::{find_records, parse_config, BuiltinAgent};
use crate::connectors;
use crate::schema::schema_for;

const AGENT_TYPE: &str = "slack";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MessageTemplate {
    #[default]
    Default,
    Alert,
    Summary,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SlackConfig {
    /// Target channel, e.g. #sales
    pub channel: String,
    #[serde(default)]
    pub message_template: MessageTemplate,
    /// Message body for the custom template; `{summary}` is replaced
    #[serde(default)]
    pub custom_message: Option<String>,
}

/// Posts a summary of the upstream payload to a Slack channel.
pub struct SlackAgent {
    config: SlackConfig,
}

fn summarize(input: &Value) -> (usize, String) {
    let records = find_records(input);
    if !records.is_empty() {
        return (records.len(), format!("{} records from the previous step", records.len()));
    }
    match input {
        Value::String(s) => (0, s.clone()),
        Value::Null => (0, "Workflow step completed".to_string()),
        other => (0, other.to_string()),
    }
}

impl BuiltinAgent for SlackAgent {
    fn definition() -> AgentDefinition {
        AgentDefinition {
            agent_type: AGENT_TYPE.into(),
            name: "Slack Agent".into(),
            description: "Send messages and alerts to Slack channels".into(),
            category: AgentCategory::Communication,
            icon: "message-square".into(),
            supported_connectors: vec!["slack".into()],
            config_schema: schema_for::<SlackConfig>(),
        }
    }

    fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            config: parse_config(AGENT_TYPE, config)?,
        })
    }
}

impl Agent for SlackAgent {
    fn agent_type(&self) -> &str {
        AGENT_TYPE
    }

    fn execute(
        &self,
        input: Value,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<AgentExecutionResult>> {
        Box::pin(async move {
            if !connectors::SLACK_CHANNELS.contains(&self.config.channel.as_str()) {
                return Ok(AgentExecutionResult::failure(format!(
                    "Slack channel not found: {}",
                    self.config.channel
                )));
            }

            let (count, summary) = summarize(&input);
            let message = match self.config.message_template {
                MessageTemplate::Alert => format!(":rotating_light: Alert: {summary}"),
                MessageTemplate::Summary => format!(":bar_chart: Summary: {summary}"),
                MessageTemplate::Custom => match &self.config.custom_message {
                    Some(text) => text.replace("{summary}", &summary),
                    None => {
                        return Ok(AgentExecutionResult::failure(
                            "custom_message is required for the custom template",
                        ))
                    }
                },
                MessageTemplate::Default => format!("Update: {summary}"),
            };

            let delivery = connectors::deliver("slack", ctx.execution_id.as_str(), 1);
            tracing::debug!(execution_id = %ctx.execution_id, channel = %self.config.channel, "Slack message posted");

            Ok(AgentExecutionResult::success(
                json!({
                    "channel": self.config.channel,
                    "message": message,
                    "message_id": delivery.message_id,
                    "posted_at": delivery.sent_at,
                    "records_summarized": count,
                }),
                200,
                0.008,
            ))
        })
    }
}
