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
use crate::connectors::{self, ServiceRecordFilter};
use crate::schema::schema_for;

const AGENT_TYPE: &str = "servicenow";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTable {
    #[default]
    Incident,
    ChangeRequest,
    Problem,
    CatalogTask,
    KnowledgeBase,
}

impl ServiceTable {
    fn as_str(self) -> &'static str {
        match self {
            Self::Incident => "incident",
            Self::ChangeRequest => "change_request",
            Self::Problem => "problem",
            Self::CatalogTask => "catalog_task",
            Self::KnowledgeBase => "knowledge_base",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ServiceNowConfig {
    #[serde(default = "default_connector")]
    pub connector: String,
    #[serde(default)]
    pub table: ServiceTable,
    #[serde(default)]
    #[schemars(extend("enum" = ["Critical", "High", "Medium", "Low", "All"]))]
    pub priority: Option<String>,
    #[serde(default = "default_state")]
    #[schemars(extend("enum" = ["Open", "In Progress", "Resolved", "Closed", "All"]))]
    pub state: Option<String>,
    /// Assignment group or user
    #[serde(default)]
    pub assigned_to: Option<String>,
}

fn default_connector() -> String {
    "servicenow".into()
}

fn default_state() -> Option<String> {
    Some("Open".into())
}

/// `All` disables a filter.
fn filter_value(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| v != "All")
}

/// Queries ServiceNow tables (incidents, changes, problems).
pub struct ServiceNowAgent {
    config: ServiceNowConfig,
}

impl BuiltinAgent for ServiceNowAgent {
    fn definition() -> AgentDefinition {
        AgentDefinition {
            agent_type: AGENT_TYPE.into(),
            name: "ServiceNow Agent".into(),
            description: "Query ServiceNow incidents, change requests, and problems".into(),
            category: AgentCategory::DataRetrieval,
            icon: "server".into(),
            supported_connectors: vec!["servicenow".into()],
            config_schema: schema_for::<ServiceNowConfig>(),
        }
    }

    fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            config: parse_config(AGENT_TYPE, config)?,
        })
    }
}

impl Agent for ServiceNowAgent {
    fn agent_type(&self) -> &str {
        AGENT_TYPE
    }

    fn execute(
        &self,
        _input: Value,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<AgentExecutionResult>> {
        Box::pin(async move {
            let table = self.config.table.as_str();
            let records = connectors::service_records(&ServiceRecordFilter {
                table: table.into(),
                priority: filter_value(&self.config.priority),
                state: filter_value(&self.config.state),
                assigned_to: self.config.assigned_to.clone(),
            });
            tracing::debug!(
                execution_id = %ctx.execution_id,
                table,
                count = records.len(),
                "ServiceNow query complete"
            );

            Ok(AgentExecutionResult::success(
                json!({ "table": table, "records": records, "count": records.len() }),
                350,
                0.012,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{build, test_ctx};

    async fn run(config: Value) -> AgentExecutionResult {
        let agent: ServiceNowAgent = build(config).unwrap();
        agent
            .execute(Value::Null, test_ctx("exec_sn", "sn"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_defaults_to_open_incidents() {
        let result = run(json!({})).await;
        assert_eq!(result.output["table"], "incident");
        assert_eq!(result.output["count"], 2);
        assert_eq!(result.tokens_used, 350);
    }

    #[tokio::test]
    async fn test_all_disables_filter() {
        let result = run(json!({"state": "All", "priority": "All"})).await;
        assert_eq!(result.output["count"], 4);

        let result = run(json!({"state": "In Progress", "priority": "Critical"})).await;
        assert_eq!(result.output["records"][0]["number"], "INC0010236");
    }

    #[test]
    fn test_unknown_table_rejected() {
        let err = build::<ServiceNowAgent>(json!({"table": "assets"})).err().unwrap();
        assert!(err.to_string().contains("table"));
    }
}
