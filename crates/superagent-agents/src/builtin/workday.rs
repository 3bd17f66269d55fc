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
use crate::connectors::{self, EmployeeFilter};
use crate::schema::schema_for;

const AGENT_TYPE: &str = "workday";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkdayQuery {
    #[default]
    Employees,
    Departments,
    PerformanceReviews,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkdayConfig {
    #[serde(default = "default_connector")]
    pub connector: String,
    #[serde(default)]
    pub query_type: WorkdayQuery,
    #[serde(default)]
    #[schemars(extend("enum" = ["Engineering", "Sales", "Marketing", "Product", "All"]))]
    pub department_filter: Option<String>,
    #[serde(default)]
    #[schemars(extend("enum" = [
        "Outstanding",
        "Exceeds Expectations",
        "Meets Expectations",
        "All"
    ]))]
    pub performance_rating: Option<String>,
}

fn default_connector() -> String {
    "workday".into()
}

/// Queries employee records from Workday.
pub struct WorkdayAgent {
    config: WorkdayConfig,
}

impl BuiltinAgent for WorkdayAgent {
    fn definition() -> AgentDefinition {
        AgentDefinition {
            agent_type: AGENT_TYPE.into(),
            name: "Workday Agent".into(),
            description: "Query Workday HR system for employee data and performance reviews".into(),
            category: AgentCategory::DataRetrieval,
            icon: "users".into(),
            supported_connectors: vec!["workday".into()],
            config_schema: schema_for::<WorkdayConfig>(),
        }
    }

    fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            config: parse_config(AGENT_TYPE, config)?,
        })
    }
}

impl Agent for WorkdayAgent {
    fn agent_type(&self) -> &str {
        AGENT_TYPE
    }

    fn execute(
        &self,
        _input: Value,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<AgentExecutionResult>> {
        Box::pin(async move {
            let not_all = |v: &Option<String>| v.clone().filter(|v| v != "All");
            let employees = connectors::hr_employees(&EmployeeFilter {
                department: not_all(&self.config.department_filter),
                performance_rating: not_all(&self.config.performance_rating),
                manager_id: None,
            });
            tracing::debug!(
                execution_id = %ctx.execution_id,
                query = ?self.config.query_type,
                count = employees.len(),
                "Workday query complete"
            );

            Ok(AgentExecutionResult::success(
                json!({ "employees": employees, "count": employees.len() }),
                300,
                0.01,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{build, test_ctx};

    async fn run(config: Value) -> AgentExecutionResult {
        let agent: WorkdayAgent = build(config).unwrap();
        agent
            .execute(Value::Null, test_ctx("exec_wd", "hr"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_department_filter() {
        let result = run(json!({"department_filter": "Engineering"})).await;
        assert_eq!(result.output["count"], 4);
        assert!(result.output["employees"]
            .as_array()
            .unwrap()
            .iter()
            .all(|e| e["department"] == "Engineering"));
    }

    #[tokio::test]
    async fn test_all_matches_everyone() {
        let everyone = run(json!({})).await;
        let all = run(json!({"department_filter": "All", "performance_rating": "All"})).await;
        assert_eq!(everyone.output["count"], all.output["count"]);

        let top = run(json!({"performance_rating": "Outstanding"})).await;
        assert_eq!(top.output["count"], 3);
    }
}
