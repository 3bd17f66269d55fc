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
use crate::connectors::{self, IssueFilter};
use crate::schema::schema_for;

const AGENT_TYPE: &str = "jira";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JiraConfig {
    #[serde(default = "default_project_key")]
    pub project_key: String,
    #[serde(default)]
    #[schemars(extend("enum" = ["Bug", "Story", "Task", "Incident"]))]
    pub issue_type: Option<String>,
    #[serde(default)]
    #[schemars(extend("enum" = ["To Do", "In Progress", "Done"]))]
    pub status: Option<String>,
    #[serde(default)]
    pub sprint: Option<String>,
}

fn default_project_key() -> String {
    "ENG".into()
}

pub struct JiraAgent {
    config: JiraConfig,
}

impl BuiltinAgent for JiraAgent {
    fn definition() -> AgentDefinition {
        AgentDefinition {
            agent_type: AGENT_TYPE.into(),
            name: "Jira Agent".into(),
            description: "Query Jira issues by project, type, status, and sprint".into(),
            category: AgentCategory::DataRetrieval,
            icon: "clipboard-list".into(),
            supported_connectors: vec!["jira".into()],
            config_schema: schema_for::<JiraConfig>(),
        }
    }

    fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            config: parse_config(AGENT_TYPE, config)?,
        })
    }
}

impl Agent for JiraAgent {
    fn agent_type(&self) -> &str {
        AGENT_TYPE
    }

    fn execute(
        &self,
        _input: Value,
        _ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<AgentExecutionResult>> {
        Box::pin(async move {
            let issues = connectors::ticket_issues(&IssueFilter {
                project_key: Some(self.config.project_key.clone()),
                issue_type: self.config.issue_type.clone(),
                status: self.config.status.clone(),
                sprint: self.config.sprint.clone(),
            });
            let points: u64 = issues
                .iter()
                .filter_map(|i| i["story_points"].as_u64())
                .sum();

            Ok(AgentExecutionResult::success(
                json!({
                    "issues": issues,
                    "count": issues.len(),
                    "total_story_points": points,
                    "project_key": self.config.project_key,
                    "data_source": "mock",
                }),
                450,
                0.016,
            ))
        })
    }
}
