use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use superagent_core::error::Result;
use superagent_core::traits::Agent;
use superagent_core::types::{
    AgentCategory, AgentDefinition, AgentExecutionResult, ExecutionContext,
};

use super::{parse_config, BuiltinAgent};
use crate::connectors::{self, OpportunityFilter};
use crate::schema::schema_for;

const AGENT_TYPE: &str = "sales_intelligence";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CrmObject {
    #[default]
    Opportunity,
    Account,
    Contact,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CloseWindow {
    Q1,
    Q2,
    Q3,
    #[default]
    Q4,
    All,
}

impl CloseWindow {
    /// `None` for `All`.
    fn quarter(self) -> Option<&'static str> {
        match self {
            Self::Q1 => Some("Q1"),
            Self::Q2 => Some("Q2"),
            Self::Q3 => Some("Q3"),
            Self::Q4 => Some("Q4"),
            Self::All => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SalesIntelligenceConfig {
    #[serde(default = "default_connector")]
    pub connector: String,
    #[serde(default)]
    pub object_type: CrmObject,
    /// Minimum deal amount
    #[serde(default = "default_amount_threshold")]
    pub amount_threshold: u64,
    #[serde(default)]
    pub close_date_filter: CloseWindow,
    /// Only deals in this stage
    #[serde(default)]
    pub stage_filter: Option<String>,
}

fn default_connector() -> String {
    "sfdc".into()
}

fn default_amount_threshold() -> u64 {
    100_000
}

/// Queries CRM opportunities, accounts or contacts.
pub struct SalesIntelligenceAgent {
    config: SalesIntelligenceConfig,
}

impl BuiltinAgent for SalesIntelligenceAgent {
    fn definition() -> AgentDefinition {
        AgentDefinition {
            agent_type: AGENT_TYPE.into(),
            name: "Sales Intelligence Agent".into(),
            description: "Query Salesforce for opportunities, accounts, and contacts".into(),
            category: AgentCategory::DataRetrieval,
            icon: "trending-up".into(),
            supported_connectors: vec!["sfdc".into()],
            config_schema: schema_for::<SalesIntelligenceConfig>(),
        }
    }

    fn from_config(config: &serde_json::Value) -> Result<Self> {
        Ok(Self {
            config: parse_config(AGENT_TYPE, config)?,
        })
    }
}

impl Agent for SalesIntelligenceAgent {
    fn agent_type(&self) -> &str {
        AGENT_TYPE
    }

    fn execute(
        &self,
        _input: serde_json::Value,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<AgentExecutionResult>> {
        Box::pin(async move {
            let output = match self.config.object_type {
                CrmObject::Account => {
                    let records = connectors::crm_accounts();
                    json!({ "records": records, "count": records.len(), "data_source": "mock" })
                }
                CrmObject::Contact => {
                    let contacts = connectors::crm_contacts();
                    json!({ "contacts": contacts, "count": contacts.len(), "data_source": "mock" })
                }
                CrmObject::Opportunity => {
                    let filter = OpportunityFilter {
                        amount_min: Some(self.config.amount_threshold).filter(|a| *a > 0),
                        close_quarter: self.config.close_date_filter.quarter().map(String::from),
                        stage: self.config.stage_filter.clone(),
                    };
                    let deals = connectors::crm_opportunities(&filter);
                    json!({ "deals": deals, "count": deals.len(), "data_source": "mock" })
                }
            };

            tracing::debug!(
                execution_id = %ctx.execution_id,
                connector = %self.config.connector,
                count = output["count"].as_u64().unwrap_or(0),
                "CRM query complete"
            );

            Ok(AgentExecutionResult::success(output, 500, 0.02))
        })
    }
}
