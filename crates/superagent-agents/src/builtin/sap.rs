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

const AGENT_TYPE: &str = "sap";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SapModule {
    #[default]
    Finance,
    Procurement,
    SalesDistribution,
    MaterialsManagement,
    HumanCapital,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SapQuery {
    #[default]
    PurchaseOrders,
    VendorInvoices,
    InventoryLevels,
    SalesOrders,
    GeneralLedger,
}

impl SapQuery {
    fn as_str(self) -> &'static str {
        match self {
            Self::PurchaseOrders => "purchase_orders",
            Self::VendorInvoices => "vendor_invoices",
            Self::InventoryLevels => "inventory_levels",
            Self::SalesOrders => "sales_orders",
            Self::GeneralLedger => "general_ledger",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    Today,
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[default]
    #[serde(rename = "last_30_days")]
    Last30Days,
    ThisMonth,
    LastQuarter,
    LastYear,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SapConfig {
    #[serde(default = "default_connector")]
    pub connector: String,
    #[serde(default)]
    pub module: SapModule,
    #[serde(default)]
    pub query_type: SapQuery,
    /// Free-form alternative to `query_type`, e.g. purchase_order or invoice
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    #[schemars(extend("enum" = ["approved", "pending", "open", "closed", "All"]))]
    pub status_filter: Option<String>,
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub company_code: Option<String>,
}

fn default_connector() -> String {
    "sap".into()
}

impl SapConfig {
    /// `object_type` wins over `query_type` when it names a known document.
    fn effective_query(&self) -> SapQuery {
        let object = self.object_type.as_deref().map(str::to_lowercase);
        match object.as_deref() {
            Some(o) if o.contains("purchase") => SapQuery::PurchaseOrders,
            Some(o) if o.contains("invoice") => SapQuery::VendorInvoices,
            _ => self.query_type,
        }
    }
}

/// Queries SAP ERP documents.
pub struct SapAgent {
    config: SapConfig,
}

impl BuiltinAgent for SapAgent {
    fn definition() -> AgentDefinition {
        AgentDefinition {
            agent_type: AGENT_TYPE.into(),
            name: "SAP ERP Agent".into(),
            description: "Query SAP ERP system for financial, procurement, and operational data"
                .into(),
            category: AgentCategory::DataRetrieval,
            icon: "building".into(),
            supported_connectors: vec!["sap".into()],
            config_schema: schema_for::<SapConfig>(),
        }
    }

    fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            config: parse_config(AGENT_TYPE, config)?,
        })
    }
}

impl Agent for SapAgent {
    fn agent_type(&self) -> &str {
        AGENT_TYPE
    }

    fn execute(
        &self,
        _input: Value,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<AgentExecutionResult>> {
        Box::pin(async move {
            let query = self.config.effective_query().as_str();
            let status = self.config.status_filter.as_deref().filter(|s| *s != "All");
            let records =
                connectors::erp_documents(query, status, self.config.company_code.as_deref());
            tracing::debug!(
                execution_id = %ctx.execution_id,
                query,
                count = records.len(),
                "SAP query complete"
            );

            Ok(AgentExecutionResult::success(
                json!({ "query_type": query, "records": records, "count": records.len() }),
                400,
                0.015,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{build, test_ctx};

    async fn run(config: Value) -> AgentExecutionResult {
        let agent: SapAgent = build(config).unwrap();
        agent
            .execute(Value::Null, test_ctx("exec_sap", "sap"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_approved_purchase_orders() {
        let result = run(json!({"status_filter": "approved"})).await;
        assert_eq!(result.output["query_type"], "purchase_orders");
        assert_eq!(result.output["count"], 4);
        assert_eq!(result.cost, 0.015);
    }

    #[tokio::test]
    async fn test_object_type_overrides_query_type() {
        let result = run(json!({"query_type": "purchase_orders", "object_type": "Vendor Invoice"})).await;
        assert_eq!(result.output["query_type"], "vendor_invoices");
        assert_eq!(result.output["count"], 3);
    }

    #[test]
    fn test_date_range_names() {
        assert!(build::<SapAgent>(json!({"date_range": "last_7_days"})).is_ok());
        assert!(build::<SapAgent>(json!({"date_range": "last7_days"})).is_err());
    }

    #[tokio::test]
    async fn test_unbacked_query_returns_no_records() {
        let result = run(json!({"query_type": "general_ledger"})).await;
        assert!(result.success);
        assert_eq!(result.output["count"], 0);
    }
}
