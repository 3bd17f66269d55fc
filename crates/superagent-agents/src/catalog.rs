//! Ready-made demo workflows built from the built-in agents.

use serde::Serialize;
use serde_json::json;

use superagent_core::types::new_workflow_id;
use superagent_core::workflow::{AgentInstance, Edge, Position, WorkflowGraph};

/// A workflow template with a suggested input.
#[derive(Debug, Clone, Serialize)]
pub struct ExampleWorkflow {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub icon: &'static str,
    pub agents: Vec<AgentInstance>,
    pub edges: Vec<Edge>,
    pub sample_input: &'static str,
}

impl ExampleWorkflow {
    /// A fresh stored workflow built from this template.
    pub fn to_workflow(&self, name: &str, org_id: Option<String>) -> WorkflowGraph {
        let mut graph = WorkflowGraph::new(
            &new_workflow_id(),
            name,
            self.agents.clone(),
            self.edges.clone(),
        );
        graph.description = self.description.to_string();
        graph.org_id = org_id;
        graph
    }

    /// Copy for a user to edit; named "<name> (Copy)".
    pub fn instantiate(&self, org_id: Option<String>) -> WorkflowGraph {
        self.to_workflow(&format!("{} (Copy)", self.name), org_id)
    }
}

fn agent(id: &str, agent_type: &str, name: &str, config: serde_json::Value, x: f64, y: f64) -> AgentInstance {
    let mut instance = AgentInstance::new(id, agent_type, name, config);
    instance.position = Position { x, y };
    instance
}

/// Every example, in display order.
pub fn examples() -> Vec<ExampleWorkflow> {
    vec![
        ExampleWorkflow {
            id: "example_sales_outreach",
            name: "Sales Outreach Pipeline",
            description: "Find high-value deals and send personalized follow-up emails with RAG context",
            category: "sales",
            icon: "bar-chart",
            agents: vec![
                agent(
                    "sales_agent_1",
                    "sales_intelligence",
                    "Find Q4 Deals",
                    json!({
                        "connector": "sfdc",
                        "object_type": "Opportunity",
                        "amount_threshold": 100000,
                        "close_date_filter": "Q4",
                        "stage_filter": "Negotiation"
                    }),
                    100.0,
                    150.0,
                ),
                agent(
                    "email_agent_1",
                    "email_outreach",
                    "Send Check-In Emails",
                    json!({
                        "connector": "outlook",
                        "email_template": "check_in",
                        "use_rag": true,
                        "include_greeting": true,
                        "max_emails": 10
                    }),
                    450.0,
                    150.0,
                ),
            ],
            edges: vec![Edge::new("sales_agent_1", "email_agent_1")],
            sample_input: "Find Q4 deals over $100K in Negotiation stage and send personalized check-in emails",
        },
        ExampleWorkflow {
            id: "example_hr_employee_search",
            name: "HR Employee Lookup",
            description: "Search for employees by department or role and notify via Slack",
            category: "hr",
            icon: "users",
            agents: vec![
                agent(
                    "workday_agent_1",
                    "workday",
                    "Search Employees",
                    json!({"connector": "workday", "department_filter": "Engineering"}),
                    100.0,
                    150.0,
                ),
                agent(
                    "slack_agent_1",
                    "slack",
                    "Post to Slack",
                    json!({"channel": "#team-updates", "message_template": "summary"}),
                    450.0,
                    150.0,
                ),
            ],
            edges: vec![Edge::new("workday_agent_1", "slack_agent_1")],
            sample_input: "Find all employees in Engineering department and post summary to Slack",
        },
        ExampleWorkflow {
            id: "example_customer_support",
            name: "Customer Support Ticket Analysis",
            description: "Analyze Zendesk tickets and look up matching Jira bugs for high-priority items",
            category: "support",
            icon: "headphones",
            agents: vec![
                agent(
                    "zendesk_agent_1",
                    "zendesk",
                    "Get High Priority Tickets",
                    json!({"status": "open", "priority": "high"}),
                    100.0,
                    150.0,
                ),
                agent(
                    "jira_agent_1",
                    "jira",
                    "Find Related Bugs",
                    json!({"project_key": "ENG", "issue_type": "Bug"}),
                    450.0,
                    150.0,
                ),
            ],
            edges: vec![Edge::new("zendesk_agent_1", "jira_agent_1")],
            sample_input: "Find high-priority open Zendesk tickets and the related Jira bugs",
        },
        ExampleWorkflow {
            id: "example_marketing_campaign",
            name: "Marketing Campaign Workflow",
            description: "Find leads from HubSpot, send emails, and notify team on Slack",
            category: "marketing",
            icon: "megaphone",
            agents: vec![
                agent(
                    "hubspot_agent_1",
                    "hubspot",
                    "Get Qualified Leads",
                    json!({"min_score": 50}),
                    100.0,
                    100.0,
                ),
                agent(
                    "email_agent_2",
                    "email_outreach",
                    "Send Welcome Emails",
                    json!({
                        "connector": "outlook",
                        "email_template": "follow_up",
                        "use_rag": false,
                        "include_greeting": true,
                        "max_emails": 20
                    }),
                    450.0,
                    100.0,
                ),
                agent(
                    "slack_agent_2",
                    "slack",
                    "Notify Marketing Team",
                    json!({"channel": "#marketing", "message_template": "summary"}),
                    450.0,
                    250.0,
                ),
            ],
            edges: vec![
                Edge::new("hubspot_agent_1", "email_agent_2"),
                Edge::new("hubspot_agent_1", "slack_agent_2"),
            ],
            sample_input: "Find new leads from HubSpot, send welcome emails, and notify marketing team on Slack",
        },
        ExampleWorkflow {
            id: "example_sap_finance",
            name: "Finance Reporting Pipeline",
            description: "Pull SAP purchase orders and send summary email",
            category: "finance",
            icon: "dollar-sign",
            agents: vec![
                agent(
                    "sap_agent_1",
                    "sap",
                    "Get Purchase Orders",
                    json!({
                        "connector": "sap",
                        "object_type": "purchase_order",
                        "status_filter": "approved",
                        "date_range": "this_month"
                    }),
                    100.0,
                    150.0,
                ),
                agent(
                    "email_agent_3",
                    "email_outreach",
                    "Send Finance Report",
                    json!({
                        "connector": "outlook",
                        "email_template": "proposal",
                        "use_rag": false,
                        "include_greeting": true,
                        "max_emails": 5
                    }),
                    450.0,
                    150.0,
                ),
            ],
            edges: vec![Edge::new("sap_agent_1", "email_agent_3")],
            sample_input: "Get approved purchase orders from SAP this month and send summary email",
        },
    ]
}

pub fn find(id: &str) -> Option<ExampleWorkflow> {
    examples().into_iter().find(|e| e.id == id)
}

/// Outcome of one example in a run-all pass.
#[derive(Debug, Clone, Serialize)]
pub struct ExampleRun {
    pub example_id: String,
    pub example_name: String,
    pub category: String,
    pub workflow_id: Option<String>,
    pub execution_id: Option<String>,
    /// `completed`, `failed`, or `error` when the run could not start
    pub status: String,
    pub tokens_used: u64,
    pub cost: f64,
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExampleRunSummary {
    pub total_examples: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_tokens: u64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExampleRunReport {
    pub summary: ExampleRunSummary,
    pub results: Vec<ExampleRun>,
}

impl ExampleRunReport {
    pub fn new(results: Vec<ExampleRun>) -> Self {
        let mut summary = ExampleRunSummary {
            total_examples: results.len(),
            ..Default::default()
        };
        for run in &results {
            if run.status == "completed" {
                summary.successful += 1;
            } else {
                summary.failed += 1;
            }
            summary.total_tokens += run.tokens_used;
            summary.total_cost += run.cost;
        }
        Self { summary, results }
    }
}
