use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use superagent_core::error::Result;
use superagent_core::traits::Agent;
use superagent_core::types::{
    AgentCategory, AgentDefinition, AgentExecutionResult, ExecutionContext, Source,
};

use super::{find_records, parse_config, pick_str, BuiltinAgent};
use crate::connectors;
use crate::schema::schema_for;

const AGENT_TYPE: &str = "email_outreach";
const TOKENS_PER_EMAIL: u64 = 250;
const COST_PER_TOKEN: f64 = 0.00004;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    #[default]
    CheckIn,
    FollowUp,
    Proposal,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EmailOutreachConfig {
    /// Mail connector
    #[serde(default = "default_connector")]
    pub connector: String,
    #[serde(default)]
    pub email_template: EmailTemplate,
    /// Cite the knowledge base in each email
    #[serde(default = "default_true")]
    pub use_rag: bool,
    #[serde(default = "default_true")]
    pub include_greeting: bool,
    /// Maximum number of emails to send
    #[serde(default)]
    #[schemars(range(min = 1, max = 100))]
    pub max_emails: Option<usize>,
}

fn default_connector() -> String {
    "outlook".into()
}

fn default_true() -> bool {
    true
}

/// Drafts and sends one templated email per upstream record.
pub struct EmailOutreachAgent {
    config: EmailOutreachConfig,
}

struct Draft {
    subject: String,
    body: String,
}

impl EmailOutreachAgent {
    fn draft(&self, record: &Value) -> Draft {
        let owner = pick_str(record, &["OwnerName", "name"]).unwrap_or("there");
        let account = record
            .pointer("/Account/Name")
            .and_then(Value::as_str)
            .or_else(|| pick_str(record, &["Name", "subject", "vendor"]))
            .unwrap_or("your account");
        let amount = record
            .get("Amount")
            .or_else(|| record.get("amount"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let close = pick_str(record, &["CloseDate"]).unwrap_or("soon");

        let (subject, line) = match self.config.email_template {
            EmailTemplate::FollowUp => (
                format!("Following up: {account}"),
                format!("Following up on our last conversation about {account}. Is there anything blocking the ${amount} deal before {close}?"),
            ),
            EmailTemplate::Proposal => (
                format!("Proposal for {account}"),
                format!("Attached is our proposal for {account} (${amount}). We would like to finalize by {close}."),
            ),
            EmailTemplate::CheckIn => (
                format!("Checking in on {account}"),
                format!("Just checking in on {account}. The ${amount} opportunity is slated to close {close}; let me know how we can help."),
            ),
        };

        let body = if self.config.include_greeting {
            format!("Hi {owner},\n\n{line}\n\nBest regards")
        } else {
            line
        };
        Draft { subject, body }
    }
}

impl BuiltinAgent for EmailOutreachAgent {
    fn definition() -> AgentDefinition {
        AgentDefinition {
            agent_type: AGENT_TYPE.into(),
            name: "Email Outreach Agent".into(),
            description: "Generate and send personalized emails from upstream records".into(),
            category: AgentCategory::Action,
            icon: "mail".into(),
            supported_connectors: vec!["outlook".into()],
            config_schema: schema_for::<EmailOutreachConfig>(),
        }
    }

    fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            config: parse_config(AGENT_TYPE, config)?,
        })
    }
}

impl Agent for EmailOutreachAgent {
    fn agent_type(&self) -> &str {
        AGENT_TYPE
    }

    fn execute(
        &self,
        input: Value,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<AgentExecutionResult>> {
        Box::pin(async move {
            let mut recipients = find_records(&input);
            if recipients.is_empty() {
                tracing::warn!(execution_id = %ctx.execution_id, "No recipients in email input");
                return Ok(AgentExecutionResult::failure("No recipients found in input data"));
            }
            if let Some(max) = self.config.max_emails {
                recipients.truncate(max);
            }

            let mut emails = Vec::with_capacity(recipients.len());
            for (seq, recipient) in recipients.iter().enumerate() {
                let draft = self.draft(recipient);
                let to = pick_str(recipient, &["OwnerEmail", "email", "Email", "vendor_email"])
                    .unwrap_or("contact@example.com");
                let delivery = connectors::deliver("msg", ctx.execution_id.as_str(), seq + 1);
                emails.push(json!({
                    "recipient_id": recipient.get("Id").or_else(|| recipient.get("id")),
                    "recipient_name": pick_str(recipient, &["Name", "name", "firstname", "vendor"]),
                    "recipient_email": to,
                    "subject": draft.subject,
                    "body": draft.body,
                    "sent_at": delivery.sent_at,
                    "message_id": delivery.message_id,
                }));
            }

            let tokens = TOKENS_PER_EMAIL * emails.len() as u64;
            let sources = if self.config.use_rag {
                vec![Source {
                    title: "demo_notes.txt".into(),
                    url: None,
                }]
            } else {
                vec![]
            };

            tracing::debug!(
                execution_id = %ctx.execution_id,
                template = ?self.config.email_template,
                sent = emails.len(),
                "Emails sent"
            );

            Ok(AgentExecutionResult::success(
                json!({
                    "emails_sent": emails.len(),
                    "emails": emails,
                    "data_source": "mock",
                }),
                tokens,
                tokens as f64 * COST_PER_TOKEN,
            )
            .with_sources(sources))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{build, test_ctx};

    fn ctx() -> ExecutionContext {
        test_ctx("exec_mail", "email")
    }

    fn agent(config: Value) -> EmailOutreachAgent {
        build(config).unwrap()
    }

    fn deals(n: usize) -> Value {
        let deals: Vec<Value> = (0..n)
            .map(|i| {
                json!({
                    "Id": format!("opp_{i}"),
                    "Name": format!("Deal {i}"),
                    "Account": {"Name": format!("Account {i}")},
                    "Amount": 150000,
                    "OwnerName": "Sarah",
                    "OwnerEmail": "sarah@example.com",
                })
            })
            .collect();
        json!({ "deals": deals, "count": n })
    }

    #[tokio::test]
    async fn test_sends_one_email_per_deal() {
        let result = agent(json!({"email_template": "check_in"}))
            .execute(deals(3), ctx())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output["emails_sent"], 3);
        assert_eq!(result.tokens_used, 750);
        assert!((result.cost - 0.03).abs() < 1e-9);
        let first = &result.output["emails"][0];
        assert_eq!(first["subject"], "Checking in on Account 0");
        assert_eq!(first["message_id"], "msg_exec_mail_001");
        assert!(first["body"].as_str().unwrap().starts_with("Hi Sarah,"));
    }

    #[tokio::test]
    async fn test_empty_config_uses_check_in_with_rag() {
        let email = agent(json!({}));
        assert_eq!(email.config.email_template, EmailTemplate::CheckIn);
        assert_eq!(email.config.connector, "outlook");

        let result = email.execute(deals(1), ctx()).await.unwrap();
        assert_eq!(result.output["emails"][0]["subject"], "Checking in on Account 0");
        assert_eq!(result.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_max_emails_caps_recipients() {
        let result = agent(json!({"email_template": "proposal", "max_emails": 2}))
            .execute(deals(5), ctx())
            .await
            .unwrap();
        assert_eq!(result.output["emails_sent"], 2);
    }

    #[tokio::test]
    async fn test_no_recipients_is_expected_failure() {
        let result = agent(json!({"email_template": "check_in"}))
            .execute(json!("just text"), ctx())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No recipients found in input data"));
        assert_eq!(result.tokens_used, 0);
    }

    #[tokio::test]
    async fn test_rag_can_be_disabled() {
        let result = agent(json!({"email_template": "follow_up", "use_rag": false}))
            .execute(deals(1), ctx())
            .await
            .unwrap();
        assert!(result.sources.is_empty());
        assert_eq!(result.output["emails"][0]["subject"], "Following up: Account 0");
    }

    #[test]
    fn test_rejects_unknown_template_and_range() {
        let err = build::<EmailOutreachAgent>(json!({"email_template": "newsletter"}))
            .err()
            .unwrap();
        assert!(err.to_string().contains("email_template"));

        let err = build::<EmailOutreachAgent>(json!({"max_emails": 0})).err().unwrap();
        assert!(err.to_string().contains("max_emails"));
    }
}
