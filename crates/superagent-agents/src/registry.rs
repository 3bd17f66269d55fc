use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use superagent_core::error::{Result, SuperAgentError};
use superagent_core::traits::Agent;
use superagent_core::types::AgentDefinition;

use crate::builtin::BuiltinAgent;
use crate::schema::validate_config;

/// Builds an agent from a config that already passed schema validation.
pub type AgentFactory = Arc<dyn Fn(&Value) -> Result<Arc<dyn Agent>> + Send + Sync>;

/// A registered agent type: its descriptor plus how to construct it.
#[derive(Clone)]
pub struct RegisteredAgent {
    pub definition: Arc<AgentDefinition>,
    factory: AgentFactory,
}

impl RegisteredAgent {
    /// Validate `config` against the schema and build the agent.
    pub fn instantiate(&self, config: &Value) -> Result<Arc<dyn Agent>> {
        let config = validate_config(
            &self.definition.agent_type,
            &self.definition.config_schema,
            config,
        )?;
        (self.factory)(&config)
    }
}

impl std::fmt::Debug for RegisteredAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredAgent")
            .field("agent_type", &self.definition.agent_type)
            .finish()
    }
}

/// Catalog of available agent types.
///
/// Populated at startup, then shared read-only behind an `Arc`.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, RegisteredAgent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    /// Register an agent type. Re-registering a key replaces it.
    pub fn register(&mut self, definition: AgentDefinition, factory: AgentFactory) {
        let key = definition.agent_type.clone();
        if self.agents.contains_key(&key) {
            tracing::debug!(agent_type = %key, "Replacing registered agent");
        }
        self.agents.insert(
            key,
            RegisteredAgent {
                definition: Arc::new(definition),
                factory,
            },
        );
    }

    /// Register a built-in agent by type.
    pub fn register_builtin<A: BuiltinAgent>(&mut self) {
        let factory: AgentFactory =
            Arc::new(|config: &Value| Ok(Arc::new(A::from_config(config)?) as Arc<dyn Agent>));
        self.register(A::definition(), factory);
    }

    /// Unregister an agent type.
    pub fn unregister(&mut self, agent_type: &str) -> bool {
        self.agents.remove(agent_type).is_some()
    }

    pub fn resolve(&self, agent_type: &str) -> Result<RegisteredAgent> {
        self.agents
            .get(agent_type)
            .cloned()
            .ok_or_else(|| SuperAgentError::UnknownAgentType(agent_type.to_string()))
    }

    pub fn contains(&self, agent_type: &str) -> bool {
        self.agents.contains_key(agent_type)
    }

    /// All definitions, sorted by `agent_type`.
    pub fn list_all(&self) -> Vec<Arc<AgentDefinition>> {
        let mut defs: Vec<_> = self
            .agents
            .values()
            .map(|a| Arc::clone(&a.definition))
            .collect();
        defs.sort_by(|a, b| a.agent_type.cmp(&b.agent_type));
        defs
    }

    /// JSON Schema of an agent type's config.
    pub fn config_schema(&self, agent_type: &str) -> Result<Value> {
        Ok(self.resolve(agent_type)?.definition.config_schema.clone())
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Create a registry with all built-in agents registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        // ── Data retrieval ──────────────────────────────────────
        registry.register_builtin::<crate::builtin::sales_intelligence::SalesIntelligenceAgent>();
        registry.register_builtin::<crate::builtin::jira::JiraAgent>();
        registry.register_builtin::<crate::builtin::zendesk::ZendeskAgent>();
        registry.register_builtin::<crate::builtin::hubspot::HubspotAgent>();
        registry.register_builtin::<crate::builtin::servicenow::ServiceNowAgent>();
        registry.register_builtin::<crate::builtin::sap::SapAgent>();
        registry.register_builtin::<crate::builtin::workday::WorkdayAgent>();
        registry.register_builtin::<crate::builtin::darwinbox_hr::DarwinboxHrAgent>();

        // ── Actions ─────────────────────────────────────────────
        registry.register_builtin::<crate::builtin::stripe::StripeAgent>();
        registry.register_builtin::<crate::builtin::darwinbox::DarwinboxAgent>();

        // ── Communication ───────────────────────────────────────
        registry.register_builtin::<crate::builtin::email_outreach::EmailOutreachAgent>();
        registry.register_builtin::<crate::builtin::slack::SlackAgent>();

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use superagent_core::types::AgentCategory;
    use superagent_test_utils::MockAgent;

    fn definition(agent_type: &str, name: &str) -> AgentDefinition {
        AgentDefinition {
            agent_type: agent_type.into(),
            name: name.into(),
            description: String::new(),
            category: AgentCategory::Analysis,
            icon: String::new(),
            supported_connectors: vec![],
            config_schema: json!({
                "type": "object",
                "properties": {"threshold": {"type": "integer"}},
                "required": ["threshold"],
            }),
        }
    }

    fn mock_factory() -> AgentFactory {
        Arc::new(|_: &Value| Ok(Arc::new(MockAgent::echo("mock")) as Arc<dyn Agent>))
    }

    #[test]
    fn test_resolve_unknown_type() {
        let registry = AgentRegistry::new();
        let err = registry.resolve("does_not_exist").unwrap_err();
        assert!(matches!(err, SuperAgentError::UnknownAgentType(ref t) if t == "does_not_exist"));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = AgentRegistry::new();
        registry.register(definition("mock", "First"), mock_factory());
        registry.register(definition("mock", "Second"), mock_factory());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("mock").unwrap().definition.name, "Second");
    }

    #[test]
    fn test_instantiate_validates_config() {
        let mut registry = AgentRegistry::new();
        registry.register(definition("mock", "Mock"), mock_factory());
        let entry = registry.resolve("mock").unwrap();

        let err = entry.instantiate(&json!({})).err().unwrap();
        assert!(matches!(err, SuperAgentError::InvalidConfig { .. }));
        assert!(entry.instantiate(&json!({"threshold": 5})).is_ok());
    }

    #[test]
    fn test_builtins_listed_sorted() {
        let registry = AgentRegistry::with_builtins();
        let types: Vec<String> = registry
            .list_all()
            .iter()
            .map(|d| d.agent_type.clone())
            .collect();
        assert_eq!(
            types,
            vec![
                "darwinbox",
                "darwinbox_hr",
                "email_outreach",
                "hubspot",
                "jira",
                "sales_intelligence",
                "sap",
                "servicenow",
                "slack",
                "stripe",
                "workday",
                "zendesk"
            ]
        );
    }

    #[test]
    fn test_config_schema_rendering() {
        let registry = AgentRegistry::with_builtins();
        let schema = registry.config_schema("slack").unwrap();
        assert_eq!(schema["required"], json!(["channel"]));
        assert!(registry.config_schema("nope").is_err());
    }

    #[test]
    fn test_every_builtin_schema_compiles_and_accepts_defaults() {
        let registry = AgentRegistry::with_builtins();
        let minimal = json!({
            "slack": {"channel": "#general"},
            "stripe": {"action_type": "create"},
            "darwinbox": {"action_type": "send"},
        });
        for def in registry.list_all() {
            let config = minimal.get(&def.agent_type).cloned().unwrap_or(Value::Null);
            let entry = registry.resolve(&def.agent_type).unwrap();
            assert!(
                entry.instantiate(&config).is_ok(),
                "{} rejected {config}",
                def.agent_type
            );
        }
    }

    #[test]
    fn test_unregister() {
        let mut registry = AgentRegistry::with_builtins();
        assert!(registry.unregister("slack"));
        assert!(!registry.contains("slack"));
        assert!(!registry.unregister("slack"));
    }
}
