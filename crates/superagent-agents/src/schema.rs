//! Agent config schemas.
//!
//! Built-in agents derive [`schemars::JsonSchema`] on their typed config and
//! publish the draft-07 rendering in their [`AgentDefinition`]. Configs are
//! checked against that schema with `jsonschema` before the agent is built;
//! defaults are filled by the typed deserialize.
//!
//! [`AgentDefinition`]: superagent_core::types::AgentDefinition

use jsonschema::JSONSchema;
use schemars::generate::SchemaSettings;
use schemars::JsonSchema;
use serde_json::{Map, Value};

use superagent_core::error::{Result, SuperAgentError};

/// Draft-07 JSON Schema for `T`.
pub fn schema_for<T: JsonSchema>() -> Value {
    SchemaSettings::draft07()
        .into_generator()
        .into_root_schema_for::<T>()
        .to_value()
}

/// Check `config` against `schema`.
///
/// `null` is treated as an empty object. Returns the config to hand to the
/// agent factory.
pub fn validate_config(agent_type: &str, schema: &Value, config: &Value) -> Result<Value> {
    let invalid = |message: String| SuperAgentError::InvalidConfig {
        agent: agent_type.to_string(),
        message,
    };

    let config = match config {
        Value::Null => Value::Object(Map::new()),
        Value::Object(_) => config.clone(),
        _ => return Err(invalid("config must be a JSON object".into())),
    };

    let validator = JSONSchema::compile(schema)
        .map_err(|e| invalid(format!("invalid config schema: {e}")))?;

    let problems: Vec<String> = match validator.validate(&config) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|e| {
                let path = e.instance_path.to_string();
                match path.trim_start_matches('/') {
                    "" => e.to_string(),
                    field => format!("{field}: {e}"),
                }
            })
            .collect(),
    };

    if problems.is_empty() {
        Ok(config)
    } else {
        Err(invalid(problems.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, JsonSchema)]
    #[serde(rename_all = "snake_case")]
    enum Tone {
        Plain,
        Formal,
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Sample {
        /// Destination address
        target: String,
        #[serde(default = "default_tone")]
        tone: Tone,
        #[serde(default)]
        #[schemars(range(min = 1, max = 10))]
        retries: Option<u32>,
    }

    fn default_tone() -> Tone {
        Tone::Plain
    }

    #[test]
    fn test_schema_lists_required_fields() {
        let schema = schema_for::<Sample>();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["target"]));
        assert!(schema["properties"]["target"]["description"]
            .as_str()
            .unwrap()
            .contains("Destination"));
    }

    #[test]
    fn test_valid_config_passes_through() {
        let schema = schema_for::<Sample>();
        let config = validate_config("sample", &schema, &json!({"target": "a", "tone": "formal"}))
            .unwrap();
        let typed: Sample = serde_json::from_value(config).unwrap();
        assert!(matches!(typed.tone, Tone::Formal));
    }

    #[test]
    fn test_errors_name_the_field() {
        let schema = schema_for::<Sample>();

        let err = validate_config("sample", &schema, &json!({})).unwrap_err();
        assert!(matches!(err, SuperAgentError::InvalidConfig { ref agent, .. } if agent == "sample"));
        assert!(err.to_string().contains("target"));

        let err = validate_config("sample", &schema, &json!({"target": "a", "tone": "loud"}))
            .unwrap_err();
        assert!(err.to_string().contains("tone"));

        let err = validate_config("sample", &schema, &json!({"target": "a", "retries": 50}))
            .unwrap_err();
        assert!(err.to_string().contains("retries"));
    }

    #[test]
    fn test_null_and_non_object_configs() {
        let open = json!({"type": "object"});
        assert_eq!(validate_config("x", &open, &Value::Null).unwrap(), json!({}));
        assert!(validate_config("x", &open, &json!([1, 2])).is_err());
    }
}
