//! Tool trait — the interface every caller-invoked tool implements.
//!
//! Tools are not offered to the model; the caller runs them directly via
//! `Agent::execute_tool` and gets structured JSON back.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the tool is registered under (e.g. `"calculator"`).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema describing the arguments object.
    fn parameters(&self) -> Value;

    /// Run the tool. Failures propagate to the caller as `AgentError::Tool`.
    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<Value>;
}

// ─────────────────────────────────────────────
// Argument helpers
// ─────────────────────────────────────────────

fn str_arg<'a>(params: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    params.get(key)?.as_str()
}

/// A string argument the tool cannot run without. Non-string values count
/// as missing.
pub fn require_string(params: &HashMap<String, Value>, key: &str) -> anyhow::Result<String> {
    match str_arg(params, key) {
        Some(s) => Ok(s.to_owned()),
        None => anyhow::bail!("Missing required parameter: {key}"),
    }
}

pub fn optional_string(params: &HashMap<String, Value>, key: &str) -> Option<String> {
    str_arg(params, key).map(str::to_owned)
}

/// Arguments map from a JSON object; anything else is treated as "no
/// arguments".
pub fn params_from_value(value: Value) -> HashMap<String, Value> {
    let Value::Object(map) = value else {
        return HashMap::new();
    };
    map.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_argument() {
        let params = params_from_value(json!({ "expression": "1 + 2", "precision": 3 }));
        assert_eq!(require_string(&params, "expression").unwrap(), "1 + 2");

        let err = require_string(&params, "precision").unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter: precision");
        assert!(require_string(&params, "operation").is_err());
    }

    #[test]
    fn test_optional_argument() {
        let params = params_from_value(json!({ "format": "%Y", "date": 0 }));
        assert_eq!(optional_string(&params, "format").as_deref(), Some("%Y"));
        assert_eq!(optional_string(&params, "date"), None);
        assert_eq!(optional_string(&params, "missing"), None);
    }

    #[test]
    fn test_params_from_non_object() {
        assert!(params_from_value(json!([1, 2])).is_empty());
        assert!(params_from_value(Value::Null).is_empty());
    }

    #[tokio::test]
    async fn test_tool_through_trait_object() {
        struct GreetTool;

        #[async_trait]
        impl Tool for GreetTool {
            fn name(&self) -> &str { "greet" }
            fn description(&self) -> &str { "Greets someone by name" }
            fn parameters(&self) -> Value {
                json!({
                    "type": "object",
                    "properties": { "who": { "type": "string" } },
                    "required": ["who"]
                })
            }
            async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<Value> {
                Ok(json!(format!("hello, {}", require_string(&params, "who")?)))
            }
        }

        let tool: Box<dyn Tool> = Box::new(GreetTool);
        assert_eq!(tool.name(), "greet");
        assert_eq!(tool.parameters()["required"][0], "who");

        let out = tool.execute(params_from_value(json!({ "who": "Ada" }))).await.unwrap();
        assert_eq!(out, json!("hello, Ada"));
    }
}
