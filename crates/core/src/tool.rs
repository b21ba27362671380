//! Tool trait, registry, and per-request context.
//!
//! Tools are the agent's capabilities: retrieve regulations, measure
//! the drawing, analyze compliance, generate an adjusted design,
//! verify the result. The set is closed at construction time; the
//! model chooses among them via the function-call protocol.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::chunk::RetrievedChunk;
use crate::drawing::Drawing;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// Read-mostly state shared by all tools during one request.
///
/// The drawing is passed once at request entry and read by the tools
/// that need it — the model never passes it explicitly. The
/// regulations cache accumulates retrieval hits so the final answer
/// can cite them.
pub struct RequestContext {
    pub question: String,
    pub drawing: Option<Drawing>,
    /// RFC-3339 timestamp of the drawing's last edit, when supplied.
    pub drawing_updated_at: Option<String>,
    regulations: Mutex<Vec<RetrievedChunk>>,
}

impl RequestContext {
    pub fn new(question: impl Into<String>, drawing: Option<Drawing>) -> Self {
        Self {
            question: question.into(),
            drawing,
            drawing_updated_at: None,
            regulations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_drawing_updated_at(mut self, ts: Option<String>) -> Self {
        self.drawing_updated_at = ts;
        self
    }

    /// True when a non-empty drawing accompanies the request.
    pub fn has_drawing(&self) -> bool {
        self.drawing.as_ref().is_some_and(|d| !d.is_empty())
    }

    /// Replace the cached retrieval hits with the latest batch.
    pub fn cache_regulations(&self, chunks: Vec<RetrievedChunk>) {
        *self.regulations.lock().expect("regulations lock poisoned") = chunks;
    }

    /// Snapshot of the cached hits, for source citation.
    pub fn cached_regulations(&self) -> Vec<RetrievedChunk> {
        self.regulations.lock().expect("regulations lock poisoned").clone()
    }
}

/// A tool-call intent observed from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// The wire-protocol call id (echoed back in the result turn).
    pub id: String,
    pub name: String,
    /// Parsed arguments, exactly as the model emitted them.
    pub arguments: serde_json::Value,
}

/// What a tool execution produced.
///
/// Tools catch their internal errors and report them here with
/// `success=false` so every tool call yields a result turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    /// The structured payload serialized back to the model.
    pub payload: serde_json::Value,
}

impl ToolOutcome {
    pub fn ok(payload: serde_json::Value) -> Self {
        Self { success: true, payload }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            payload: serde_json::json!({ "success": false, "error": message.to_string() }),
        }
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The wire-visible name. Stable across versions.
    fn name(&self) -> &str;

    /// Short description sent to the LLM.
    fn description(&self) -> &str;

    /// JSON Schema for this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute against the request context with validated arguments.
    async fn execute(
        &self,
        ctx: &RequestContext,
        arguments: serde_json::Value,
    ) -> Result<ToolOutcome, ToolError>;

    /// Convert this tool into a definition for the LLM payload.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The closed registry of tools for this deployment.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// All tool definitions, for the LLM payload.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Dispatch a call: look up the tool, validate the arguments
    /// against its schema, then run the body.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        call: &ToolCall,
    ) -> Result<ToolOutcome, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        validate_arguments(tool.name(), &tool.parameters_schema(), &call.arguments)?;
        tool.execute(ctx, call.arguments.clone()).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate arguments against a tool's parameter schema.
///
/// Covers the JSON-Schema subset the tool contracts use: `type`,
/// `properties`, `required`, `enum`, and array `items`.
pub fn validate_arguments(
    tool_name: &str,
    schema: &serde_json::Value,
    arguments: &serde_json::Value,
) -> Result<(), ToolError> {
    let invalid = |reason: String| ToolError::InvalidArguments {
        tool_name: tool_name.to_string(),
        reason,
    };

    let obj = arguments
        .as_object()
        .ok_or_else(|| invalid("arguments must be a JSON object".into()))?;

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for key in required.iter().filter_map(|k| k.as_str()) {
            if !obj.contains_key(key) {
                return Err(invalid(format!("missing required field '{key}'")));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        return Ok(());
    };

    for (key, value) in obj {
        let Some(prop) = properties.get(key) else {
            continue; // extra fields tolerated
        };
        check_value(key, prop, value).map_err(invalid)?;
    }

    Ok(())
}

fn check_value(key: &str, prop: &serde_json::Value, value: &serde_json::Value) -> Result<(), String> {
    if let Some(ty) = prop.get("type").and_then(|t| t.as_str()) {
        let matches = match ty {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            // Drawings serialize as arrays but are declared "object"
            // in the wire schema.
            "object" => value.is_object() || value.is_array(),
            _ => true,
        };
        if !matches {
            return Err(format!("field '{key}' must be of type {ty}"));
        }
    }

    if let Some(allowed) = prop.get("enum").and_then(|e| e.as_array()) {
        if !allowed.contains(value) {
            return Err(format!("field '{key}' must be one of {allowed:?}"));
        }
    }

    if let (Some(items), Some(values)) = (prop.get("items"), value.as_array()) {
        for v in values {
            check_value(key, items, v)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(
            &self,
            _ctx: &RequestContext,
            arguments: serde_json::Value,
        ) -> Result<ToolOutcome, ToolError> {
            Ok(ToolOutcome::ok(serde_json::json!({
                "success": true,
                "text": arguments["text"],
            })))
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new("test question", None)
    }

    #[tokio::test]
    async fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let call = ToolCall {
            id: "call_1".into(),
            name: "echo".into(),
            arguments: serde_json::json!({"text": "hello"}),
        };
        let outcome = registry.execute(&ctx(), &call).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.payload["text"], "hello");
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let call = ToolCall {
            id: "call_1".into(),
            name: "nonexistent".into(),
            arguments: serde_json::json!({}),
        };
        let err = registry.execute(&ctx(), &call).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn registry_rejects_schema_invalid_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let call = ToolCall {
            id: "call_1".into(),
            name: "echo".into(),
            arguments: serde_json::json!({"text": 42}),
        };
        let err = registry.execute(&ctx(), &call).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[test]
    fn validate_required_fields() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        });
        assert!(validate_arguments("t", &schema, &serde_json::json!({})).is_err());
        assert!(validate_arguments("t", &schema, &serde_json::json!({"query": "x"})).is_ok());
    }

    #[test]
    fn validate_enum_values() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "dimension_type": {
                    "type": "string",
                    "enum": ["plot_area", "extension_depth", "building_height", "all"]
                }
            },
            "required": ["dimension_type"]
        });
        assert!(validate_arguments(
            "t",
            &schema,
            &serde_json::json!({"dimension_type": "plot_area"})
        )
        .is_ok());
        assert!(validate_arguments(
            "t",
            &schema,
            &serde_json::json!({"dimension_type": "roof_pitch"})
        )
        .is_err());
    }

    #[test]
    fn validate_array_items() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "regulations": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["regulations"]
        });
        assert!(validate_arguments(
            "t",
            &schema,
            &serde_json::json!({"regulations": ["rule one", "rule two"]})
        )
        .is_ok());
        assert!(validate_arguments(
            "t",
            &schema,
            &serde_json::json!({"regulations": [1, 2]})
        )
        .is_err());
    }

    #[test]
    fn context_caches_regulations() {
        let ctx = ctx();
        assert!(ctx.cached_regulations().is_empty());
        ctx.cache_regulations(vec![crate::chunk::RetrievedChunk {
            document: "regs.pdf".into(),
            page: 1,
            paragraph: None,
            title: None,
            content: "rule".into(),
            content_type: Default::default(),
            score: 0.8,
            selected: false,
        }]);
        assert_eq!(ctx.cached_regulations().len(), 1);
    }
}
