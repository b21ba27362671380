//! LLM provider trait — the abstraction over the model endpoint.
//!
//! A provider knows how to send a conversation to an LLM and get a
//! response back, either as a plain completion or with tool schemas
//! exposed so the model can emit tool-call intents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::message::Message;

/// A single completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// The model to use.
    pub model: String,

    /// The conversation messages.
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tool schemas the model may call. Empty for plain completions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.3
}

/// A tool definition advertised to the LLM.
///
/// The name appears verbatim in the function-call protocol; parameter
/// schemas use standard JSON-Schema keywords (`type`, `properties`,
/// `required`, `enum`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A complete response from the provider.
///
/// Tool-call intents, when present, are embedded in
/// `message.tool_calls`; per the wire contract they take precedence
/// over any accompanying text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub message: Message,
    pub usage: Option<Usage>,
    /// Which model actually responded.
    pub model: String,
}

impl LlmResponse {
    /// True when the response carries tool-call intents.
    pub fn has_tool_calls(&self) -> bool {
        !self.message.tool_calls.is_empty()
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The provider trait. The agentic loop, the standard responder, and
/// the sub-LLM tools all call through this without knowing which
/// endpoint is configured.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// A human-readable name for this provider.
    fn name(&self) -> &str;

    /// Plain chat completion; any tool schemas in the request are ignored.
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Completion with the request's tool schemas exposed. Returns
    /// either a final assistant message or tool-call intents.
    async fn complete_with_tools(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;
}
