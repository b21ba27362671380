//! OpenAI-compatible LLM client.
//!
//! Works with any endpoint exposing the `/chat/completions` API,
//! including proxies in front of other vendors.
//!
//! Failure policy:
//! - request timeout 60 s, owned by the HTTP client
//! - transport failures and 5xx: up to 2 retries with 500 ms backoff
//! - HTTP 429: sleeps for `Retry-After` when present, otherwise 2 s
//! - other 4xx: surfaced immediately as `LlmError`, never retried

use async_trait::async_trait;
use lintel_core::error::LlmError;
use lintel_core::message::{Message, MessageToolCall, Role};
use lintel_core::provider::{LlmProvider, LlmRequest, LlmResponse, ToolDefinition, Usage};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TRANSPORT_RETRIES: u32 = 2;
const TRANSPORT_BACKOFF: Duration = Duration::from_millis(500);
const RATE_LIMIT_FALLBACK: Duration = Duration::from_secs(2);

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Convert our messages to the chat-completions wire format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                    Role::Tool => "tool".into(),
                },
                content: Some(m.content.clone()),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn build_body(request: &LlmRequest, with_tools: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if with_tools && !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
            body["tool_choice"] = serde_json::json!("auto");
        }
        body
    }

    /// One round-trip plus the retry/back-off policy described above.
    async fn send(&self, body: &serde_json::Value) -> Result<ApiResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut transport_failures = 0u32;
        let mut rate_limit_waits = 0u32;

        loop {
            let result = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            let response = match result {
                Ok(r) => r,
                Err(e) => {
                    let error = if e.is_timeout() {
                        LlmError::Timeout(e.to_string())
                    } else {
                        LlmError::Network(e.to_string())
                    };
                    if transport_failures >= TRANSPORT_RETRIES {
                        return Err(error);
                    }
                    transport_failures += 1;
                    warn!(attempt = transport_failures, error = %error, "transport failure, backing off");
                    tokio::time::sleep(TRANSPORT_BACKOFF).await;
                    continue;
                }
            };

            let status = response.status().as_u16();

            if status == 429 {
                if rate_limit_waits >= TRANSPORT_RETRIES {
                    return Err(LlmError::RateLimited {
                        retry_after_secs: RATE_LIMIT_FALLBACK.as_secs(),
                    });
                }
                let wait = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(RATE_LIMIT_FALLBACK);
                rate_limit_waits += 1;
                warn!(wait_secs = wait.as_secs(), "rate limited, sleeping");
                tokio::time::sleep(wait).await;
                continue;
            }

            if status == 401 || status == 403 {
                return Err(LlmError::AuthenticationFailed(format!(
                    "endpoint returned {status}"
                )));
            }

            if (400..500).contains(&status) {
                let detail = response.text().await.unwrap_or_default();
                return Err(LlmError::ApiError {
                    status_code: status,
                    message: detail,
                });
            }

            if status >= 500 {
                let detail = response.text().await.unwrap_or_default();
                let error = LlmError::ApiError {
                    status_code: status,
                    message: detail,
                };
                if transport_failures >= TRANSPORT_RETRIES {
                    return Err(error);
                }
                transport_failures += 1;
                warn!(status, attempt = transport_failures, "server error, backing off");
                tokio::time::sleep(TRANSPORT_BACKOFF).await;
                continue;
            }

            return response
                .json()
                .await
                .map_err(|e| LlmError::MalformedResponse(e.to_string()));
        }
    }

    fn parse_response(api: ApiResponse) -> Result<LlmResponse, LlmError> {
        let choice = api
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::MalformedResponse("no choices in response".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| MessageToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect::<Vec<_>>();

        let mut message = Message::assistant(choice.message.content.unwrap_or_default());
        message.tool_calls = tool_calls;

        let usage = api.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LlmResponse {
            message,
            usage,
            model: api.model,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        debug!(model = %request.model, messages = request.messages.len(), "completion request");
        let body = Self::build_body(&request, false);
        let api = self.send(&body).await?;
        Self::parse_response(api)
    }

    async fn complete_with_tools(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "tool-enabled completion request"
        );
        let body = Self::build_body(&request, true);
        let api = self.send(&body).await?;
        Self::parse_response(api)
    }
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_conversion_roles() {
        let messages = vec![
            Message::system("sys"),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::tool_result("call_1", "{}"),
        ];
        let api = OpenAiCompatProvider::to_api_messages(&messages);
        let roles: Vec<&str> = api.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "user", "assistant", "tool"]);
        assert_eq!(api[3].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn message_conversion_with_tool_calls() {
        let mut msg = Message::assistant("");
        msg.tool_calls = vec![MessageToolCall {
            id: "call_9".into(),
            name: "retrieve_regulations".into(),
            arguments: r#"{"query":"extension depth"}"#.into(),
        }];
        let api = OpenAiCompatProvider::to_api_messages(&[msg]);
        let calls = api[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "retrieve_regulations");
        assert_eq!(calls[0].r#type, "function");
    }

    #[test]
    fn body_includes_tools_only_when_asked() {
        let request = LlmRequest {
            model: "m".into(),
            messages: vec![Message::user("q")],
            temperature: 0.3,
            max_tokens: Some(500),
            tools: vec![ToolDefinition {
                name: "verify_compliance".into(),
                description: "d".into(),
                parameters: serde_json::json!({"type": "object"}),
            }],
        };

        let plain = OpenAiCompatProvider::build_body(&request, false);
        assert!(plain.get("tools").is_none());

        let tooled = OpenAiCompatProvider::build_body(&request, true);
        assert_eq!(tooled["tool_choice"], "auto");
        assert_eq!(tooled["tools"][0]["function"]["name"], "verify_compliance");
        assert_eq!(tooled["max_tokens"], 500);
    }

    #[test]
    fn parse_text_response() {
        let api: ApiResponse = serde_json::from_str(
            r#"{
                "model": "gpt-4o-mini",
                "choices": [{"message": {"content": "The limit is 6 m."}}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            }"#,
        )
        .unwrap();
        let response = OpenAiCompatProvider::parse_response(api).unwrap();
        assert_eq!(response.message.content, "The limit is 6 m.");
        assert!(!response.has_tool_calls());
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn parse_tool_call_response() {
        let api: ApiResponse = serde_json::from_str(
            r#"{
                "model": "gpt-4o-mini",
                "choices": [{"message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "calculate_drawing_dimensions",
                                     "arguments": "{\"dimension_type\":\"plot_area\"}"}
                    }]
                }}]
            }"#,
        )
        .unwrap();
        let response = OpenAiCompatProvider::parse_response(api).unwrap();
        assert!(response.has_tool_calls());
        assert_eq!(response.message.tool_calls[0].name, "calculate_drawing_dimensions");
        let args: serde_json::Value =
            serde_json::from_str(&response.message.tool_calls[0].arguments).unwrap();
        assert_eq!(args["dimension_type"], "plot_area");
    }

    #[test]
    fn parse_empty_choices_is_malformed() {
        let api: ApiResponse =
            serde_json::from_str(r#"{"model": "m", "choices": []}"#).unwrap();
        let err = OpenAiCompatProvider::parse_response(api).unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("https://api.example.com/v1/", "sk-x");
        assert_eq!(provider.base_url, "https://api.example.com/v1");
    }
}
