//! Bounded sub-LLM interface injected into tools at construction.
//!
//! Tools 2, 4, and 5 re-enter the model for analysis sub-prompts.
//! Giving them this narrow handle instead of the loop breaks the
//! orchestrator↔loop↔tool cycle: a tool can ask for one JSON-shaped
//! completion and nothing else.

use std::sync::Arc;

use lintel_config::LlmConfig;
use lintel_core::message::Message;
use lintel_core::provider::{LlmProvider, LlmRequest};

use crate::extract_json_block;

#[derive(Clone)]
pub struct SubLlm {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl SubLlm {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_answer_tokens.max(2000),
        }
    }

    /// One completion expected to yield a JSON object. Markdown fences
    /// around the payload are tolerated and stripped.
    pub async fn ask_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<serde_json::Value, String> {
        let request = LlmRequest {
            model: self.model.clone(),
            messages: vec![Message::system(system_prompt), Message::user(user_prompt)],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            tools: Vec::new(),
        };

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| e.to_string())?;

        let payload = extract_json_block(&response.message.content);
        serde_json::from_str(payload)
            .map_err(|e| format!("model did not return valid JSON: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLlm;

    fn sub_llm(reply: &str) -> SubLlm {
        SubLlm::new(
            Arc::new(ScriptedLlm::single(reply)),
            &LlmConfig::default(),
        )
    }

    #[tokio::test]
    async fn parses_bare_json() {
        let result = sub_llm(r#"{"compliant": true}"#)
            .ask_json("sys", "prompt")
            .await
            .unwrap();
        assert_eq!(result["compliant"], true);
    }

    #[tokio::test]
    async fn parses_fenced_json() {
        let result = sub_llm("```json\n{\"violations\": [\"too deep\"]}\n```")
            .ask_json("sys", "prompt")
            .await
            .unwrap();
        assert_eq!(result["violations"][0], "too deep");
    }

    #[tokio::test]
    async fn prose_reply_is_an_error() {
        let err = sub_llm("I think it looks fine.")
            .ask_json("sys", "prompt")
            .await
            .unwrap_err();
        assert!(err.contains("valid JSON"));
    }
}
