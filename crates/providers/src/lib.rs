//! LLM client implementations.
//!
//! One provider covers the vast majority of deployments: the
//! OpenAI-compatible `/chat/completions` endpoint. The provider owns
//! request timeouts, a small transport-retry budget, and 429 back-off;
//! callers see either a parsed response or an `LlmError`.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use lintel_config::LlmConfig;
use lintel_core::provider::LlmProvider;
use std::sync::Arc;

/// Build the configured provider.
pub fn build_from_config(config: &LlmConfig) -> Arc<dyn LlmProvider> {
    Arc::new(OpenAiCompatProvider::new(
        &config.base_url,
        config.api_key.clone().unwrap_or_default(),
    ))
}
