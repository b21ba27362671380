//! Configuration loading, validation, and defaults for lintel.
//!
//! Loads configuration from an optional TOML file with environment
//! variable overrides (`LINTEL_*`). All settings are validated at
//! startup; a service with invalid configuration refuses to serve.
//! Configuration is read-only for the process lifetime.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// LLM endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// API key. Required to serve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    /// Max tokens for answer generation.
    #[serde(default = "default_answer_tokens")]
    pub max_answer_tokens: u32,

    /// Max tokens for knowledge-summary generation.
    #[serde(default = "default_summary_tokens")]
    pub max_summary_tokens: u32,
}

/// Vector-index backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_retrieval_base_url")]
    pub base_url: String,

    /// Index name queried for regulation chunks.
    #[serde(default = "default_retrieval_index")]
    pub index: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_top_k")]
    pub top_k_default: usize,

    /// Hits scoring below this are discarded.
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,
}

/// Agentic loop and prompt-budget settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Iteration cap for the agentic loop.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Per-request deadline in seconds.
    #[serde(default = "default_deadline_seconds")]
    pub request_deadline_seconds: u64,

    /// Token budget for retrieved context in assembled prompts.
    #[serde(default = "default_context_budget")]
    pub context_token_budget: usize,

    /// Canonical refusal phrases. This set is a contract — matching is
    /// exact-substring and the list must not be extended silently.
    #[serde(default = "default_refusal_phrases")]
    pub refusal_phrases: Vec<String>,
}

/// Knowledge-summary artifact settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Path of the serialized artifact.
    #[serde(default = "default_summary_path")]
    pub artifact_path: String,

    /// How many chunks to sample from the index at generation time.
    #[serde(default = "default_sample_chunks")]
    pub sample_chunks: usize,
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_model() -> String {
    "gpt-4o-mini".into()
}
fn default_llm_temperature() -> f32 {
    0.3
}
fn default_answer_tokens() -> u32 {
    500
}
fn default_summary_tokens() -> u32 {
    1500
}
fn default_retrieval_base_url() -> String {
    "http://localhost:9200".into()
}
fn default_retrieval_index() -> String {
    "regulations-pdf-index".into()
}
fn default_top_k() -> usize {
    5
}
fn default_relevance_threshold() -> f32 {
    0.7
}
fn default_max_iterations() -> u32 {
    10
}
fn default_deadline_seconds() -> u64 {
    120
}
fn default_context_budget() -> usize {
    12_000
}
fn default_refusal_phrases() -> Vec<String> {
    [
        "i cannot answer",
        "i can't answer",
        "cannot answer this question",
        "not enough information",
        "insufficient information",
        "doesn't contain",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_summary_path() -> String {
    "data/knowledge_summary.json".into()
}
fn default_sample_chunks() -> usize {
    30
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            api_key: None,
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            max_answer_tokens: default_answer_tokens(),
            max_summary_tokens: default_summary_tokens(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            base_url: default_retrieval_base_url(),
            index: default_retrieval_index(),
            api_key: None,
            top_k_default: default_top_k(),
            relevance_threshold: default_relevance_threshold(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            request_deadline_seconds: default_deadline_seconds(),
            context_token_budget: default_context_budget(),
            refusal_phrases: default_refusal_phrases(),
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            artifact_path: default_summary_path(),
            sample_chunks: default_sample_chunks(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Redact secrets in Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("llm.base_url", &self.llm.base_url)
            .field("llm.api_key", &redact(&self.llm.api_key))
            .field("llm.model", &self.llm.model)
            .field("retrieval.base_url", &self.retrieval.base_url)
            .field("retrieval.api_key", &redact(&self.retrieval.api_key))
            .field("agent", &self.agent)
            .field("summary", &self.summary)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// A fatal configuration problem. The service must refuse to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    /// Load from an optional TOML file, then apply `LINTEL_*`
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)
                    .map_err(|e| ConfigError(format!("cannot read {}: {e}", p.display())))?;
                toml::from_str(&raw)
                    .map_err(|e| ConfigError(format!("cannot parse {}: {e}", p.display())))?
            }
            _ => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        let string = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        if let Some(v) = string("LINTEL_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = string("LINTEL_LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = string("LINTEL_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = string("LINTEL_LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.llm.temperature = v;
        }
        if let Some(v) = string("LINTEL_RETRIEVAL_BASE_URL") {
            self.retrieval.base_url = v;
        }
        if let Some(v) = string("LINTEL_RETRIEVAL_API_KEY") {
            self.retrieval.api_key = Some(v);
        }
        if let Some(v) = string("LINTEL_RETRIEVAL_INDEX") {
            self.retrieval.index = v;
        }
        if let Some(v) = string("LINTEL_RELEVANCE_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.retrieval.relevance_threshold = v;
        }
        if let Some(v) = string("LINTEL_MAX_ITERATIONS").and_then(|v| v.parse().ok()) {
            self.agent.max_iterations = v;
        }
        if let Some(v) = string("LINTEL_REQUEST_DEADLINE_SECONDS").and_then(|v| v.parse().ok()) {
            self.agent.request_deadline_seconds = v;
        }
        if let Some(v) = string("LINTEL_SUMMARY_PATH") {
            self.summary.artifact_path = v;
        }
        if let Some(v) = string("LINTEL_GATEWAY_HOST") {
            self.gateway.host = v;
        }
        if let Some(v) = string("LINTEL_GATEWAY_PORT").and_then(|v| v.parse().ok()) {
            self.gateway.port = v;
        }
    }

    /// Validate all settings. Called once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError("llm.api_key is required".into()));
        }
        if self.llm.model.is_empty() {
            return Err(ConfigError("llm.model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError("llm.temperature must be in [0, 2]".into()));
        }
        if !(0.0..=1.0).contains(&self.retrieval.relevance_threshold) {
            return Err(ConfigError(
                "retrieval.relevance_threshold must be in [0, 1]".into(),
            ));
        }
        if self.retrieval.top_k_default == 0 || self.retrieval.top_k_default > 20 {
            return Err(ConfigError(
                "retrieval.top_k_default must be in [1, 20]".into(),
            ));
        }
        if self.agent.max_iterations == 0 {
            return Err(ConfigError("agent.max_iterations must be at least 1".into()));
        }
        if self.agent.request_deadline_seconds == 0 {
            return Err(ConfigError(
                "agent.request_deadline_seconds must be at least 1".into(),
            ));
        }
        if self.agent.refusal_phrases.is_empty() {
            return Err(ConfigError("agent.refusal_phrases must not be empty".into()));
        }
        if self.summary.artifact_path.is_empty() {
            return Err(ConfigError("summary.artifact_path must not be empty".into()));
        }
        Ok(())
    }
}
