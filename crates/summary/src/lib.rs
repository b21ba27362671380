//! Knowledge-summary artifact service.
//!
//! The artifact — a corpus overview, topic tags, and suggested
//! questions — is regenerated once per (re)index and served on Tier-4
//! no-answer responses. Lifecycle invariant: the artifact is deleted
//! before any index content changes and regenerated as the final
//! indexing step, so a reader arriving mid-rebuild sees the hard-coded
//! fallback rather than stale suggestions.
//!
//! Writes are atomic (temp file + rename). The ingestion collaborator
//! serializes rebuilds; this service never runs two at once.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use lintel_config::{LlmConfig, SummaryConfig};
use lintel_core::answer::KnowledgeSummary;
use lintel_core::error::Error;
use lintel_core::message::Message;
use lintel_core::provider::{LlmProvider, LlmRequest};
use tracing::{info, warn};

const GENERATION_SYSTEM_PROMPT: &str =
    "You summarize a corpus of building-regulation documents. Always respond with valid JSON.";

/// Drawing-oriented prompts that must always be present so Tier-4
/// responses guide users toward the hybrid capability.
const DRAWING_QUESTIONS: [&str; 3] = [
    "Describe my drawing",
    "What are the dimensions of my building drawing?",
    "Is my drawing compliant with the extension depth limits?",
];

pub struct KnowledgeSummaryService {
    artifact_path: PathBuf,
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl KnowledgeSummaryService {
    pub fn new(
        config: &SummaryConfig,
        llm_config: &LlmConfig,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            artifact_path: PathBuf::from(&config.artifact_path),
            provider,
            model: llm_config.model.clone(),
            temperature: llm_config.temperature,
            max_tokens: llm_config.max_summary_tokens,
        }
    }

    /// The current artifact, or the hard-coded fallback while absent.
    /// Never fails.
    pub fn current(&self) -> KnowledgeSummary {
        match std::fs::read_to_string(&self.artifact_path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(error = %e, "knowledge summary artifact unreadable, serving fallback");
                    Self::fallback()
                }
            },
            Err(_) => Self::fallback(),
        }
    }

    /// The stable fallback object served while no artifact exists.
    pub fn fallback() -> KnowledgeSummary {
        KnowledgeSummary {
            overview: "This assistant answers questions about building regulations \
                       and can analyze your building drawing against them."
                .into(),
            topics: vec![
                "extensions".into(),
                "building height".into(),
                "plot coverage".into(),
                "planning permission".into(),
            ],
            suggested_questions: DRAWING_QUESTIONS.iter().map(|q| q.to_string()).collect(),
            generated_at: Utc::now(),
        }
    }

    /// Delete the artifact. MUST be called before any index content
    /// changes.
    pub fn begin_rebuild(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.artifact_path) {
            Ok(()) => {
                info!(path = %self.artifact_path.display(), "knowledge summary artifact deleted for rebuild");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Generate a fresh artifact from sampled chunks and persist it
    /// atomically. Called as the final indexing step.
    pub async fn finish_rebuild(
        &self,
        sample_chunks: &[String],
    ) -> Result<KnowledgeSummary, Error> {
        let samples = sample_chunks
            .iter()
            .enumerate()
            .map(|(i, text)| format!("[{}] {}", i + 1, text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Below are sampled chunks from an indexed corpus of building-regulation \
             documents.\n\n{samples}\n\n\
             Produce:\n\
             1. A short overview of what the corpus covers (2-3 sentences)\n\
             2. A list of topic tags\n\
             3. A list of suggested questions a user might ask\n\n\
             Format as JSON:\n\
             {{\n    \"overview\": \"...\",\n    \
             \"topics\": [\"topic 1\"],\n    \
             \"suggested_questions\": [\"question 1\"]\n}}"
        );

        let request = LlmRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(GENERATION_SYSTEM_PROMPT),
                Message::user(prompt),
            ],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            tools: Vec::new(),
        };

        let response = self.provider.complete(request).await?;
        let payload = strip_fence(&response.message.content);
        let parsed: serde_json::Value = serde_json::from_str(payload)?;

        let mut suggested: Vec<String> = parsed["suggested_questions"]
            .as_array()
            .map(|qs| {
                qs.iter()
                    .filter_map(|q| q.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        // Tier-4 responses must always point at the drawing capability.
        for q in DRAWING_QUESTIONS {
            if !suggested.iter().any(|s| s == q) {
                suggested.push(q.to_string());
            }
        }

        let summary = KnowledgeSummary {
            overview: parsed["overview"].as_str().unwrap_or_default().to_string(),
            topics: parsed["topics"]
                .as_array()
                .map(|ts| {
                    ts.iter()
                        .filter_map(|t| t.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default(),
            suggested_questions: suggested,
            generated_at: Utc::now(),
        };

        self.write_atomic(&summary)?;
        info!(path = %self.artifact_path.display(), "knowledge summary regenerated");
        Ok(summary)
    }

    fn write_atomic(&self, summary: &KnowledgeSummary) -> Result<(), Error> {
        if let Some(parent) = self.artifact_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Internal(format!("cannot create {}: {e}", parent.display())))?;
        }
        let tmp = self.artifact_path.with_extension("json.tmp");
        let raw = serde_json::to_string_pretty(summary)?;
        std::fs::write(&tmp, raw)
            .map_err(|e| Error::Internal(format!("cannot write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.artifact_path)
            .map_err(|e| Error::Internal(format!("cannot rename artifact: {e}")))?;
        Ok(())
    }
}

fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    for fence in ["```json", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let after = &trimmed[start + fence.len()..];
            if let Some(end) = after.find("```") {
                return after[..end].trim();
            }
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lintel_core::error::LlmError;
    use lintel_core::provider::LlmResponse;

    struct FixedLlm(String);

    #[async_trait]
    impl LlmProvider for FixedLlm {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn complete(&self, _r: LlmRequest) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse {
                message: Message::assistant(self.0.clone()),
                usage: None,
                model: "fixed".into(),
            })
        }
        async fn complete_with_tools(&self, r: LlmRequest) -> Result<LlmResponse, LlmError> {
            self.complete(r).await
        }
    }

    fn service(dir: &std::path::Path, reply: &str) -> KnowledgeSummaryService {
        let config = SummaryConfig {
            artifact_path: dir.join("knowledge_summary.json").display().to_string(),
            sample_chunks: 30,
        };
        KnowledgeSummaryService::new(
            &config,
            &LlmConfig::default(),
            Arc::new(FixedLlm(reply.to_string())),
        )
    }

    #[test]
    fn fallback_has_drawing_questions() {
        let fallback = KnowledgeSummaryService::fallback();
        assert!(fallback.suggested_questions.len() >= 3);
        assert!(fallback
            .suggested_questions
            .iter()
            .any(|q| q.to_lowercase().contains("drawing")));
    }

    #[test]
    fn current_serves_fallback_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), "{}");
        let summary = service.current();
        assert!(!summary.overview.is_empty());
    }

    #[tokio::test]
    async fn rebuild_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(
            dir.path(),
            r#"{"overview": "Covers residential extensions.",
                "topics": ["extensions"],
                "suggested_questions": ["What is the depth limit?"]}"#,
        );

        service.begin_rebuild().unwrap();
        let generated = service
            .finish_rebuild(&["chunk one".into(), "chunk two".into()])
            .await
            .unwrap();

        assert_eq!(generated.overview, "Covers residential extensions.");
        // Drawing-oriented prompts are always merged in.
        assert!(generated.suggested_questions.len() >= 4);

        let reloaded = service.current();
        assert_eq!(reloaded.overview, generated.overview);
        assert_eq!(reloaded.generated_at, generated.generated_at);
    }

    #[tokio::test]
    async fn begin_rebuild_deletes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(
            dir.path(),
            r#"{"overview": "o", "topics": [], "suggested_questions": []}"#,
        );
        service.finish_rebuild(&[]).await.unwrap();
        assert_eq!(service.current().overview, "o");

        service.begin_rebuild().unwrap();
        // Mid-rebuild readers see the fallback, never stale content.
        assert_ne!(service.current().overview, "o");
    }

    #[tokio::test]
    async fn fenced_generation_output_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(
            dir.path(),
            "```json\n{\"overview\": \"fenced\", \"topics\": [], \"suggested_questions\": []}\n```",
        );
        let generated = service.finish_rebuild(&[]).await.unwrap();
        assert_eq!(generated.overview, "fenced");
    }
}
