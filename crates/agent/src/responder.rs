//! The standard (non-agentic) path: retrieve → assemble → complete →
//! fallback ladder.
//!
//! Tier decisions:
//! 1. Hybrid — chunks and drawing both present, non-refusal answer
//! 2. Drawing-only — no usable chunks (or drawing-only intent) but a
//!    drawing is present
//! 3. Regulations-only — chunks but no drawing
//! 4. Knowledge summary — nothing usable, or the model refused
//!
//! Retrieval and LLM failures are recovered here by demoting tiers;
//! nothing escapes as an error.

use std::sync::Arc;

use lintel_core::answer::{AnswerResult, AnswerType};
use lintel_core::chunk::RetrievedChunk;
use lintel_core::message::Message;
use lintel_core::provider::{LlmProvider, LlmRequest};
use lintel_core::tool::RequestContext;
use lintel_retrieval::Retriever;
use lintel_summary::KnowledgeSummaryService;
use tracing::{info, warn};

use crate::fallback::{apply_source_selection, is_refusal};
use crate::intent::{self, Intent};
use crate::prompts::{PromptAssembler, PromptInput};

/// Polite Tier-4 answer text.
const NO_ANSWER_TEXT: &str =
    "I couldn't find relevant information to answer your question. \
     Please try rephrasing or asking a different question.";

pub struct StandardResponder {
    provider: Arc<dyn LlmProvider>,
    retriever: Arc<dyn Retriever>,
    summary: Arc<KnowledgeSummaryService>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    refusal_phrases: Vec<String>,
}

impl StandardResponder {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        retriever: Arc<dyn Retriever>,
        summary: Arc<KnowledgeSummaryService>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
        refusal_phrases: Vec<String>,
    ) -> Self {
        Self {
            provider,
            retriever,
            summary,
            model: model.into(),
            temperature,
            max_tokens,
            refusal_phrases,
        }
    }

    /// Run the standard path for one request.
    pub async fn respond(
        &self,
        assembler: &PromptAssembler,
        ctx: &RequestContext,
        intent: Intent,
        history: &[Message],
        top_k: Option<usize>,
    ) -> AnswerResult {
        // Tier-2 shortcut: drawing-only intent with a drawing present
        // bypasses retrieval entirely. An empty drawing still counts —
        // the template then reports that no geometry was provided.
        if intent == Intent::DrawingOnly && ctx.drawing.is_some() {
            return self.drawing_only(assembler, ctx, history, Vec::new()).await;
        }

        let chunks = match self.retriever.retrieve(&ctx.question, top_k).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(error = %e, "retrieval failed, demoting");
                let marker = format!("retrieval unavailable: {e}");
                if ctx.has_drawing() {
                    return self
                        .drawing_only(assembler, ctx, history, vec![marker])
                        .await;
                }
                return self.no_answer(vec![marker]);
            }
        };

        if chunks.is_empty() {
            info!("no chunks above threshold");
            if ctx.has_drawing() {
                return self.drawing_only(assembler, ctx, history, Vec::new()).await;
            }
            return self.no_answer(Vec::new());
        }

        self.grounded(assembler, ctx, intent, history, chunks).await
    }

    /// Tiers 1 and 3: answer from retrieved chunks, optionally with
    /// the drawing alongside.
    async fn grounded(
        &self,
        assembler: &PromptAssembler,
        ctx: &RequestContext,
        intent: Intent,
        history: &[Message],
        mut chunks: Vec<RetrievedChunk>,
    ) -> AnswerResult {
        let input = PromptInput {
            question: &ctx.question,
            chunks: &chunks,
            drawing: ctx.drawing.as_ref(),
            drawing_updated_at: ctx.drawing_updated_at.as_deref(),
            history,
        };

        let messages = if intent == Intent::ComplianceAdjust && ctx.has_drawing() {
            assembler.compliance_with_adjustment(&input)
        } else {
            let boost = ctx.has_drawing() && intent::is_compliance_question(&ctx.question);
            assembler.standard_qa(&input, boost)
        };

        let raw = match self.complete(messages).await {
            Ok(text) => text,
            Err(marker) => {
                if ctx.has_drawing() {
                    return self.drawing_only(assembler, ctx, history, vec![marker]).await;
                }
                return self.no_answer(vec![marker]);
            }
        };

        if is_refusal(&raw, &self.refusal_phrases) {
            info!("model refused grounded answer, demoting to knowledge summary");
            return self.no_answer(Vec::new());
        }

        let answer = apply_source_selection(&raw, &mut chunks);
        let drawing_used = ctx.has_drawing();

        AnswerResult {
            answer,
            answer_type: if drawing_used {
                AnswerType::Hybrid
            } else {
                AnswerType::Pdf
            },
            sources: chunks,
            drawing_context_used: drawing_used,
            reasoning_steps: Vec::new(),
            knowledge_summary: None,
            trace_markers: Vec::new(),
        }
    }

    /// Tier 2: answer from the drawing alone.
    async fn drawing_only(
        &self,
        assembler: &PromptAssembler,
        ctx: &RequestContext,
        history: &[Message],
        trace_markers: Vec<String>,
    ) -> AnswerResult {
        let input = PromptInput {
            question: &ctx.question,
            chunks: &[],
            drawing: ctx.drawing.as_ref(),
            drawing_updated_at: ctx.drawing_updated_at.as_deref(),
            history,
        };
        let messages = assembler.drawing_only(&input);

        let answer = match self.complete(messages).await {
            Ok(text) => text,
            Err(marker) => {
                let mut markers = trace_markers;
                markers.push(marker);
                return self.no_answer(markers);
            }
        };

        if is_refusal(&answer, &self.refusal_phrases) {
            return self.no_answer(trace_markers);
        }

        AnswerResult {
            answer,
            answer_type: AnswerType::Drawing,
            sources: Vec::new(),
            drawing_context_used: ctx.has_drawing(),
            reasoning_steps: Vec::new(),
            knowledge_summary: None,
            trace_markers,
        }
    }

    /// Tier 4: the no-answer outcome with the current knowledge summary.
    pub fn no_answer(&self, trace_markers: Vec<String>) -> AnswerResult {
        let mut result = AnswerResult::no_answer(NO_ANSWER_TEXT, self.summary.current());
        result.trace_markers = trace_markers;
        result
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<String, String> {
        let request = LlmRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            tools: Vec::new(),
        };
        match self.provider.complete(request).await {
            Ok(response) => Ok(response.message.content),
            Err(e) => {
                warn!(error = %e, "LLM call failed in standard path");
                Err(format!("llm error: {e}"))
            }
        }
    }
}
