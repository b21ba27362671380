//! The single public entry point: `answer(question, drawing, mode, turns)`.
//!
//! Validates the request, classifies intent, dispatches to the
//! standard or agentic path, and owns the per-request deadline. On an
//! agentic failure the request is silently re-dispatched in standard
//! mode (with a trace marker) so every request yields a useful
//! response; recursion is impossible because the fallback never
//! re-enters the agentic path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lintel_config::AppConfig;
use lintel_core::answer::{AnswerResult, AnswerType, ToolCallRecord};
use lintel_core::drawing::Drawing;
use lintel_core::message::Message;
use lintel_core::provider::LlmProvider;
use lintel_core::tool::{RequestContext, ToolRegistry};
use lintel_retrieval::Retriever;
use lintel_summary::KnowledgeSummaryService;
use tracing::{info, warn};

use crate::fallback::is_refusal;
use crate::intent::{self, Intent};
use crate::loop_runner::{AgenticLoop, AgenticOutcome, LoopError, CAP_REACHED_MARKER};
use crate::prompts::PromptAssembler;
use crate::responder::StandardResponder;

/// Questions longer than this are rejected outright.
pub const MAX_QUESTION_CHARS: usize = 4_000;

/// Which path to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Standard,
    Agentic,
}

/// One request to `answer()`.
#[derive(Default)]
pub struct AnswerRequest {
    pub question: String,
    pub drawing: Option<Drawing>,
    /// RFC-3339 timestamp of the drawing's last edit.
    pub drawing_updated_at: Option<String>,
    pub mode: Mode,
    /// Prior conversation turns, oldest first.
    pub turns: Vec<Message>,
    pub top_k: Option<usize>,
}

/// Errors that surface to the HTTP layer instead of an AnswerResult.
#[derive(Debug)]
pub enum AnswerError {
    /// Empty question (HTTP 400).
    InvalidQuestion,
    /// Question over the length cap (HTTP 400).
    QuestionTooLong { length: usize, max: usize },
    /// Deadline elapsed (HTTP 504). The partial trace is preserved.
    Timeout { partial_trace: Vec<ToolCallRecord> },
}

impl std::fmt::Display for AnswerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuestion => write!(f, "question must not be empty"),
            Self::QuestionTooLong { length, max } => {
                write!(f, "question too long: {length} chars (max {max})")
            }
            Self::Timeout { .. } => write!(f, "request deadline elapsed"),
        }
    }
}

pub struct Orchestrator {
    assembler: PromptAssembler,
    responder: StandardResponder,
    agentic: AgenticLoop,
    registry: ToolRegistry,
    summary: Arc<KnowledgeSummaryService>,
    refusal_phrases: Vec<String>,
    deadline: Duration,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        retriever: Arc<dyn Retriever>,
        registry: ToolRegistry,
        summary: Arc<KnowledgeSummaryService>,
        config: &AppConfig,
    ) -> Self {
        let assembler = PromptAssembler::new(config.agent.context_token_budget);
        let responder = StandardResponder::new(
            provider.clone(),
            retriever,
            summary.clone(),
            &config.llm.model,
            config.llm.temperature,
            config.llm.max_answer_tokens,
            config.agent.refusal_phrases.clone(),
        );
        let agentic = AgenticLoop::new(
            provider,
            &config.llm.model,
            config.llm.temperature,
            config.agent.max_iterations,
        );

        Self {
            assembler,
            responder,
            agentic,
            registry,
            summary,
            refusal_phrases: config.agent.refusal_phrases.clone(),
            deadline: Duration::from_secs(config.agent.request_deadline_seconds),
        }
    }

    /// Answer one request. Every recoverable failure lands in a lower
    /// tier; only validation errors and the deadline surface here.
    pub async fn answer(&self, request: AnswerRequest) -> Result<AnswerResult, AnswerError> {
        let question = request.question.trim().to_string();
        if question.is_empty() {
            return Err(AnswerError::InvalidQuestion);
        }
        if question.chars().count() > MAX_QUESTION_CHARS {
            return Err(AnswerError::QuestionTooLong {
                length: question.chars().count(),
                max: MAX_QUESTION_CHARS,
            });
        }

        let intent = intent::classify(&question);
        let deadline = Instant::now() + self.deadline;

        let ctx = RequestContext::new(question, request.drawing)
            .with_drawing_updated_at(request.drawing_updated_at);

        info!(
            ?intent,
            mode = ?request.mode,
            has_drawing = ctx.has_drawing(),
            "answering request"
        );

        // The Tier-2 shortcut applies in both modes: a drawing-only
        // question with a drawing (even an empty one) never needs
        // retrieval or tools.
        let agentic_applies = request.mode == Mode::Agentic
            && !(intent == Intent::DrawingOnly && ctx.drawing.is_some());

        if agentic_applies {
            match self
                .agentic
                .run(&ctx, &self.registry, &self.assembler, deadline)
                .await
            {
                Ok(outcome) => return Ok(self.finalize_agentic(&ctx, outcome)),
                Err(LoopError::Timeout { records }) => {
                    return Err(AnswerError::Timeout { partial_trace: records });
                }
                Err(LoopError::Failure(cause)) => {
                    warn!(%cause, "agentic path failed, falling back to standard mode");
                    let marker = format!("agentic fallback: {cause}");
                    let mut result = self
                        .standard(&ctx, intent, &request.turns, request.top_k, deadline)
                        .await?;
                    result.trace_markers.push(marker);
                    return Ok(result);
                }
            }
        }

        self.standard(&ctx, intent, &request.turns, request.top_k, deadline)
            .await
    }

    async fn standard(
        &self,
        ctx: &RequestContext,
        intent: Intent,
        turns: &[Message],
        top_k: Option<usize>,
        deadline: Instant,
    ) -> Result<AnswerResult, AnswerError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        tokio::time::timeout(
            remaining,
            self.responder
                .respond(&self.assembler, ctx, intent, turns, top_k),
        )
        .await
        .map_err(|_| AnswerError::Timeout {
            partial_trace: Vec::new(),
        })
    }

    /// Turn a loop outcome into the external result: attach cited
    /// sources from the regulations cache, classify the answer, apply
    /// refusal detection, stamp trace markers.
    fn finalize_agentic(&self, ctx: &RequestContext, outcome: AgenticOutcome) -> AnswerResult {
        let AgenticOutcome {
            answer,
            records,
            iteration_cap_reached,
        } = outcome;

        let mut trace_markers = Vec::new();
        if iteration_cap_reached {
            trace_markers.push(CAP_REACHED_MARKER.to_string());
        }

        if is_refusal(&answer, &self.refusal_phrases) {
            info!("agentic answer matched a refusal phrase, demoting to knowledge summary");
            let mut result = self.responder.no_answer(trace_markers);
            result.reasoning_steps = records;
            return result;
        }

        let sources = ctx.cached_regulations();
        let drawing_used = ctx.has_drawing();

        let answer_type = match (!sources.is_empty(), drawing_used) {
            (true, true) => AnswerType::Hybrid,
            (true, false) => AnswerType::Pdf,
            (false, true) => AnswerType::Drawing,
            (false, false) => AnswerType::Pdf,
        };

        AnswerResult {
            answer,
            answer_type,
            sources,
            drawing_context_used: drawing_used,
            reasoning_steps: records,
            knowledge_summary: None,
            trace_markers,
        }
    }

    /// The current knowledge summary (for `GET /knowledge-summary`).
    pub fn knowledge_summary(&self) -> lintel_core::answer::KnowledgeSummary {
        self.summary.current()
    }
}
