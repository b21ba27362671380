//! The agentic reasoning loop.
//!
//! Drives up to `max_iterations` rounds of
//! {LLM → tool calls → tool results → LLM}. Tool calls within one LLM
//! response execute serially in emission order; iteration N+1 starts
//! only after N's results are appended. Every tool call yields a
//! result turn, including argument-validation failures, which are fed
//! back to the model for another attempt.
//!
//! The loop checks the request deadline between iterations and
//! preserves the partial trace on timeout. Any error escaping the
//! provider or dispatcher handlers surfaces as a loop failure for the
//! orchestrator's silent fallback to standard mode.

use std::sync::Arc;
use std::time::Instant;

use lintel_core::answer::ToolCallRecord;
use lintel_core::message::{Conversation, Message};
use lintel_core::provider::{LlmProvider, LlmRequest};
use lintel_core::tool::{RequestContext, ToolCall, ToolOutcome, ToolRegistry};
use tracing::{debug, info, warn};

use crate::prompts::PromptAssembler;

/// Answer text used when the model returns neither text nor tool calls.
const EMPTY_RESPONSE_ANSWER: &str =
    "I was unable to produce an answer to your question.";

/// Answer text used when the iteration cap is reached.
const CAP_REACHED_ANSWER: &str =
    "I've analyzed your question but need more iterations to provide a complete \
     answer. Please try rephrasing or breaking down your question.";

/// Trace marker stamped when the cap is reached.
pub const CAP_REACHED_MARKER: &str = "iteration cap reached";

/// What the loop produced.
pub struct AgenticOutcome {
    pub answer: String,
    pub records: Vec<ToolCallRecord>,
    pub iteration_cap_reached: bool,
}

/// Why the loop stopped without an outcome.
#[derive(Debug)]
pub enum LoopError {
    /// Request deadline elapsed; the partial trace is preserved.
    Timeout { records: Vec<ToolCallRecord> },
    /// Unhandled failure; the orchestrator falls back to standard mode.
    Failure(String),
}

pub struct AgenticLoop {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_iterations: u32,
}

impl AgenticLoop {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        temperature: f32,
        max_iterations: u32,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            max_iterations,
        }
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Run the loop for one request.
    pub async fn run(
        &self,
        ctx: &RequestContext,
        registry: &ToolRegistry,
        assembler: &PromptAssembler,
        deadline: Instant,
    ) -> Result<AgenticOutcome, LoopError> {
        let tool_definitions = registry.definitions();

        let mut conversation = Conversation::new();
        conversation.push(Message::system(assembler.agentic_system(&tool_definitions)));
        conversation.push(Message::user(assembler.agentic_user(
            &ctx.question,
            ctx.drawing.as_ref(),
            ctx.drawing_updated_at.as_deref(),
        )));

        let mut records: Vec<ToolCallRecord> = Vec::new();
        let mut step: u32 = 0;

        info!(
            question_len = ctx.question.len(),
            has_drawing = ctx.has_drawing(),
            max_iterations = self.max_iterations,
            "agentic workflow started"
        );

        for iteration in 1..=self.max_iterations {
            if Instant::now() >= deadline {
                warn!(iteration, "request deadline elapsed, abandoning loop");
                return Err(LoopError::Timeout { records });
            }

            debug!(iteration, turns = conversation.len(), "agentic iteration");

            let request = LlmRequest {
                model: self.model.clone(),
                messages: conversation.messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };

            let response = self
                .provider
                .complete_with_tools(request)
                .await
                .map_err(|e| LoopError::Failure(e.to_string()))?;

            if response.has_tool_calls() {
                let tool_calls = response.message.tool_calls.clone();
                conversation.push(response.message);

                // Serial execution in emission order keeps the trace
                // totally ordered.
                for tc in &tool_calls {
                    step += 1;
                    let started = Instant::now();

                    let (arguments, outcome) =
                        match serde_json::from_str::<serde_json::Value>(&tc.arguments) {
                            Ok(args) => {
                                let call = ToolCall {
                                    id: tc.id.clone(),
                                    name: tc.name.clone(),
                                    arguments: args.clone(),
                                };
                                let outcome = match registry.execute(ctx, &call).await {
                                    Ok(outcome) => outcome,
                                    Err(e) => {
                                        warn!(tool = %tc.name, error = %e, "tool dispatch failed");
                                        ToolOutcome::error(e)
                                    }
                                };
                                (args, outcome)
                            }
                            Err(e) => (
                                serde_json::json!({ "raw": tc.arguments }),
                                ToolOutcome::error(format!("invalid tool arguments: {e}")),
                            ),
                        };

                    let duration_ms = started.elapsed().as_millis() as u64;
                    debug!(
                        tool = %tc.name,
                        success = outcome.success,
                        duration_ms,
                        "tool call executed"
                    );

                    conversation.push(Message::tool_result(
                        &tc.id,
                        outcome.payload.to_string(),
                    ));
                    records.push(ToolCallRecord {
                        step,
                        tool_name: tc.name.clone(),
                        arguments,
                        result: outcome.payload,
                        success: outcome.success,
                        duration_ms,
                    });
                }

                continue;
            }

            let text = response.message.content.trim().to_string();
            conversation.push(response.message);

            let answer = if text.is_empty() {
                EMPTY_RESPONSE_ANSWER.to_string()
            } else {
                text
            };

            info!(
                iterations = iteration,
                tool_calls = records.len(),
                "agentic workflow completed"
            );

            return Ok(AgenticOutcome {
                answer,
                records,
                iteration_cap_reached: false,
            });
        }

        warn!(max_iterations = self.max_iterations, "iteration cap reached");
        Ok(AgenticOutcome {
            answer: CAP_REACHED_ANSWER.to_string(),
            records,
            iteration_cap_reached: true,
        })
    }
}
