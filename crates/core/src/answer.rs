//! The external response types: answers, reasoning traces, and the
//! knowledge summary served on no-answer outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chunk::RetrievedChunk;

/// Which tier of the fallback ladder produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerType {
    /// Regulations-only (Tier 3).
    #[serde(rename = "pdf")]
    Pdf,
    /// Drawing-only (Tier 2).
    #[serde(rename = "drawing")]
    Drawing,
    /// Retrieved chunks and drawing together (Tier 1).
    #[serde(rename = "hybrid")]
    Hybrid,
    /// No substantive answer; carries the knowledge summary (Tier 4).
    #[serde(rename = "no-answer")]
    NoAnswer,
}

/// One tool execution in an agentic trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Monotonic step index within the request, starting at 1.
    pub step: u32,

    /// Wire-visible tool name.
    pub tool_name: String,

    /// The exact parsed arguments the model emitted.
    pub arguments: serde_json::Value,

    /// The structured result (or `{success:false, error}`) returned.
    pub result: serde_json::Value,

    pub success: bool,

    /// Wall-clock duration of the tool body.
    pub duration_ms: u64,
}

/// Corpus overview produced at (re)index time and served on Tier-4
/// responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSummary {
    pub overview: String,
    pub topics: Vec<String>,
    pub suggested_questions: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// The response returned from `answer()` and serialized over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    /// Human-readable answer text.
    pub answer: String,

    pub answer_type: AnswerType,

    /// Cited sources with selection flags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<RetrievedChunk>,

    /// Whether the drawing participated in the reasoning.
    pub drawing_context_used: bool,

    /// Full tool-call trace (agentic mode only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasoning_steps: Vec<ToolCallRecord>,

    /// Present exactly when `answer_type` is `no-answer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_summary: Option<KnowledgeSummary>,

    /// Trace annotations such as "iteration cap reached" or the cause
    /// of a silent agentic→standard fallback.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace_markers: Vec<String>,
}

impl AnswerResult {
    /// Build a Tier-4 no-answer result carrying the given summary.
    pub fn no_answer(message: impl Into<String>, summary: KnowledgeSummary) -> Self {
        Self {
            answer: message.into(),
            answer_type: AnswerType::NoAnswer,
            sources: Vec::new(),
            drawing_context_used: false,
            reasoning_steps: Vec::new(),
            knowledge_summary: Some(summary),
            trace_markers: Vec::new(),
        }
    }
}
