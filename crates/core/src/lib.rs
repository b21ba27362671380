//! Core domain types for lintel — the hybrid-RAG building-regulations
//! assistant.
//!
//! This crate holds the value objects and trait seams every other
//! crate depends on: conversation turns, the ephemeral drawing,
//! retrieval chunks, answer results, the LLM provider trait, and the
//! tool trait + registry. It contains no I/O.

pub mod answer;
pub mod chunk;
pub mod drawing;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

pub use answer::{AnswerResult, AnswerType, KnowledgeSummary, ToolCallRecord};
pub use chunk::{ContentType, RetrievedChunk};
pub use drawing::{Drawing, DrawingObject, ObjectKind, Point};
pub use error::{Error, LlmError, OrchestratorError, Result, RetrievalError, ToolError};
pub use message::{Conversation, Message, MessageToolCall, Role};
pub use provider::{LlmProvider, LlmRequest, LlmResponse, ToolDefinition, Usage};
pub use tool::{RequestContext, Tool, ToolCall, ToolOutcome, ToolRegistry};
