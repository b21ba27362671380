//! Query orchestration for lintel.
//!
//! The request pipeline:
//!
//! 1. **Classify** the question (phrase-bag intent router)
//! 2. **Dispatch** to the standard path (retrieve → assemble →
//!    complete → ladder) or the agentic loop (bounded tool-use
//!    iterations)
//! 3. **Fall back** down the four-tier ladder so every request yields
//!    a useful response: hybrid → drawing-only → regulations-only →
//!    knowledge summary
//!
//! The orchestrator owns all per-request state; nothing survives past
//! the response.

pub mod fallback;
pub mod intent;
pub mod loop_runner;
pub mod orchestrator;
pub mod prompts;
pub mod responder;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use fallback::{apply_source_selection, is_refusal};
pub use intent::{classify, Intent};
pub use loop_runner::{AgenticLoop, AgenticOutcome, LoopError, CAP_REACHED_MARKER};
pub use orchestrator::{
    AnswerError, AnswerRequest, Mode, Orchestrator, MAX_QUESTION_CHARS,
};
pub use prompts::{drawing_digest, PromptAssembler, PromptInput};
pub use responder::StandardResponder;
