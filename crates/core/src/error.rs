//! Error types for the lintel domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant; the fallback ladder
//! recovers most of them locally, so only orchestration-level
//! impossibility should ever reach the HTTP surface as a 5xx.

use thiserror::Error;

/// The top-level error type for all lintel operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- LLM errors ---
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Request validation and orchestration errors ---
    #[error("Orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to the vector-index backend.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    /// Backend unreachable or non-ok after the full retry schedule.
    #[error("Retrieval backend unavailable: {0}")]
    Unavailable(String),

    /// 401/403 from the backend. Never retried.
    #[error("Retrieval authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The backend answered but the hit payload could not be parsed.
    #[error("Malformed retrieval response: {0}")]
    BadResponse(String),
}

/// Failures from the LLM endpoint.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unparseable model output: {0}")]
    MalformedResponse(String),
}

/// Failures inside tool dispatch.
///
/// Tool bodies catch their own internal errors and report them as a
/// `success=false` result instead, so these variants cover only the
/// dispatch layer: unknown names and schema-invalid arguments.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments for {tool_name}: {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },
}

/// Request validation and agentic-path failures.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Question must not be empty")]
    InvalidQuestion,

    #[error("Question too long: {length} chars (max {max})")]
    QuestionTooLong { length: usize, max: usize },

    /// Unhandled failure inside the agentic loop. The orchestrator
    /// silently re-dispatches in standard mode on this.
    #[error("Agentic workflow failed: {0}")]
    AgenticFailure(String),

    #[error("Request deadline elapsed")]
    RequestTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_error_displays_correctly() {
        let err = Error::Llm(LlmError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::InvalidArguments {
            tool_name: "calculate_drawing_dimensions".into(),
            reason: "missing 'dimension_type'".into(),
        });
        assert!(err.to_string().contains("calculate_drawing_dimensions"));
        assert!(err.to_string().contains("dimension_type"));
    }

    #[test]
    fn question_too_long_carries_lengths() {
        let err = OrchestratorError::QuestionTooLong { length: 5000, max: 4000 };
        assert!(err.to_string().contains("5000"));
        assert!(err.to_string().contains("4000"));
    }
}
