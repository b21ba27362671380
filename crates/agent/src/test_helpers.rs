//! Shared mocks for agent tests.

use async_trait::async_trait;
use lintel_core::chunk::{ContentType, RetrievedChunk};
use lintel_core::drawing::Drawing;
use lintel_core::error::{LlmError, RetrievalError};
use lintel_core::message::{Message, MessageToolCall};
use lintel_core::provider::{LlmProvider, LlmRequest, LlmResponse};
use lintel_retrieval::Retriever;
use std::sync::Mutex;

/// A provider that replays a scripted response sequence.
pub struct SequentialProvider {
    responses: Mutex<Vec<LlmResponse>>,
    failure: Option<String>,
}

impl SequentialProvider {
    pub fn new(mut responses: Vec<LlmResponse>) -> Self {
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            failure: None,
        }
    }

    /// A provider whose every call fails.
    pub fn failing(message: &str) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    fn next(&self) -> Result<LlmResponse, LlmError> {
        if let Some(message) = &self.failure {
            return Err(LlmError::Network(message.clone()));
        }
        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| LlmError::MalformedResponse("script exhausted".into()))
    }
}

#[async_trait]
impl LlmProvider for SequentialProvider {
    fn name(&self) -> &str {
        "sequential-mock"
    }

    async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.next()
    }

    async fn complete_with_tools(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.next()
    }
}

/// A plain-text assistant response.
pub fn text_response(content: &str) -> LlmResponse {
    LlmResponse {
        message: Message::assistant(content),
        usage: None,
        model: "mock-model".into(),
    }
}

/// An assistant response carrying tool-call intents.
pub fn tool_call_response(calls: &[(&str, &str, &str)]) -> LlmResponse {
    let mut message = Message::assistant("");
    message.tool_calls = calls
        .iter()
        .map(|(id, name, arguments)| MessageToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        })
        .collect();
    LlmResponse {
        message,
        usage: None,
        model: "mock-model".into(),
    }
}

/// A retriever serving a fixed hit list.
pub struct StaticRetriever {
    chunks: Vec<RetrievedChunk>,
}

impl StaticRetriever {
    pub fn new(chunks: Vec<RetrievedChunk>) -> Self {
        Self { chunks }
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(
        &self,
        _query_text: &str,
        _top_k: Option<usize>,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        Ok(self.chunks.clone())
    }
}

/// A retriever whose backend is always down.
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn retrieve(
        &self,
        _query_text: &str,
        _top_k: Option<usize>,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        Err(RetrievalError::Unavailable("connection refused".into()))
    }
}

pub fn chunk(document: &str, content: &str, score: f32) -> RetrievedChunk {
    RetrievedChunk {
        document: document.into(),
        page: 5,
        paragraph: Some(1),
        title: Some("Extensions".into()),
        content: content.into(),
        content_type: ContentType::Text,
        score,
        selected: false,
    }
}

pub fn sample_drawing() -> Drawing {
    serde_json::from_str(
        r#"[
            {"type": "POLYLINE", "layer": "Plot Boundary",
             "points": [[0, 0], [20000, 0], [20000, 20000], [0, 20000]], "closed": true},
            {"type": "POLYLINE", "layer": "Walls",
             "points": [[0, 0], [10000, 0], [10000, 8000], [0, 8000]], "closed": true},
            {"type": "POLYLINE", "layer": "Walls",
             "points": [[2000, 8000], [8000, 8000], [8000, 15000], [2000, 15000]], "closed": true}
        ]"#,
    )
    .unwrap()
}
