//! `retrieve_regulations` — search the regulation corpus.

use async_trait::async_trait;
use lintel_core::error::ToolError;
use lintel_core::tool::{RequestContext, Tool, ToolOutcome};
use lintel_retrieval::{RetrievalGateway, Retriever};
use std::sync::Arc;
use tracing::info;

pub struct RetrieveRegulationsTool {
    gateway: Arc<RetrievalGateway>,
}

impl RetrieveRegulationsTool {
    pub fn new(gateway: Arc<RetrievalGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for RetrieveRegulationsTool {
    fn name(&self) -> &str {
        crate::RETRIEVE_REGULATIONS
    }

    fn description(&self) -> &str {
        "Retrieve relevant building regulations from the knowledge base. \
         Use this when you need to find specific rules, requirements, or regulations."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to find relevant regulations"
                },
                "top_k": {
                    "type": "integer",
                    "description": "Number of results to retrieve (default: 5)",
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        arguments: serde_json::Value,
    ) -> Result<ToolOutcome, ToolError> {
        let query = arguments["query"].as_str().unwrap_or_default();
        let top_k = arguments["top_k"].as_u64().map(|k| k as usize);

        info!(query, "retrieving regulations");

        match self.gateway.retrieve(query, top_k).await {
            Ok(chunks) if !chunks.is_empty() => {
                // Cache for source citation in the final answer.
                ctx.cache_regulations(chunks.clone());

                let regulations: Vec<serde_json::Value> = chunks
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        serde_json::json!({
                            "id": i,
                            "document": c.document,
                            "page": c.page,
                            "title": c.title,
                            "content": c.content,
                            "relevance": c.score,
                        })
                    })
                    .collect();

                Ok(ToolOutcome::ok(serde_json::json!({
                    "success": true,
                    "count": regulations.len(),
                    "regulations": regulations,
                })))
            }
            Ok(_) => Ok(ToolOutcome {
                success: false,
                payload: serde_json::json!({
                    "success": false,
                    "count": 0,
                    "message": "No relevant regulations found",
                }),
            }),
            Err(e) => Ok(ToolOutcome::error(e)),
        }
    }
}
