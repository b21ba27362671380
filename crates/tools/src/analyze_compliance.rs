//! `analyze_drawing_compliance` — structured compliance verdict for
//! the drawing in the request context.

use async_trait::async_trait;
use lintel_core::error::ToolError;
use lintel_core::tool::{RequestContext, Tool, ToolOutcome};
use lintel_geometry as geometry;
use tracing::info;

use crate::sub_llm::SubLlm;

const SYSTEM_PROMPT: &str =
    "You are a building regulations expert. Always respond with valid JSON.";

pub struct AnalyzeComplianceTool {
    llm: SubLlm,
}

impl AnalyzeComplianceTool {
    pub fn new(llm: SubLlm) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Tool for AnalyzeComplianceTool {
    fn name(&self) -> &str {
        crate::ANALYZE_DRAWING_COMPLIANCE
    }

    fn description(&self) -> &str {
        "Analyze the user's building drawing against regulations to identify \
         compliance issues. Uses the drawing from the current context. \
         Returns a structured analysis of violations and compliant aspects."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "regulations": {
                    "type": "array",
                    "description": "List of relevant regulations to check against",
                    "items": { "type": "string" }
                }
            },
            "required": ["regulations"]
        })
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        arguments: serde_json::Value,
    ) -> Result<ToolOutcome, ToolError> {
        let Some(drawing) = &ctx.drawing else {
            return Ok(ToolOutcome::error("No drawing available in context"));
        };

        info!("analyzing drawing compliance");

        let measurements = geometry::all_dimensions(drawing);
        let drawing_json =
            serde_json::to_string_pretty(drawing).unwrap_or_else(|_| "[]".into());

        let prompt = format!(
            "Analyze this building drawing against the regulations and identify violations.\n\n\
             REGULATIONS:\n{regulations}\n\n\
             DRAWING:\n{drawing_json}\n\n\
             MEASURED DIMENSIONS:\n{measurements}\n\n\
             Provide a structured analysis:\n\
             1. List all violations found\n\
             2. List compliant aspects\n\
             3. Provide specific measurements that violate rules\n\n\
             Format as JSON:\n\
             {{\n    \"violations\": [\"violation 1\", \"violation 2\"],\n    \
             \"compliant\": [\"compliant aspect 1\"],\n    \
             \"measurements\": {{\"dimension\": \"value\"}}\n}}",
            regulations = serde_json::to_string_pretty(&arguments["regulations"])
                .unwrap_or_default(),
        );

        match self.llm.ask_json(SYSTEM_PROMPT, &prompt).await {
            Ok(mut verdict) => {
                // Ground the model's verdict with our own measurements.
                verdict["measured_dimensions"] = measurements;
                verdict["success"] = serde_json::json!(true);
                Ok(ToolOutcome::ok(verdict))
            }
            Err(e) => Ok(ToolOutcome::error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_drawing, ScriptedLlm};
    use lintel_config::LlmConfig;
    use std::sync::Arc;

    fn tool(reply: &str) -> AnalyzeComplianceTool {
        AnalyzeComplianceTool::new(SubLlm::new(
            Arc::new(ScriptedLlm::single(reply)),
            &LlmConfig::default(),
        ))
    }

    #[tokio::test]
    async fn returns_structured_verdict() {
        let tool = tool(
            r#"{"violations": ["extension exceeds 6 m"], "compliant": ["plot coverage"], "measurements": {"extension_depth_m": "7"}}"#,
        );
        let ctx = RequestContext::new("q", Some(sample_drawing()));
        let outcome = tool
            .execute(&ctx, serde_json::json!({"regulations": ["max depth 6 m"]}))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.payload["violations"][0], "extension exceeds 6 m");
        // Our own measurements are attached alongside the model's.
        assert_eq!(
            outcome.payload["measured_dimensions"]["extension_depth_m"],
            7.0
        );
    }

    #[tokio::test]
    async fn no_drawing_is_a_soft_error() {
        let tool = tool("{}");
        let ctx = RequestContext::new("q", None);
        let outcome = tool
            .execute(&ctx, serde_json::json!({"regulations": []}))
            .await
            .unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn prose_reply_is_a_soft_error() {
        let tool = tool("Everything looks fine to me.");
        let ctx = RequestContext::new("q", Some(sample_drawing()));
        let outcome = tool
            .execute(&ctx, serde_json::json!({"regulations": ["r"]}))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.payload["error"].is_string());
    }
}
