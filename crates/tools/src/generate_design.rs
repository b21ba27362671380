//! `generate_compliant_design` — ask the model for an adjusted drawing
//! that fixes the identified violations.

use async_trait::async_trait;
use lintel_core::error::ToolError;
use lintel_core::tool::{RequestContext, Tool, ToolOutcome};
use tracing::info;

use crate::sub_llm::SubLlm;

const SYSTEM_PROMPT: &str =
    "You are a building design expert. Always respond with valid JSON.";

pub struct GenerateDesignTool {
    llm: SubLlm,
}

impl GenerateDesignTool {
    pub fn new(llm: SubLlm) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Tool for GenerateDesignTool {
    fn name(&self) -> &str {
        crate::GENERATE_COMPLIANT_DESIGN
    }

    fn description(&self) -> &str {
        "Generate an adjusted, compliant version of a building drawing based on \
         identified violations. Returns corrected JSON with explanations."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "original_drawing": {
                    "type": "object",
                    "description": "The original non-compliant drawing"
                },
                "violations": {
                    "type": "array",
                    "description": "List of violations to fix",
                    "items": { "type": "string" }
                },
                "regulations": {
                    "type": "array",
                    "description": "Relevant regulations to comply with",
                    "items": { "type": "string" }
                }
            },
            "required": ["original_drawing", "violations", "regulations"]
        })
    }

    async fn execute(
        &self,
        _ctx: &RequestContext,
        arguments: serde_json::Value,
    ) -> Result<ToolOutcome, ToolError> {
        info!("generating compliant design");

        let prompt = format!(
            "Generate an adjusted, compliant version of this building drawing.\n\n\
             ORIGINAL DRAWING:\n{original}\n\n\
             VIOLATIONS TO FIX:\n{violations}\n\n\
             REGULATIONS TO COMPLY WITH:\n{regulations}\n\n\
             Provide:\n\
             1. Adjusted JSON in the same schema as the original (complete, valid JSON)\n\
             2. Explanation of changes made\n\
             3. Verification that it now complies\n\n\
             Format as JSON:\n\
             {{\n    \"adjusted_drawing\": {{...}},\n    \
             \"changes_made\": [\"change 1\", \"change 2\"],\n    \
             \"compliance_verification\": \"explanation\"\n}}",
            original = serde_json::to_string_pretty(&arguments["original_drawing"])
                .unwrap_or_default(),
            violations =
                serde_json::to_string_pretty(&arguments["violations"]).unwrap_or_default(),
            regulations =
                serde_json::to_string_pretty(&arguments["regulations"]).unwrap_or_default(),
        );

        match self.llm.ask_json(SYSTEM_PROMPT, &prompt).await {
            Ok(mut result) => {
                if result.get("adjusted_drawing").is_none() {
                    return Ok(ToolOutcome::error(
                        "model response is missing 'adjusted_drawing'",
                    ));
                }
                result["success"] = serde_json::json!(true);
                Ok(ToolOutcome::ok(result))
            }
            Err(e) => Ok(ToolOutcome::error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLlm;
    use lintel_config::LlmConfig;
    use std::sync::Arc;

    fn tool(reply: &str) -> GenerateDesignTool {
        GenerateDesignTool::new(SubLlm::new(
            Arc::new(ScriptedLlm::single(reply)),
            &LlmConfig::default(),
        ))
    }

    fn arguments() -> serde_json::Value {
        serde_json::json!({
            "original_drawing": [
                {"type": "POLYLINE", "layer": "Walls",
                 "points": [[2000, 8000], [8000, 8000], [8000, 15000], [2000, 15000]],
                 "closed": true}
            ],
            "violations": ["extension depth 7 m exceeds the 6 m limit"],
            "regulations": ["rear extensions must not exceed 6 m in depth"]
        })
    }

    #[tokio::test]
    async fn returns_adjusted_drawing() {
        let tool = tool(
            r#"```json
{
  "adjusted_drawing": [
    {"type": "POLYLINE", "layer": "Walls",
     "points": [[2000, 8000], [8000, 8000], [8000, 14000], [2000, 14000]],
     "closed": true}
  ],
  "changes_made": ["reduced extension depth from 7 m to 6 m"],
  "compliance_verification": "The extension now sits within the 6 m limit."
}
```"#,
        );
        let ctx = RequestContext::new("q", None);
        let outcome = tool.execute(&ctx, arguments()).await.unwrap();

        assert!(outcome.success);
        assert_eq!(
            outcome.payload["changes_made"][0],
            "reduced extension depth from 7 m to 6 m"
        );
        // Adjusted drawing still parses as a drawing.
        let adjusted: lintel_core::drawing::Drawing =
            serde_json::from_value(outcome.payload["adjusted_drawing"].clone()).unwrap();
        assert_eq!(adjusted.len(), 1);
    }

    #[tokio::test]
    async fn missing_adjusted_drawing_is_a_soft_error() {
        let tool = tool(r#"{"changes_made": []}"#);
        let ctx = RequestContext::new("q", None);
        let outcome = tool.execute(&ctx, arguments()).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.payload["error"]
            .as_str()
            .unwrap()
            .contains("adjusted_drawing"));
    }
}
