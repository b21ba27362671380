//! `verify_compliance` — re-measure the drawing and ask the model for
//! a final verdict against the supplied rules.

use async_trait::async_trait;
use lintel_core::error::ToolError;
use lintel_core::tool::{RequestContext, Tool, ToolOutcome};
use lintel_geometry as geometry;
use tracing::info;

use crate::sub_llm::SubLlm;

const SYSTEM_PROMPT: &str =
    "You are a building regulations expert. Always respond with valid JSON.";

pub struct VerifyComplianceTool {
    llm: SubLlm,
}

impl VerifyComplianceTool {
    pub fn new(llm: SubLlm) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Tool for VerifyComplianceTool {
    fn name(&self) -> &str {
        crate::VERIFY_COMPLIANCE
    }

    fn description(&self) -> &str {
        "Verify if the user's building drawing complies with regulations. \
         Uses the drawing from the current context. \
         Returns true/false with detailed explanation."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "regulations": {
                    "type": "array",
                    "description": "Regulations to verify against",
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

        info!("verifying compliance");

        // Fresh measurements so the verdict reflects the current drawing.
        let measurements = geometry::all_dimensions(drawing);
        let drawing_json =
            serde_json::to_string_pretty(drawing).unwrap_or_else(|_| "[]".into());

        let prompt = format!(
            "Verify if this building drawing complies with the regulations.\n\n\
             DRAWING:\n{drawing_json}\n\n\
             MEASURED DIMENSIONS:\n{measurements}\n\n\
             REGULATIONS:\n{regulations}\n\n\
             Provide:\n\
             1. Is it compliant? (true/false)\n\
             2. Detailed explanation\n\
             3. Any remaining issues\n\n\
             Format as JSON:\n\
             {{\n    \"compliant\": true,\n    \
             \"explanation\": \"detailed explanation\",\n    \
             \"remaining_issues\": [\"issue 1\"]\n}}",
            regulations = serde_json::to_string_pretty(&arguments["regulations"])
                .unwrap_or_default(),
        );

        match self.llm.ask_json(SYSTEM_PROMPT, &prompt).await {
            Ok(mut verdict) => {
                if !verdict["compliant"].is_boolean() {
                    return Ok(ToolOutcome::error(
                        "model response is missing a boolean 'compliant'",
                    ));
                }
                verdict["success"] = serde_json::json!(true);
                Ok(ToolOutcome::ok(verdict))
            }
            Err(e) => Ok(ToolOutcome::error(e)),
        }
    }
}
