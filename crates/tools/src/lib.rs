//! The five agent tools.
//!
//! Tool names are wire-visible and frozen: they appear verbatim in the
//! function-call protocol, so renaming any of them breaks deployed
//! prompt caches. The set is closed — extending it is a deployment
//! concern, not a runtime one.
//!
//! Tools 2, 3, and 5 read the current drawing from the request
//! context; the model never passes the drawing explicitly. Every tool
//! catches its internal errors and returns `{success: false, error}`
//! so the loop's invariant — each tool call yields a result turn —
//! always holds.

pub mod analyze_compliance;
pub mod calculate_dimensions;
pub mod generate_design;
pub mod retrieve_regulations;
pub mod sub_llm;
pub mod verify_compliance;

use std::sync::Arc;

use lintel_config::LlmConfig;
use lintel_core::provider::LlmProvider;
use lintel_core::tool::ToolRegistry;
use lintel_retrieval::RetrievalGateway;

pub use sub_llm::SubLlm;

/// Wire-frozen tool names.
pub const RETRIEVE_REGULATIONS: &str = "retrieve_regulations";
pub const ANALYZE_DRAWING_COMPLIANCE: &str = "analyze_drawing_compliance";
pub const CALCULATE_DRAWING_DIMENSIONS: &str = "calculate_drawing_dimensions";
pub const GENERATE_COMPLIANT_DESIGN: &str = "generate_compliant_design";
pub const VERIFY_COMPLIANCE: &str = "verify_compliance";

/// Build the registry with all five tools.
///
/// Tools that re-enter the model get a bounded [`SubLlm`] at
/// construction; they can never invoke the agentic loop recursively.
pub fn registry(
    gateway: Arc<RetrievalGateway>,
    provider: Arc<dyn LlmProvider>,
    llm_config: &LlmConfig,
) -> ToolRegistry {
    let sub_llm = SubLlm::new(provider, llm_config);

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(retrieve_regulations::RetrieveRegulationsTool::new(
        gateway,
    )));
    registry.register(Box::new(
        analyze_compliance::AnalyzeComplianceTool::new(sub_llm.clone()),
    ));
    registry.register(Box::new(
        calculate_dimensions::CalculateDimensionsTool,
    ));
    registry.register(Box::new(generate_design::GenerateDesignTool::new(
        sub_llm.clone(),
    )));
    registry.register(Box::new(verify_compliance::VerifyComplianceTool::new(
        sub_llm,
    )));
    registry
}

/// Strip a markdown code fence from model output, if present, and
/// return the JSON payload inside.
pub(crate) fn extract_json_block(text: &str) -> &str {
    let trimmed = text.trim();
    for fence in ["```json", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let after = &trimmed[start + fence.len()..];
            if let Some(end) = after.find("```") {
                return after[..end].trim();
            }
        }
    }
    trimmed
}
