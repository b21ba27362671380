//! `calculate_drawing_dimensions` — pure geometry over the drawing in
//! the request context.

use async_trait::async_trait;
use lintel_core::error::ToolError;
use lintel_core::tool::{RequestContext, Tool, ToolOutcome};
use lintel_geometry as geometry;
use tracing::info;

pub struct CalculateDimensionsTool;

#[async_trait]
impl Tool for CalculateDimensionsTool {
    fn name(&self) -> &str {
        crate::CALCULATE_DRAWING_DIMENSIONS
    }

    fn description(&self) -> &str {
        "Calculate specific dimensions from the user's building drawing \
         (plot area, extension depth, building height, etc.). \
         Uses the drawing from the current context."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "dimension_type": {
                    "type": "string",
                    // Wire-frozen enum.
                    "enum": ["plot_area", "extension_depth", "building_height", "all"],
                    "description": "Type of dimension to calculate"
                }
            },
            "required": ["dimension_type"]
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

        let dimension_type = arguments["dimension_type"].as_str().unwrap_or("all");
        info!(dimension_type, "calculating dimensions");

        let dimensions = match dimension_type {
            "plot_area" => single("plot_area_m2", geometry::plot_area(drawing)),
            "extension_depth" => single("extension_depth_m", geometry::extension_depth(drawing)),
            "building_height" => single("building_height_m", geometry::building_height(drawing)),
            _ => geometry::all_dimensions(drawing),
        };

        Ok(ToolOutcome::ok(serde_json::json!({
            "success": true,
            "dimensions": dimensions,
        })))
    }
}

fn single(key: &str, value: Option<f64>) -> serde_json::Value {
    let value = match value {
        Some(v) => serde_json::json!((v * 100.0).round() / 100.0),
        None => serde_json::json!(geometry::NOT_DETERMINABLE),
    };
    serde_json::json!({ key: value })
}
