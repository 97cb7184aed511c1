//! Cost estimation tool
//!
//! Preliminary estimate from the catalog's per-m² prices. The upper bound of
//! the range is the base cost plus 25%.

use crate::catalog::Catalog;
use crate::context::{BuildingProjectContext, ConstructionType, ProjectType};
use crate::error::Result;
use crate::registry::{Tool, ToolDefinition, ToolResult};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Upper bound of the estimate range relative to the base cost
const RANGE_FACTOR: f64 = 1.25;

/// Format a CHF amount rounded to whole francs with thousands separators
#[must_use]
pub fn format_chf(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    out
}

fn join_names<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Cost estimation tool
pub struct EstimateProjectCostTool {
    definition: ToolDefinition,
    catalog: Arc<Catalog>,
}

impl EstimateProjectCostTool {
    /// Create a new cost estimation tool
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let definition = ToolDefinition::new(
            "estimate_project_cost",
            "Provide a preliminary cost estimate for a building project.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "project_type": {
                    "type": "string",
                    "description": "Einfamilienhaus, Mehrfamilienhaus, Agrar or Renovation"
                },
                "area_sqm": {
                    "type": "number",
                    "description": "Area in square meters, must be positive"
                },
                "construction_type": {
                    "type": "string",
                    "description": "Holzbau or Systembau"
                },
                "location": {
                    "type": "string",
                    "description": "Optional building location"
                },
                "preferred_start_date": {
                    "type": "string",
                    "description": "Optional preferred construction start"
                }
            },
            "required": ["project_type", "area_sqm", "construction_type"]
        }));

        Self {
            definition,
            catalog,
        }
    }

    fn estimate(&self, input: &CostInput, ctx: &mut BuildingProjectContext) -> (bool, String) {
        if input.area_sqm.is_nan() || input.area_sqm <= 0.0 {
            return (
                false,
                "❌ Invalid area: Area must be greater than 0 m².\n\n\
                 Please provide a valid project area."
                    .to_string(),
            );
        }

        let Ok(project_type) = input.project_type.parse::<ProjectType>() else {
            return (
                false,
                format!(
                    "❌ Unknown project type: '{}'\n\n\
                     Valid project types are:\n- {}\n\n\
                     Please specify a valid project type.",
                    input.project_type,
                    join_names(&ProjectType::ALL)
                ),
            );
        };

        let price = input
            .construction_type
            .parse::<ConstructionType>()
            .ok()
            .and_then(|ct| Some((ct, self.catalog.price_per_sqm(project_type, ct)?)));
        let Some((construction_type, price_per_sqm)) = price else {
            return (
                false,
                format!(
                    "❌ Unknown construction type: '{}' for {}\n\n\
                     Valid construction types are:\n- {}\n\n\
                     Please specify a valid construction type.",
                    input.construction_type,
                    project_type,
                    join_names(&ConstructionType::ALL)
                ),
            );
        };

        let cost = input.area_sqm * f64::from(price_per_sqm);
        ctx.record_estimate(project_type, construction_type, input.area_sqm, cost);
        if let Some(location) = input.location.as_deref().filter(|l| !l.trim().is_empty()) {
            ctx.set_location(location.trim());
        }
        if let Some(date) = input
            .preferred_start_date
            .as_deref()
            .filter(|d| !d.trim().is_empty())
        {
            ctx.set_preferred_start_date(date.trim());
        }
        debug!(project_type = %project_type, area_sqm = input.area_sqm, cost, "Estimated project cost");

        (
            true,
            format!(
                "📊 Preliminary Cost Estimate for {} ({} m²):\n\n\
                 - Construction type: {}\n\
                 - Estimated cost: CHF {} - {}\n\
                 - Price per m²: CHF {}\n\n\
                 This is a preliminary estimate. For an accurate calculation, \
                 we recommend a consultation with our architect.",
                project_type,
                input.area_sqm,
                construction_type,
                format_chf(cost),
                format_chf(cost * RANGE_FACTOR),
                price_per_sqm
            ),
        )
    }
}

#[derive(Debug, Deserialize)]
struct CostInput {
    project_type: String,
    area_sqm: f64,
    construction_type: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    preferred_start_date: Option<String>,
}

#[async_trait::async_trait]
impl Tool for EstimateProjectCostTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        input: serde_json::Value,
        ctx: &mut BuildingProjectContext,
    ) -> Result<ToolResult> {
        let start = Instant::now();
        let input: CostInput = super::parse_input(input)?;
        let (success, output) = self.estimate(&input, ctx);
        Ok(ToolResult::timed(success, output, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> EstimateProjectCostTool {
        EstimateProjectCostTool::new(Arc::new(Catalog::default()))
    }

    #[test]
    fn test_format_chf() {
        assert_eq!(format_chf(450_000.0), "450,000");
        assert_eq!(format_chf(562_500.0), "562,500");
        assert_eq!(format_chf(999.6), "1,000");
        assert_eq!(format_chf(12.0), "12");
        assert_eq!(format_chf(1_234_567.0), "1,234,567");
    }

    #[tokio::test]
    async fn test_estimate_updates_context() {
        let mut ctx = BuildingProjectContext::new();
        let result = tool()
            .execute(
                serde_json::json!({
                    "project_type": "Einfamilienhaus",
                    "area_sqm": 150,
                    "construction_type": "Holzbau",
                    "location": "Muri"
                }),
                &mut ctx,
            )
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.output.contains("CHF 450,000 - 562,500"));
        assert!(result.output.contains("Price per m²: CHF 3000"));
        assert_eq!(ctx.area_sqm(), Some(150.0));
        assert_eq!(ctx.budget_chf(), Some(450_000.0));
        assert_eq!(ctx.project_type(), Some("Einfamilienhaus"));
        assert_eq!(ctx.construction_type(), Some("Holzbau"));
        assert_eq!(ctx.location(), Some("Muri"));
    }

    #[tokio::test]
    async fn test_invalid_area_leaves_context_unchanged() {
        let mut ctx = BuildingProjectContext::new();
        let before = ctx.clone();
        for area in [0.0, -20.0] {
            let result = tool()
                .execute(
                    serde_json::json!({
                        "project_type": "Agrar",
                        "area_sqm": area,
                        "construction_type": "Systembau"
                    }),
                    &mut ctx,
                )
                .await
                .unwrap();
            assert!(!result.success);
            assert!(result.output.contains("Invalid area"));
        }
        assert_eq!(ctx, before);
    }

    #[tokio::test]
    async fn test_unknown_types_are_explained() {
        let mut ctx = BuildingProjectContext::new();
        let before = ctx.clone();

        let result = tool()
            .execute(
                serde_json::json!({
                    "project_type": "Hochhaus",
                    "area_sqm": 100,
                    "construction_type": "Holzbau"
                }),
                &mut ctx,
            )
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("Unknown project type: 'Hochhaus'"));
        assert!(result.output.contains("Einfamilienhaus, Mehrfamilienhaus, Agrar, Renovation"));

        let result = tool()
            .execute(
                serde_json::json!({
                    "project_type": "Renovation",
                    "area_sqm": 100,
                    "construction_type": "Beton"
                }),
                &mut ctx,
            )
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("Unknown construction type: 'Beton' for Renovation"));
        assert_eq!(ctx, before);
    }
}
