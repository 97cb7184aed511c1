//! Project status lookup

use crate::catalog::{Catalog, OFFICE_PHONE};
use crate::context::BuildingProjectContext;
use crate::error::Result;
use crate::registry::{Tool, ToolDefinition, ToolResult};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

/// Reports stage, progress and next milestone of a known project
pub struct GetProjectStatusTool {
    definition: ToolDefinition,
    catalog: Arc<Catalog>,
}

impl GetProjectStatusTool {
    /// Create a new project status tool
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let definition = ToolDefinition::new(
            "get_project_status",
            "Get the current status of a building project.",
        )
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "project_number": {
                    "type": "string",
                    "description": "Project number, e.g. 2024-156"
                }
            },
            "required": ["project_number"]
        }));

        Self {
            definition,
            catalog,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusInput {
    project_number: String,
}

#[async_trait::async_trait]
impl Tool for GetProjectStatusTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(
        &self,
        input: serde_json::Value,
        ctx: &mut BuildingProjectContext,
    ) -> Result<ToolResult> {
        let start = Instant::now();
        let input: StatusInput = super::parse_input(input)?;
        let number = input.project_number.trim();

        let Some(project) = self.catalog.project(number) else {
            let output = format!(
                "❌ Project {number} not found.\n\
                 Please check the project number or contact us at {OFFICE_PHONE}."
            );
            return Ok(ToolResult::timed(false, output, start));
        };

        ctx.set_project_number(number);

        let output = format!(
            "📊 Project Status #{}\n\n\
             Type: {}\n\
             Location: {}\n\
             Current stage: {}\n\
             Progress: {}%\n\
             Next milestone: {}\n\
             Project manager: {}\n\n\
             Everything is on schedule! 🏗️",
            number,
            project.project_type,
            project.location,
            project.stage,
            project.progress,
            project.next_milestone,
            project.responsible
        );
        Ok(ToolResult::timed(true, output, start))
    }
}
