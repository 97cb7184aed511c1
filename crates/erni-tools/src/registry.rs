//! Registry - Tool registration and lookup
//!
//! Tools are registered once at startup and resolved by name when an agent
//! asks for them. Agents reference tools by name; the agent registry checks
//! those names against this registry before the server starts.

use crate::context::BuildingProjectContext;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Tool metadata and schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON schema for parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    /// Set the parameters schema
    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Result of a tool execution
///
/// Domain failures such as an unknown project number are not errors: they
/// come back as `success = false` with explanatory text for the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether execution succeeded
    pub success: bool,
    /// Text handed back to the model
    pub output: String,
    /// Execution duration in milliseconds
    pub duration_ms: u64,
}

impl ToolResult {
    /// Create a successful result
    #[must_use]
    pub fn success(output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: true,
            output: output.into(),
            duration_ms,
        }
    }

    /// Create a failed result
    #[must_use]
    pub fn failure(output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            output: output.into(),
            duration_ms,
        }
    }

    pub(crate) fn timed(success: bool, output: String, start: Instant) -> Self {
        let duration_ms = start.elapsed().as_millis() as u64;
        if success {
            Self::success(output, duration_ms)
        } else {
            Self::failure(output, duration_ms)
        }
    }
}

/// Trait for tool implementations
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition
    fn definition(&self) -> &ToolDefinition;

    /// Execute the tool against the conversation context
    async fn execute(
        &self,
        input: serde_json::Value,
        ctx: &mut BuildingProjectContext,
    ) -> Result<ToolResult>;

    /// Validate input before execution
    fn validate_input(&self, input: &serde_json::Value) -> Result<()> {
        if !input.is_object() {
            return Err(Error::InvalidInput("Input must be an object".to_string()));
        }
        Ok(())
    }
}

/// Registry for managing tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name.clone();
        debug!(tool = %name, "Registering tool");
        self.tools.insert(name, tool);
    }

    /// Get a tool by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tool names, sorted
    #[must_use]
    pub fn list_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Get tool count
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate and run a tool by name
    ///
    /// # Errors
    /// Returns `NotFound` for unknown names and `InvalidInput` when the
    /// arguments fail validation.
    pub async fn execute(
        &self,
        name: &str,
        input: serde_json::Value,
        ctx: &mut BuildingProjectContext,
    ) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        tool.validate_input(&input)?;
        let result = tool.execute(input, ctx).await?;
        debug!(
            tool = %name,
            success = result.success,
            duration_ms = result.duration_ms,
            "Tool executed"
        );
        Ok(result)
    }

    /// Convert the named tools to LLM tool format, in the given order.
    /// Unknown names are skipped.
    #[must_use]
    pub fn to_llm_tools<S: AsRef<str>>(&self, names: &[S]) -> Vec<erni_llm::ToolDefinition> {
        names
            .iter()
            .filter_map(|name| self.tools.get(name.as_ref()))
            .map(|tool| {
                let def = tool.definition();
                erni_llm::ToolDefinition::new(&def.name, &def.description, def.parameters.clone())
            })
            .collect()
    }
}
