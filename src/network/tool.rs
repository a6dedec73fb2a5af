//! Agent tool trait and output types.
//!
//! A tool is a named capability an agent exposes to the model. Tools
//! return values; they never touch the conversation state. When a tool
//! declares a context sink, the graph folds its output into the shared
//! context after execution.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::llm::ToolDefinition;
use crate::network::state::SharedContext;

/// Shared-context field a tool's output feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSink {
    /// Append the output to `SharedContext::market_data`.
    MarketData,
    /// Merge the output object into `SharedContext::portfolio_allocation`.
    PortfolioAllocation,
}

/// Output from a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub result: serde_json::Value,
}

impl ToolOutput {
    pub fn json(result: serde_json::Value) -> Self {
        Self { result }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            result: serde_json::Value::String(text.into()),
        }
    }

    /// Render the result as message content. Structured values are
    /// JSON-encoded; plain strings pass through.
    pub fn render(&self) -> String {
        match &self.result {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A capability the runtime can invoke on an agent's behalf.
#[async_trait]
pub trait AgentTool: Send + Sync {
    /// Unique name, used by the model to request invocation and by the
    /// graph to dispatch.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute with the model-supplied arguments. The shared context is
    /// read-only here; mutations happen through [`AgentTool::context_sink`].
    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &SharedContext,
    ) -> Result<ToolOutput, ToolError>;

    /// Which shared-context field (if any) the output feeds.
    fn context_sink(&self) -> Option<ContextSink> {
        None
    }

    /// The schema handed to the model.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}
