//! Supervisor that picks the next participant or signals completion.
//!
//! The supervisor is an agent-shaped participant with no tools of its
//! own: one forced function call whose schema enumerates the registered
//! agent names plus FINISH, so the model can only ever answer with a
//! valid routing decision.

use std::sync::Arc;

use crate::error::LlmError;
use crate::llm::{
    ChatMessage, LlmProvider, ToolChoice, ToolCompletionRequest, ToolDefinition,
};
use crate::network::agent::history_messages;
use crate::network::state::ConversationState;

/// Name of the routing function exposed to the model.
const ROUTE_FUNCTION: &str = "route";

/// The option that maps to the terminal state.
pub const FINISH: &str = "FINISH";

/// The supervisor's structured routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Hand the turn to the named agent.
    Agent(String),
    /// The conversation is complete.
    Finish,
}

/// The distinguished participant owning routing decisions.
pub struct Supervisor {
    name: String,
    llm: Arc<dyn LlmProvider>,
    /// FINISH plus every registered agent name.
    options: Vec<String>,
    system_prompt: String,
}

impl Supervisor {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        members: Vec<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        let mut options = vec![FINISH.to_string()];
        options.extend(members);

        Self {
            name: "PrincipalAgent".to_string(),
            llm,
            options,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the model who acts next.
    pub async fn route(&self, state: &ConversationState) -> Result<RouteDecision, LlmError> {
        let mut messages = vec![ChatMessage::system(&self.system_prompt)];
        messages.extend(history_messages(state));
        messages.push(ChatMessage::system(format!(
            "Given the conversation above, who should act next? Or should we \
             FINISH? Select one of: {:?}",
            self.options
        )));

        let request = ToolCompletionRequest::new(messages, vec![self.route_definition()])
            .with_temperature(0.0)
            .with_tool_choice(ToolChoice::Function(ROUTE_FUNCTION.to_string()));

        let response = self.llm.complete_with_tools(request).await?;

        let choice = response
            .tool_calls
            .iter()
            .find(|call| call.name == ROUTE_FUNCTION)
            .and_then(|call| call.arguments.get("next"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| self.parse_content(response.content.as_deref()))
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: self.llm.model_name().to_string(),
                reason: "supervisor returned no routing decision".to_string(),
            })?;

        if choice == FINISH {
            Ok(RouteDecision::Finish)
        } else {
            Ok(RouteDecision::Agent(choice))
        }
    }

    /// Fallback for providers that answer in text instead of honoring the
    /// forced function call.
    fn parse_content(&self, content: Option<&str>) -> Option<String> {
        let content = content?;
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(content) {
            if let Some(next) = value.get("next").and_then(|v| v.as_str()) {
                return Some(next.to_string());
            }
        }
        self.options
            .iter()
            .find(|option| content.contains(option.as_str()))
            .cloned()
    }

    fn route_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: ROUTE_FUNCTION.to_string(),
            description: "Select the next role.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "next": {
                        "title": "Next",
                        "enum": self.options,
                    }
                },
                "required": ["next"],
            }),
        }
    }
}
