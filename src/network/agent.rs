//! A named participant wrapping a prompt, a tool set, and an LLM call.

use std::sync::Arc;

use crate::error::LlmError;
use crate::llm::{
    ChatMessage, CompletionRequest, LlmProvider, ToolCall, ToolChoice, ToolCompletionRequest,
};
use crate::network::graph::FINAL_ANSWER_SENTINEL;
use crate::network::state::{ConversationState, Message, Role};
use crate::network::tool::AgentTool;

/// The resolved shape of one agent turn.
///
/// Resolved once at the invocation boundary; routing decisions match on
/// this instead of re-inspecting raw provider responses.
#[derive(Debug, Clone)]
pub enum AgentOutput {
    /// A direct answer authored by the agent.
    Text(String),
    /// Tool invocations the graph must execute before the agent continues.
    ToolCalls(Vec<ToolCall>),
}

/// A specialist participant in the routing network.
///
/// Stateless across runs: the same agent can serve any number of
/// conversations because all per-run data lives in [`ConversationState`].
pub struct Agent {
    name: String,
    system_prompt: String,
    tools: Vec<Arc<dyn AgentTool>>,
    llm: Arc<dyn LlmProvider>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            tools: Vec::new(),
            llm,
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn AgentTool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: Vec<Arc<dyn AgentTool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tools(&self) -> &[Arc<dyn AgentTool>] {
        &self.tools
    }

    /// Run one turn: history in, text or tool-call intent out.
    pub async fn invoke(&self, state: &ConversationState) -> Result<AgentOutput, LlmError> {
        let mut messages = vec![ChatMessage::system(self.system_message())];
        messages.extend(history_messages(state));

        if self.tools.is_empty() {
            let response = self
                .llm
                .complete(CompletionRequest::new(messages).with_temperature(0.0))
                .await?;
            return Ok(AgentOutput::Text(response.content));
        }

        let tools = self.tools.iter().map(|t| t.definition()).collect();
        let response = self
            .llm
            .complete_with_tools(
                ToolCompletionRequest::new(messages, tools)
                    .with_temperature(0.0)
                    .with_tool_choice(ToolChoice::Auto),
            )
            .await?;

        if !response.tool_calls.is_empty() {
            Ok(AgentOutput::ToolCalls(response.tool_calls))
        } else {
            Ok(AgentOutput::Text(response.content.unwrap_or_default()))
        }
    }

    /// The full system message: collaboration preamble, tool names, and
    /// the agent's configured prompt.
    fn system_message(&self) -> String {
        let tool_names = if self.tools.is_empty() {
            "none".to_string()
        } else {
            self.tools
                .iter()
                .map(|t| t.name().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "You are a helpful AI assistant working alongside other assistants. \
             Use your tools to make progress on the question; partial progress is \
             fine, another assistant will pick up where you stop. When you or any \
             other assistant has the complete answer, prefix the response with \
             {sentinel} so the team knows to stop. \
             You have access to the following tools: {tools}.\n{prompt}",
            sentinel = FINAL_ANSWER_SENTINEL,
            tools = tool_names,
            prompt = self.system_prompt
        )
    }
}

/// Map the conversation log into provider wire messages.
pub(crate) fn history_messages(state: &ConversationState) -> Vec<ChatMessage> {
    state
        .messages
        .iter()
        .map(|message| match message.role {
            Role::User => ChatMessage::user(&message.content),
            Role::Agent => agent_history_message(message),
            Role::Tool => ChatMessage::tool_result(
                message.tool_call_id.clone().unwrap_or_default(),
                message.author.clone().unwrap_or_else(|| "tool".to_string()),
                &message.content,
            ),
        })
        .collect()
}

fn agent_history_message(message: &Message) -> ChatMessage {
    let mut chat = if message.has_tool_calls() {
        ChatMessage::assistant_with_tool_calls(&message.content, message.tool_calls.clone())
    } else {
        ChatMessage::assistant(&message.content)
    };
    chat.name = message.author.clone();
    chat
}
