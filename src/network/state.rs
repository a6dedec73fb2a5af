//! Conversation state threaded through every network step.
//!
//! The message log is append-only and its order is the only ordering
//! signal routing decisions may use. The shared context is produced once
//! per run and mutated only by the graph itself (tool result sinks).

use serde::{Deserialize, Serialize};

use crate::llm::ToolCall;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The end user.
    User,
    /// A named agent (or an unattributed assistant turn seeded by the caller).
    Agent,
    /// A tool result.
    Tool,
}

/// One turn in the conversation. Constructed once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Tool invocations this turn asks the runtime to perform.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Correlates a tool result with the call that produced it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            author: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// An assistant turn with no agent attribution (caller-seeded history).
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
            author: None,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// A turn authored by a named agent.
    pub fn agent(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            ..Self::assistant(content)
        }
    }

    /// An agent turn carrying pending tool invocations.
    pub fn agent_with_tool_calls(
        author: impl Into<String>,
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self {
            tool_calls,
            ..Self::agent(author, content)
        }
    }

    /// A tool result wrapped by the tool-execution node.
    pub fn tool_result(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            author: Some(tool_name.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// How much risk the user is willing to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

/// How long the user intends to stay invested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvestmentPeriod {
    ShortTerm,
    MidTerm,
    LongTerm,
}

/// Structured record shared across agents within one run.
///
/// The market analyzer fills `market_data` as a side effect of its tool
/// calls; the investor's allocation tools read it and fill
/// `portfolio_allocation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedContext {
    pub age: u32,
    pub risk_tolerance: RiskTolerance,
    pub investment_period: InvestmentPeriod,
    #[serde(default)]
    pub market_data: Vec<serde_json::Value>,
    #[serde(default)]
    pub portfolio_allocation: serde_json::Map<String, serde_json::Value>,
}

impl Default for SharedContext {
    fn default() -> Self {
        Self {
            age: 20,
            risk_tolerance: RiskTolerance::Medium,
            investment_period: InvestmentPeriod::LongTerm,
            market_data: Vec::new(),
            portfolio_allocation: serde_json::Map::new(),
        }
    }
}

/// The shared, append-only message log plus routing metadata.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    /// Participant to run next; overwritten every step.
    pub next: String,
    pub context: SharedContext,
}

impl ConversationState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            next: String::new(),
            context: SharedContext::default(),
        }
    }

    pub fn with_context(mut self, context: SharedContext) -> Self {
        self.context = context;
        self
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// One `{sender, text}` pair on the caller wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub sender: String,
    pub text: String,
}

impl WireMessage {
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: "bot".to_string(),
            text: text.into(),
        }
    }
}

/// Seed a message log from caller wire pairs: `sender == "user"` becomes a
/// user turn, anything else an unattributed assistant turn.
pub fn seed_messages(wire: &[WireMessage]) -> Vec<Message> {
    wire.iter()
        .map(|m| {
            if m.sender == "user" {
                Message::user(&m.text)
            } else {
                Message::assistant(&m.text)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_translates_senders() {
        let wire = vec![
            WireMessage {
                sender: "user".to_string(),
                text: "How should I invest?".to_string(),
            },
            WireMessage {
                sender: "bot".to_string(),
                text: "Tell me your age.".to_string(),
            },
        ];

        let messages = seed_messages(&wire);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Agent);
        assert!(messages[1].author.is_none());
    }

    #[test]
    fn context_defaults_match_profile_baseline() {
        let ctx = SharedContext::default();
        assert_eq!(ctx.age, 20);
        assert_eq!(ctx.risk_tolerance, RiskTolerance::Medium);
        assert_eq!(ctx.investment_period, InvestmentPeriod::LongTerm);
        assert!(ctx.market_data.is_empty());
        assert!(ctx.portfolio_allocation.is_empty());
    }

    #[test]
    fn state_appends_in_order() {
        let mut state = ConversationState::new(vec![Message::user("hi")]);
        state.push(Message::agent("InvestorAgent", "hello"));
        assert_eq!(state.messages.len(), 2);
        assert_eq!(
            state.last_message().unwrap().author.as_deref(),
            Some("InvestorAgent")
        );
    }
}
