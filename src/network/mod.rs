//! Supervisor-driven agent routing.
//!
//! The network owns a set of specialist [`Agent`]s, one [`Supervisor`],
//! and a tool-execution node. A run starts at the supervisor and steps
//! sequentially until the finish state or the step budget is reached.

mod agent;
mod graph;
mod state;
mod supervisor;
mod tool;

pub use agent::{Agent, AgentOutput};
pub use graph::{
    AgentEdges, AgentNetwork, AgentNetworkBuilder, DEFAULT_STEP_LIMIT, FINAL_ANSWER_SENTINEL,
    Prerequisite, StepSnapshot,
};
pub use state::{
    ConversationState, InvestmentPeriod, Message, RiskTolerance, Role, SharedContext, WireMessage,
    seed_messages,
};
pub use supervisor::{FINISH, RouteDecision, Supervisor};
pub use tool::{AgentTool, ContextSink, ToolOutput};
