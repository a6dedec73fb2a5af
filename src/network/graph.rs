//! The routing state machine driving a conversation to completion.
//!
//! One node per registered agent, plus the supervisor, a tool-execution
//! node, and a terminal finish node. Execution is strictly sequential:
//! every step appends its messages before the next transition is
//! evaluated, so each decision always sees the full prior history.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::NetworkError;
use crate::llm::LlmProvider;
use crate::network::agent::{Agent, AgentOutput};
use crate::network::state::{ConversationState, Message, SharedContext};
use crate::network::supervisor::{RouteDecision, Supervisor};
use crate::network::tool::{AgentTool, ContextSink};

/// Case-sensitive token agents use to mark a complete answer.
pub const FINAL_ANSWER_SENTINEL: &str = "FINAL ANSWER";

/// Default maximum number of graph steps per run.
pub const DEFAULT_STEP_LIMIT: usize = 20;

/// Message shown when an agent's provider call fails mid-run.
const AGENT_UNAVAILABLE: &str =
    "I'm temporarily unable to help with this part of the request. Please try again shortly.";

/// States of the routing machine.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Supervisor,
    Agent(String),
    ToolExecution,
    Finish,
}

impl Node {
    fn label(&self) -> String {
        match self {
            Node::Supervisor => "supervisor".to_string(),
            Node::Agent(name) => name.clone(),
            Node::ToolExecution => "tool_execution".to_string(),
            Node::Finish => "finish".to_string(),
        }
    }
}

/// A hand-off precondition declared by an agent.
///
/// When the predicate is unsatisfied after the agent's turn, control is
/// redirected to `redirect_to` instead of returning to the supervisor,
/// regardless of what the agent's own output signals.
#[derive(Clone)]
pub struct Prerequisite {
    redirect_to: String,
    satisfied: Arc<dyn Fn(&SharedContext) -> bool + Send + Sync>,
}

impl Prerequisite {
    pub fn new(
        redirect_to: impl Into<String>,
        satisfied: impl Fn(&SharedContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            redirect_to: redirect_to.into(),
            satisfied: Arc::new(satisfied),
        }
    }

    pub fn redirect_to(&self) -> &str {
        &self.redirect_to
    }

    pub fn is_satisfied(&self, ctx: &SharedContext) -> bool {
        (self.satisfied)(ctx)
    }
}

impl std::fmt::Debug for Prerequisite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prerequisite")
            .field("redirect_to", &self.redirect_to)
            .finish_non_exhaustive()
    }
}

/// Declarative per-agent transition behavior.
///
/// One entry per agent keeps the routing engine generic: registering a
/// new agent never requires touching the step loop.
#[derive(Debug, Clone)]
pub struct AgentEdges {
    /// Token in the agent's output that terminates the run.
    pub termination_sentinel: Option<String>,
    /// Optional redirect evaluated before the default continuation.
    pub prerequisite: Option<Prerequisite>,
}

impl Default for AgentEdges {
    fn default() -> Self {
        Self {
            termination_sentinel: Some(FINAL_ANSWER_SENTINEL.to_string()),
            prerequisite: None,
        }
    }
}

impl AgentEdges {
    pub fn with_prerequisite(mut self, prerequisite: Prerequisite) -> Self {
        self.prerequisite = Some(prerequisite);
        self
    }

    pub fn without_termination(mut self) -> Self {
        self.termination_sentinel = None;
        self
    }
}

/// One per-step observation emitted on the snapshot stream.
#[derive(Debug, Clone)]
pub struct StepSnapshot {
    /// 1-based step counter.
    pub step: usize,
    /// Which node ran.
    pub node: String,
    /// Messages appended during this step.
    pub new_messages: Vec<Message>,
    /// Participant recorded to act next.
    pub next: String,
}

/// Builder for [`AgentNetwork`].
pub struct AgentNetworkBuilder {
    llm: Arc<dyn LlmProvider>,
    agents: Vec<Arc<Agent>>,
    edges: HashMap<String, AgentEdges>,
    supervisor_prompt: Option<String>,
    step_limit: usize,
}

impl AgentNetworkBuilder {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            agents: Vec::new(),
            edges: HashMap::new(),
            supervisor_prompt: None,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Register an agent with default edges.
    pub fn agent(self, agent: Agent) -> Self {
        self.agent_with_edges(agent, AgentEdges::default())
    }

    /// Register an agent with explicit transition behavior.
    pub fn agent_with_edges(mut self, agent: Agent, edges: AgentEdges) -> Self {
        self.edges.insert(agent.name().to_string(), edges);
        self.agents.push(Arc::new(agent));
        self
    }

    /// Override the supervisor system prompt.
    pub fn supervisor_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.supervisor_prompt = Some(prompt.into());
        self
    }

    /// Override the step budget.
    pub fn step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn build(self) -> Result<AgentNetwork, NetworkError> {
        if self.agents.is_empty() {
            return Err(NetworkError::NoAgents);
        }

        let order: Vec<String> = self.agents.iter().map(|a| a.name().to_string()).collect();

        let mut tools: HashMap<String, Arc<dyn AgentTool>> = HashMap::new();
        for agent in &self.agents {
            for tool in agent.tools() {
                if tools
                    .insert(tool.name().to_string(), Arc::clone(tool))
                    .is_some()
                {
                    return Err(NetworkError::DuplicateTool {
                        name: tool.name().to_string(),
                    });
                }
            }
        }

        let agents: HashMap<String, Arc<Agent>> = self
            .agents
            .into_iter()
            .map(|a| (a.name().to_string(), a))
            .collect();

        // Prerequisite redirects must point at registered agents.
        for (name, edges) in &self.edges {
            if let Some(p) = &edges.prerequisite {
                if !agents.contains_key(p.redirect_to()) {
                    tracing::error!(
                        agent = %name,
                        redirect = %p.redirect_to(),
                        "prerequisite redirect targets an unregistered agent"
                    );
                    return Err(NetworkError::UnknownRoute {
                        name: p.redirect_to().to_string(),
                    });
                }
            }
        }

        let supervisor_prompt = self.supervisor_prompt.unwrap_or_else(|| {
            format!(
                "You are a supervisor managing a conversation between these \
                 workers: {}. Given the user request, respond with the worker \
                 to act next. Each worker performs a task and reports back. \
                 When the work is done, respond with FINISH.",
                order.join(", ")
            )
        });
        let supervisor = Supervisor::new(self.llm, order.clone(), supervisor_prompt);

        Ok(AgentNetwork {
            agents,
            order,
            edges: self.edges,
            tools,
            supervisor,
            step_limit: self.step_limit,
        })
    }
}

/// The supervisor-driven agent routing network.
pub struct AgentNetwork {
    agents: HashMap<String, Arc<Agent>>,
    /// Registration order, kept for prompt construction and debugging.
    order: Vec<String>,
    edges: HashMap<String, AgentEdges>,
    /// Pool of every registered agent's tools, keyed by tool name.
    tools: HashMap<String, Arc<dyn AgentTool>>,
    supervisor: Supervisor,
    step_limit: usize,
}

impl AgentNetwork {
    pub fn builder(llm: Arc<dyn LlmProvider>) -> AgentNetworkBuilder {
        AgentNetworkBuilder::new(llm)
    }

    pub fn agent_names(&self) -> &[String] {
        &self.order
    }

    pub fn step_limit(&self) -> usize {
        self.step_limit
    }

    /// Drive a conversation to completion and return the final state.
    pub async fn run(
        &self,
        messages: Vec<Message>,
    ) -> Result<ConversationState, NetworkError> {
        self.run_with_context(messages, SharedContext::default())
            .await
    }

    /// Like [`AgentNetwork::run`] with a caller-supplied profile.
    pub async fn run_with_context(
        &self,
        messages: Vec<Message>,
        context: SharedContext,
    ) -> Result<ConversationState, NetworkError> {
        let state = ConversationState::new(messages).with_context(context);
        self.drive(state, None).await
    }

    /// Observe a run as a lazily-produced sequence of per-step snapshots.
    ///
    /// Consuming the stream fully exhausts the run; dropping it abandons
    /// the run at the next step boundary.
    pub fn stream(
        self: Arc<Self>,
        messages: Vec<Message>,
    ) -> ReceiverStream<Result<StepSnapshot, NetworkError>> {
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            let state = ConversationState::new(messages);
            if let Err(e) = self.drive(state, Some(&tx)).await {
                let _ = tx.send(Err(e)).await;
            }
        });

        ReceiverStream::new(rx)
    }

    /// The sequential step loop.
    async fn drive(
        &self,
        mut state: ConversationState,
        snapshots: Option<&mpsc::Sender<Result<StepSnapshot, NetworkError>>>,
    ) -> Result<ConversationState, NetworkError> {
        let mut node = Node::Supervisor;
        let mut steps = 0usize;

        loop {
            if node == Node::Finish {
                tracing::info!(steps, "conversation finished");
                return Ok(state);
            }
            if steps >= self.step_limit {
                tracing::warn!(limit = self.step_limit, "step limit exceeded");
                return Err(NetworkError::StepLimitExceeded {
                    limit: self.step_limit,
                });
            }
            steps += 1;

            let label = node.label();
            let appended_from = state.messages.len();

            node = match node {
                Node::Supervisor => self.supervisor_step(&mut state).await?,
                Node::Agent(name) => self.agent_step(name, &mut state).await?,
                Node::ToolExecution => self.tool_step(&mut state).await?,
                Node::Finish => unreachable!("finish handled above"),
            };

            tracing::debug!(step = steps, node = %label, next = %node.label(), "step complete");

            if let Some(tx) = snapshots {
                let snapshot = StepSnapshot {
                    step: steps,
                    node: label,
                    new_messages: state.messages[appended_from..].to_vec(),
                    next: state.next.clone(),
                };
                if tx.send(Ok(snapshot)).await.is_err() {
                    // Receiver gone: the caller stopped consuming.
                    tracing::debug!("snapshot receiver dropped, abandoning run");
                    return Ok(state);
                }
            }
        }
    }

    async fn supervisor_step(
        &self,
        state: &mut ConversationState,
    ) -> Result<Node, NetworkError> {
        match self.supervisor.route(state).await? {
            RouteDecision::Finish => Ok(Node::Finish),
            RouteDecision::Agent(name) => {
                if !self.agents.contains_key(&name) {
                    return Err(NetworkError::UnknownRoute { name });
                }
                state.next = name.clone();
                Ok(Node::Agent(name))
            }
        }
    }

    async fn agent_step(
        &self,
        name: String,
        state: &mut ConversationState,
    ) -> Result<Node, NetworkError> {
        let agent = self
            .agents
            .get(&name)
            .ok_or_else(|| NetworkError::UnknownRoute { name: name.clone() })?;

        match agent.invoke(state).await {
            Ok(AgentOutput::ToolCalls(calls)) => {
                state.push(Message::agent_with_tool_calls(&name, "", calls));
                state.next = name;
                Ok(Node::ToolExecution)
            }
            Ok(AgentOutput::Text(content)) => {
                state.push(Message::agent(&name, &content));
                Ok(self.after_agent_turn(&name, &content, state))
            }
            Err(e) => {
                // Collaborator failure: keep the graph intact and let the
                // supervisor decide how to wind down.
                tracing::warn!(agent = %name, error = %e, "agent turn failed");
                state.push(Message::agent(&name, AGENT_UNAVAILABLE));
                Ok(Node::Supervisor)
            }
        }
    }

    /// Transition rules after a specialist agent's text output, in
    /// precedence order: prerequisite redirect, termination sentinel,
    /// default return to the supervisor. (Tool-call intent is handled
    /// before this point.)
    fn after_agent_turn(
        &self,
        name: &str,
        content: &str,
        state: &mut ConversationState,
    ) -> Node {
        let edges = self.edges.get(name);

        if let Some(prerequisite) = edges.and_then(|e| e.prerequisite.as_ref()) {
            if !prerequisite.is_satisfied(&state.context) {
                let target = prerequisite.redirect_to().to_string();
                tracing::debug!(agent = %name, redirect = %target, "prerequisite unmet");
                state.next = target.clone();
                return Node::Agent(target);
            }
        }

        if let Some(sentinel) = edges.and_then(|e| e.termination_sentinel.as_ref()) {
            if content.contains(sentinel.as_str()) {
                return Node::Finish;
            }
        }

        Node::Supervisor
    }

    /// Execute every pending call of the last message and return control
    /// to the agent that requested them.
    async fn tool_step(&self, state: &mut ConversationState) -> Result<Node, NetworkError> {
        let calls = state
            .last_message()
            .map(|m| m.tool_calls.clone())
            .unwrap_or_default();

        for call in calls {
            let tool = self
                .tools
                .get(&call.name)
                .ok_or_else(|| NetworkError::UnknownTool {
                    name: call.name.clone(),
                })?;

            let content = match tool.execute(call.arguments.clone(), &state.context).await {
                Ok(output) => {
                    if let Some(sink) = tool.context_sink() {
                        apply_sink(&mut state.context, sink, &output.result);
                    }
                    output.render()
                }
                Err(e) => {
                    tracing::warn!(tool = %call.name, error = %e, "tool execution failed");
                    format!(
                        "The {} tool is temporarily unavailable. Please try again later.",
                        call.name
                    )
                }
            };

            state.push(Message::tool_result(&call.id, &call.name, content));
        }

        Ok(Node::Agent(state.next.clone()))
    }
}

/// Fold a tool result into the shared context.
fn apply_sink(ctx: &mut SharedContext, sink: ContextSink, result: &serde_json::Value) {
    match sink {
        ContextSink::MarketData => match result {
            serde_json::Value::Array(items) => ctx.market_data.extend(items.iter().cloned()),
            other => ctx.market_data.push(other.clone()),
        },
        ContextSink::PortfolioAllocation => {
            if let serde_json::Value::Object(map) = result {
                for (key, value) in map {
                    ctx.portfolio_allocation.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio_stream::StreamExt;

    use super::*;
    use crate::error::{LlmError, ToolError};
    use crate::llm::{
        CompletionRequest, CompletionResponse, FinishReason, ToolCall, ToolCompletionRequest,
        ToolCompletionResponse,
    };
    use crate::network::state::Role;
    use crate::network::tool::ToolOutput;

    /// A provider that replays a fixed script of responses.
    ///
    /// Supervisor turns are detected by the forced `route` tool choice, so
    /// one script drives both routing and agent turns.
    struct ScriptedProvider {
        routes: Mutex<Vec<String>>,
        agent_turns: Mutex<Vec<AgentTurn>>,
    }

    enum AgentTurn {
        Text(String),
        Calls(Vec<ToolCall>),
    }

    impl ScriptedProvider {
        fn new(routes: Vec<&str>, agent_turns: Vec<AgentTurn>) -> Arc<Self> {
            Arc::new(Self {
                routes: Mutex::new(routes.into_iter().rev().map(str::to_string).collect()),
                agent_turns: Mutex::new({
                    let mut turns = agent_turns;
                    turns.reverse();
                    turns
                }),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, _req: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let turn = self.agent_turns.lock().unwrap().pop();
            match turn {
                Some(AgentTurn::Text(text)) => Ok(CompletionResponse {
                    content: text,
                    finish_reason: FinishReason::Stop,
                    input_tokens: 0,
                    output_tokens: 0,
                }),
                _ => panic!("unexpected plain completion"),
            }
        }

        async fn complete_with_tools(
            &self,
            req: ToolCompletionRequest,
        ) -> Result<ToolCompletionResponse, LlmError> {
            let is_route = matches!(
                req.tool_choice,
                Some(crate::llm::ToolChoice::Function(ref name)) if name == "route"
            );

            if is_route {
                let next = self
                    .routes
                    .lock()
                    .unwrap()
                    .pop()
                    .expect("script ran out of routing decisions");
                return Ok(ToolCompletionResponse {
                    content: None,
                    tool_calls: vec![ToolCall {
                        id: "route_call".to_string(),
                        name: "route".to_string(),
                        arguments: serde_json::json!({ "next": next }),
                    }],
                    finish_reason: FinishReason::ToolUse,
                    input_tokens: 0,
                    output_tokens: 0,
                });
            }

            let turn = self
                .agent_turns
                .lock()
                .unwrap()
                .pop()
                .expect("script ran out of agent turns");
            Ok(match turn {
                AgentTurn::Text(text) => ToolCompletionResponse {
                    content: Some(text),
                    tool_calls: vec![],
                    finish_reason: FinishReason::Stop,
                    input_tokens: 0,
                    output_tokens: 0,
                },
                AgentTurn::Calls(calls) => ToolCompletionResponse {
                    content: None,
                    tool_calls: calls,
                    finish_reason: FinishReason::ToolUse,
                    input_tokens: 0,
                    output_tokens: 0,
                },
            })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct MarketDataTool;

    #[async_trait]
    impl AgentTool for MarketDataTool {
        fn name(&self) -> &str {
            "get_market_data"
        }

        fn description(&self) -> &str {
            "Fetch market data for companies."
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }

        async fn execute(
            &self,
            _params: serde_json::Value,
            _ctx: &SharedContext,
        ) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::json(
                serde_json::json!([{"company_name": "Acme", "news_summary": ["growth"]}]),
            ))
        }

        fn context_sink(&self) -> Option<ContextSink> {
            Some(ContextSink::MarketData)
        }
    }

    struct FailingTool;

    #[async_trait]
    impl AgentTool for FailingTool {
        fn name(&self) -> &str {
            "flaky_lookup"
        }

        fn description(&self) -> &str {
            "Always fails."
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }

        async fn execute(
            &self,
            _params: serde_json::Value,
            _ctx: &SharedContext,
        ) -> Result<ToolOutput, ToolError> {
            Err(ToolError::ExternalService("connection reset".to_string()))
        }
    }

    fn call(name: &str) -> ToolCall {
        ToolCall {
            id: format!("call_{}", name),
            name: name.to_string(),
            arguments: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn finish_on_first_route_terminates_in_one_step() {
        let llm = ScriptedProvider::new(vec!["FINISH"], vec![]);
        let network = AgentNetwork::builder(llm.clone())
            .agent(Agent::new("AnalystAgent", "You analyze.", llm))
            .build()
            .unwrap();

        let input = vec![Message::user("hello")];
        let state = network.run(input.clone()).await.unwrap();

        // No agent ever ran: the log equals the input.
        assert_eq!(state.messages.len(), input.len());
    }

    #[tokio::test]
    async fn tool_calls_route_back_to_requesting_agent() {
        let llm = ScriptedProvider::new(
            vec!["AnalystAgent", "FINISH"],
            vec![
                AgentTurn::Calls(vec![call("get_market_data")]),
                AgentTurn::Text("Markets look stable.".to_string()),
            ],
        );
        let network = AgentNetwork::builder(llm.clone())
            .agent(
                Agent::new("AnalystAgent", "You analyze.", llm)
                    .with_tool(Arc::new(MarketDataTool)),
            )
            .build()
            .unwrap();

        let state = network.run(vec![Message::user("analyze Acme")]).await.unwrap();

        // agent tool request, tool result, agent answer
        let roles: Vec<Role> = state.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Agent, Role::Tool, Role::Agent]);
        assert_eq!(
            state.messages[3].author.as_deref(),
            Some("AnalystAgent"),
            "tool result must return to the agent that requested it"
        );
        assert_eq!(state.messages[2].tool_call_id.as_deref(), Some("call_get_market_data"));
        // The sink populated shared context.
        assert_eq!(state.context.market_data.len(), 1);
    }

    #[tokio::test]
    async fn sentinel_terminates_without_supervisor() {
        let llm = ScriptedProvider::new(
            vec!["AnalystAgent"],
            vec![AgentTurn::Text(
                "FINAL ANSWER: allocate 60/40.".to_string(),
            )],
        );
        let network = AgentNetwork::builder(llm.clone())
            .agent(Agent::new("AnalystAgent", "You analyze.", llm))
            .build()
            .unwrap();

        let state = network.run(vec![Message::user("go")]).await.unwrap();
        assert!(state.last_message().unwrap().content.contains("FINAL ANSWER"));
    }

    #[tokio::test]
    async fn step_limit_halts_endless_runs() {
        let limit = 6;
        // Supervisor always routes to the agent; the agent never finishes.
        let routes = vec!["AnalystAgent"; limit];
        let turns: Vec<AgentTurn> = (0..limit)
            .map(|i| AgentTurn::Text(format!("still working ({i})")))
            .collect();
        let llm = ScriptedProvider::new(routes, turns);
        let network = AgentNetwork::builder(llm.clone())
            .agent(Agent::new("AnalystAgent", "You analyze.", llm))
            .step_limit(limit)
            .build()
            .unwrap();

        let err = network.run(vec![Message::user("go")]).await.unwrap_err();
        assert!(matches!(err, NetworkError::StepLimitExceeded { limit: l } if l == limit));
    }

    #[tokio::test]
    async fn unmet_prerequisite_redirects_even_on_final_answer() {
        let llm = ScriptedProvider::new(
            vec!["AllocatorAgent"],
            vec![
                // The allocator claims completion, but market data is missing.
                AgentTurn::Text("FINAL ANSWER: put everything in gold.".to_string()),
                // So the analyst runs instead and genuinely finishes.
                AgentTurn::Text("FINAL ANSWER: here is the market data.".to_string()),
            ],
        );
        let edges = AgentEdges::default().with_prerequisite(Prerequisite::new(
            "AnalystAgent",
            |ctx: &SharedContext| !ctx.market_data.is_empty(),
        ));
        let network = AgentNetwork::builder(llm.clone())
            .agent(Agent::new("AnalystAgent", "You analyze.", llm.clone()))
            .agent_with_edges(Agent::new("AllocatorAgent", "You allocate.", llm), edges)
            .build()
            .unwrap();

        let state = network.run(vec![Message::user("allocate")]).await.unwrap();

        let authors: Vec<Option<&str>> = state
            .messages
            .iter()
            .map(|m| m.author.as_deref())
            .collect();
        assert_eq!(
            authors,
            vec![None, Some("AllocatorAgent"), Some("AnalystAgent")]
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_fatal() {
        let llm = ScriptedProvider::new(
            vec!["AnalystAgent"],
            vec![AgentTurn::Calls(vec![call("not_registered")])],
        );
        let network = AgentNetwork::builder(llm.clone())
            .agent(
                Agent::new("AnalystAgent", "You analyze.", llm)
                    .with_tool(Arc::new(MarketDataTool)),
            )
            .build()
            .unwrap();

        let err = network.run(vec![Message::user("go")]).await.unwrap_err();
        assert!(matches!(err, NetworkError::UnknownTool { name } if name == "not_registered"));
    }

    #[tokio::test]
    async fn failing_tool_becomes_user_safe_message() {
        let llm = ScriptedProvider::new(
            vec!["AnalystAgent", "FINISH"],
            vec![
                AgentTurn::Calls(vec![call("flaky_lookup")]),
                AgentTurn::Text("I could not fetch the data.".to_string()),
            ],
        );
        let network = AgentNetwork::builder(llm.clone())
            .agent(
                Agent::new("AnalystAgent", "You analyze.", llm)
                    .with_tool(Arc::new(FailingTool)),
            )
            .build()
            .unwrap();

        let state = network.run(vec![Message::user("go")]).await.unwrap();
        let tool_msg = state
            .messages
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert!(tool_msg.content.contains("temporarily unavailable"));
    }

    #[tokio::test]
    async fn unknown_route_target_is_fatal() {
        let llm = ScriptedProvider::new(vec!["GhostAgent"], vec![]);
        let network = AgentNetwork::builder(llm.clone())
            .agent(Agent::new("AnalystAgent", "You analyze.", llm))
            .build()
            .unwrap();

        let err = network.run(vec![Message::user("go")]).await.unwrap_err();
        assert!(matches!(err, NetworkError::UnknownRoute { name } if name == "GhostAgent"));
    }

    #[tokio::test]
    async fn stream_yields_one_snapshot_per_step() {
        let llm = ScriptedProvider::new(
            vec!["AnalystAgent", "FINISH"],
            vec![AgentTurn::Text("looking into it".to_string())],
        );
        let network = Arc::new(
            AgentNetwork::builder(llm.clone())
                .agent(Agent::new("AnalystAgent", "You analyze.", llm))
                .build()
                .unwrap(),
        );

        let snapshots: Vec<_> = network
            .stream(vec![Message::user("go")])
            .collect::<Vec<_>>()
            .await;

        // supervisor, agent, supervisor(FINISH)
        assert_eq!(snapshots.len(), 3);
        let second = snapshots[1].as_ref().unwrap();
        assert_eq!(second.node, "AnalystAgent");
        assert_eq!(second.new_messages.len(), 1);
    }

    #[tokio::test]
    async fn builder_rejects_duplicate_tools() {
        let llm = ScriptedProvider::new(vec![], vec![]);
        let result = AgentNetwork::builder(llm.clone())
            .agent(
                Agent::new("A", "a", llm.clone()).with_tool(Arc::new(MarketDataTool)),
            )
            .agent(Agent::new("B", "b", llm).with_tool(Arc::new(MarketDataTool)))
            .build();
        assert!(matches!(result, Err(NetworkError::DuplicateTool { .. })));
    }

    #[tokio::test]
    async fn builder_rejects_unregistered_prerequisite_target() {
        let llm = ScriptedProvider::new(vec![], vec![]);
        let edges = AgentEdges::default().with_prerequisite(Prerequisite::new(
            "MissingAgent",
            |_: &SharedContext| true,
        ));
        let result = AgentNetwork::builder(llm.clone())
            .agent_with_edges(Agent::new("A", "a", llm), edges)
            .build();
        assert!(matches!(result, Err(NetworkError::UnknownRoute { .. })));
    }

    #[tokio::test]
    async fn builder_rejects_empty_network() {
        let llm = ScriptedProvider::new(vec![], vec![]);
        assert!(matches!(
            AgentNetwork::builder(llm).build(),
            Err(NetworkError::NoAgents)
        ));
    }
}
