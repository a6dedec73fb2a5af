//! End-to-end routing flow through the public network API.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use smartwealth::error::{LlmError, ToolError};
use smartwealth::llm::{
    CompletionRequest, CompletionResponse, FinishReason, LlmProvider, ToolCall, ToolChoice,
    ToolCompletionRequest, ToolCompletionResponse,
};
use smartwealth::network::{
    Agent, AgentEdges, AgentNetwork, AgentTool, ContextSink, Message, Prerequisite, Role,
    SharedContext, ToolOutput,
};

/// Replays a fixed script: routing decisions for supervisor turns,
/// agent responses for everything else.
struct ScriptedProvider {
    routes: Mutex<Vec<String>>,
    turns: Mutex<Vec<Turn>>,
}

enum Turn {
    Text(String),
    Calls(Vec<ToolCall>),
}

impl ScriptedProvider {
    fn new(routes: Vec<&str>, turns: Vec<Turn>) -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(routes.into_iter().rev().map(str::to_string).collect()),
            turns: Mutex::new({
                let mut turns = turns;
                turns.reverse();
                turns
            }),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(&self, _req: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        match self.turns.lock().unwrap().pop() {
            Some(Turn::Text(text)) => Ok(CompletionResponse {
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
        if matches!(req.tool_choice, Some(ToolChoice::Function(ref name)) if name == "route") {
            let next = self
                .routes
                .lock()
                .unwrap()
                .pop()
                .expect("script ran out of routes");
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

        match self.turns.lock().unwrap().pop().expect("script ran out of turns") {
            Turn::Text(text) => Ok(ToolCompletionResponse {
                content: Some(text),
                tool_calls: vec![],
                finish_reason: FinishReason::Stop,
                input_tokens: 0,
                output_tokens: 0,
            }),
            Turn::Calls(calls) => Ok(ToolCompletionResponse {
                content: None,
                tool_calls: calls,
                finish_reason: FinishReason::ToolUse,
                input_tokens: 0,
                output_tokens: 0,
            }),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Stands in for the market analyzer's retrieval tools.
struct AnalysisTool;

#[async_trait]
impl AgentTool for AnalysisTool {
    fn name(&self) -> &str {
        "get_company_analysis"
    }

    fn description(&self) -> &str {
        "Fetch analysis for the companies under discussion."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "company_list": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["company_list"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &SharedContext,
    ) -> Result<ToolOutput, ToolError> {
        let companies = params["company_list"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        Ok(ToolOutput::json(serde_json::json!([{
            "companies": companies,
            "news_summary": ["strong quarterly results"],
        }])))
    }

    fn context_sink(&self) -> Option<ContextSink> {
        Some(ContextSink::MarketData)
    }
}

/// Full advisory-shaped flow: the supervisor sends the allocator in first,
/// its unmet prerequisite bounces control to the analyzer, the analyzer
/// gathers data through a tool call, and the allocator then finishes with
/// the completion sentinel.
#[tokio::test]
async fn advisory_flow_message_sequence() {
    let llm = ScriptedProvider::new(
        vec!["AllocatorAgent", "AllocatorAgent"],
        vec![
            // Allocator runs first; market data is still missing.
            Turn::Text("I need market data first.".to_string()),
            // Analyzer requests its tool, then reports back.
            Turn::Calls(vec![ToolCall {
                id: "call_1".to_string(),
                name: "get_company_analysis".to_string(),
                arguments: serde_json::json!({"company_list": ["Acme"]}),
            }]),
            Turn::Text("Market data gathered.".to_string()),
            // Allocator gets re-routed in and completes.
            Turn::Text("FINAL ANSWER: 70% equity, 30% gold.".to_string()),
        ],
    );

    let analyzer = Agent::new("AnalystAgent", "You analyze markets.", llm.clone())
        .with_tool(Arc::new(AnalysisTool));
    let allocator_edges = AgentEdges::default().with_prerequisite(Prerequisite::new(
        "AnalystAgent",
        |ctx: &SharedContext| !ctx.market_data.is_empty(),
    ));
    let allocator = Agent::new("AllocatorAgent", "You allocate assets.", llm.clone());

    let network = AgentNetwork::builder(llm)
        .agent(analyzer)
        .agent_with_edges(allocator, allocator_edges)
        .step_limit(20)
        .build()
        .unwrap();

    let state = network
        .run(vec![Message::user("Allocate my savings of 50000.")])
        .await
        .unwrap();

    let trace: Vec<(Role, Option<&str>)> = state
        .messages
        .iter()
        .map(|m| (m.role, m.author.as_deref()))
        .collect();

    assert_eq!(
        trace,
        vec![
            (Role::User, None),
            // Allocator blocked by its prerequisite after answering.
            (Role::Agent, Some("AllocatorAgent")),
            // Analyzer requests and receives its tool data.
            (Role::Agent, Some("AnalystAgent")),
            (Role::Tool, Some("get_company_analysis")),
            (Role::Agent, Some("AnalystAgent")),
            // Supervisor sends the allocator back in; it now finishes.
            (Role::Agent, Some("AllocatorAgent")),
        ]
    );

    assert!(!state.context.market_data.is_empty());
    assert!(
        state
            .last_message()
            .unwrap()
            .content
            .starts_with("FINAL ANSWER")
    );
}

/// A supervisor that immediately finishes leaves the log untouched.
#[tokio::test]
async fn immediate_finish_returns_input_unchanged() {
    let llm = ScriptedProvider::new(vec!["FINISH"], vec![]);
    let network = AgentNetwork::builder(llm.clone())
        .agent(Agent::new("AnalystAgent", "You analyze markets.", llm))
        .build()
        .unwrap();

    let input = vec![
        Message::user("hello"),
        Message::assistant("hi, how can I help?"),
    ];
    let state = network.run(input.clone()).await.unwrap();

    assert_eq!(state.messages.len(), input.len());
    assert!(state.context.market_data.is_empty());
}
