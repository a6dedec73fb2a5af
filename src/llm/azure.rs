//! Azure OpenAI provider implementation.
//!
//! Uses the deployments-based chat completions and embeddings endpoints
//! with `api-key` header authentication.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::{EmbeddingsConfig, LlmConfig};
use crate::error::LlmError;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, EmbeddingProvider, FinishReason,
    LlmProvider, Role, ToolCall, ToolChoice, ToolCompletionRequest, ToolCompletionResponse,
};

const PROVIDER: &str = "azure_openai";

/// Azure OpenAI chat completions provider.
pub struct AzureOpenAiProvider {
    client: Client,
    config: LlmConfig,
}

impl AzureOpenAiProvider {
    pub fn new(config: LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }

    async fn send_request(
        &self,
        body: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let url = self.completions_url();

        tracing::debug!(model = %self.config.deployment, "sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("api-key", self.config.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let response_text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(LlmError::AuthFailed {
                    provider: PROVIDER.to_string(),
                });
            }
            if status.as_u16() == 429 {
                return Err(LlmError::RateLimited {
                    provider: PROVIDER.to_string(),
                    retry_after: None,
                });
            }
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {}: {}", status, response_text),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("JSON parse error: {}. Raw: {}", e, response_text),
        })
    }
}

fn finish_reason(raw: Option<&str>, has_tool_calls: bool) -> FinishReason {
    let raw = raw.unwrap_or("");
    if raw.contains("tool_calls") || raw.contains("function_call") || has_tool_calls {
        FinishReason::ToolUse
    } else if raw.contains("stop") {
        FinishReason::Stop
    } else if raw.contains("length") {
        FinishReason::Length
    } else if raw.contains("content_filter") {
        FinishReason::ContentFilter
    } else {
        FinishReason::Unknown
    }
}

#[async_trait]
impl LlmProvider for AzureOpenAiProvider {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let request = ChatCompletionRequest {
            messages: req.messages.into_iter().map(Into::into).collect(),
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            tools: None,
            tool_choice: None,
        };

        let response = self.send_request(&request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "No choices in response".to_string(),
            })?;

        let content = choice
            .message
            .as_ref()
            .and_then(|m| m.content.clone())
            .unwrap_or_default();

        Ok(CompletionResponse {
            content,
            finish_reason: finish_reason(choice.finish_reason.as_deref(), false),
            input_tokens: response.usage.prompt_tokens,
            output_tokens: response.usage.completion_tokens,
        })
    }

    async fn complete_with_tools(
        &self,
        req: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse, LlmError> {
        let tools: Vec<ChatCompletionTool> = req
            .tools
            .into_iter()
            .map(|t| ChatCompletionTool {
                tool_type: "function".to_string(),
                function: ChatCompletionFunction {
                    name: t.name,
                    description: Some(t.description),
                    parameters: Some(t.parameters),
                },
            })
            .collect();

        let tool_choice = req.tool_choice.map(|choice| match choice {
            ToolChoice::Auto => serde_json::json!("auto"),
            ToolChoice::Function(name) => serde_json::json!({
                "type": "function",
                "function": { "name": name }
            }),
        });

        let request = ChatCompletionRequest {
            messages: req.messages.into_iter().map(Into::into).collect(),
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            tools: if tools.is_empty() { None } else { Some(tools) },
            tool_choice,
        };

        let response = self.send_request(&request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "No choices in response".to_string(),
            })?;

        let (content, raw_calls) = match choice.message {
            Some(msg) => (msg.content, msg.tool_calls.unwrap_or_default()),
            None => (None, Vec::new()),
        };

        let tool_calls: Vec<ToolCall> = raw_calls
            .into_iter()
            .map(|tc| {
                let arguments = serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(serde_json::Value::Object(Default::default()));
                ToolCall {
                    id: tc.id,
                    name: tc.function.name,
                    arguments,
                }
            })
            .collect();

        let has_tool_calls = !tool_calls.is_empty();

        Ok(ToolCompletionResponse {
            content,
            tool_calls,
            finish_reason: finish_reason(choice.finish_reason.as_deref(), has_tool_calls),
            input_tokens: response.usage.prompt_tokens,
            output_tokens: response.usage.completion_tokens,
        })
    }

    fn model_name(&self) -> &str {
        &self.config.deployment
    }
}

/// Azure OpenAI embeddings provider.
pub struct AzureOpenAiEmbeddings {
    client: Client,
    llm: LlmConfig,
    config: EmbeddingsConfig,
}

impl AzureOpenAiEmbeddings {
    pub fn new(llm: LlmConfig, config: EmbeddingsConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            llm,
            config,
        }
    }

    fn embeddings_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            self.llm.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.llm.api_version
        )
    }
}

#[async_trait]
impl EmbeddingProvider for AzureOpenAiEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let response = self
            .client
            .post(self.embeddings_url())
            .header("api-key", self.llm.api_key.expose_secret())
            .json(&serde_json::json!({ "input": text }))
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let response_text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("HTTP {}: {}", status, response_text),
            });
        }

        let parsed: EmbeddingsResponse =
            serde_json::from_str(&response_text).map_err(|e| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: format!("JSON parse error: {}", e),
            })?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "No embedding in response".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.config.deployment
    }
}

// Chat completions wire types.

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    messages: Vec<ChatCompletionMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatCompletionTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatCompletionMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatCompletionToolCall>>,
}

impl From<ChatMessage> for ChatCompletionMessage {
    fn from(msg: ChatMessage) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        let tool_calls = msg.tool_calls.map(|calls| {
            calls
                .into_iter()
                .map(|tc| ChatCompletionToolCall {
                    id: tc.id,
                    call_type: "function".to_string(),
                    function: ChatCompletionToolCallFunction {
                        name: tc.name,
                        arguments: tc.arguments.to_string(),
                    },
                })
                .collect()
        });
        Self {
            role: role.to_string(),
            content: Some(msg.content),
            name: msg.name,
            tool_call_id: msg.tool_call_id,
            tool_calls,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: ChatCompletionFunction,
}

#[derive(Debug, Serialize)]
struct ChatCompletionFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    usage: ChatCompletionUsage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: Option<ChatCompletionResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatCompletionToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatCompletionToolCall {
    id: String,
    #[serde(rename = "type")]
    #[allow(dead_code)]
    call_type: String,
    function: ChatCompletionToolCallFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatCompletionToolCallFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingsEntry>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsEntry {
    embedding: Vec<f32>,
}
