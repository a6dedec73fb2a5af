//! LLM integration.
//!
//! The chat model and the embedding model are both reached through the
//! Azure OpenAI deployments API; everything above this module talks to
//! the [`LlmProvider`] and [`EmbeddingProvider`] traits only.

mod azure;
mod provider;

pub use azure::{AzureOpenAiEmbeddings, AzureOpenAiProvider};
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, EmbeddingProvider, FinishReason,
    LlmProvider, Role, ToolCall, ToolChoice, ToolCompletionRequest, ToolCompletionResponse,
    ToolDefinition,
};

use std::sync::Arc;

use crate::config::Config;

/// Build the chat provider from configuration.
pub fn create_llm_provider(config: &Config) -> Arc<dyn LlmProvider> {
    tracing::info!(deployment = %config.llm.deployment, "using Azure OpenAI chat deployment");
    Arc::new(AzureOpenAiProvider::new(config.llm.clone()))
}

/// Build the embedding provider from configuration.
pub fn create_embedding_provider(config: &Config) -> Arc<dyn EmbeddingProvider> {
    Arc::new(AzureOpenAiEmbeddings::new(
        config.llm.clone(),
        config.embeddings.clone(),
    ))
}
