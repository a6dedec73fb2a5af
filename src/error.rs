//! Error types for every subsystem.
//!
//! Each boundary gets its own `thiserror` enum. Collaborator failures are
//! caught and converted at the tool boundary; only configuration defects
//! and an exhausted step budget escape a network run as hard errors.

use std::time::Duration;

use thiserror::Error;

/// Errors from LLM providers.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Authentication failed for provider '{provider}'")]
    AuthFailed { provider: String },

    #[error("Request to provider '{provider}' failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Rate limited by provider '{provider}'")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from provider '{provider}': {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Errors from agent tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl From<StoreError> for ToolError {
    fn from(err: StoreError) -> Self {
        ToolError::ExternalService(err.to_string())
    }
}

impl From<LlmError> for ToolError {
    fn from(err: LlmError) -> Self {
        ToolError::ExternalService(err.to_string())
    }
}

/// Errors from parsing or compiling a filter specification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Unsupported filter operator '{0}'")]
    UnsupportedOperator(String),

    #[error("Malformed filter spec: {0}")]
    MalformedSpec(String),
}

/// Errors from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Embedding request failed: {0}")]
    Embedding(#[source] LlmError),

    #[error("Store request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("Invalid store response: {reason}")]
    InvalidResponse { reason: String },

    #[error("Invalid master key: {reason}")]
    InvalidKey { reason: String },
}

/// Errors from a routing network run.
///
/// Everything here is terminal for the run in progress: wiring defects
/// fail fast, and the step budget is never silently truncated.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("No tool named '{name}' is registered with the network")]
    UnknownTool { name: String },

    #[error("Routed to unknown participant '{name}'")]
    UnknownRoute { name: String },

    #[error("Step limit of {limit} exceeded before the conversation finished")]
    StepLimitExceeded { limit: usize },

    #[error("Supervisor call failed: {0}")]
    Supervisor(#[from] LlmError),

    #[error("No agents are registered with the network")]
    NoAgents,

    #[error("Duplicate tool name '{name}' across registered agents")]
    DuplicateTool { name: String },
}

/// Errors from the market data client.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("Market data request failed: {0}")]
    RequestFailed(String),

    #[error("No ticker found for '{0}'")]
    TickerNotFound(String),

    #[error("Unexpected payload from market data API: {0}")]
    InvalidResponse(String),
}

/// Errors raised while loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}
