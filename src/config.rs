//! Configuration loaded once from the environment.
//!
//! Everything the service needs is resolved up front into a typed
//! [`Config`]; nothing reads the environment after startup. Secrets are
//! wrapped in [`SecretString`] so they never land in logs or debug output.

use std::net::SocketAddr;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub embeddings: EmbeddingsConfig,
    pub store: StoreConfig,
    pub market: MarketConfig,
    pub server: ServerConfig,
    pub network: NetworkConfig,
}

/// Azure OpenAI chat completions settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    pub api_key: SecretString,
    pub deployment: String,
    pub api_version: String,
}

/// Azure OpenAI embeddings settings.
#[derive(Debug, Clone)]
pub struct EmbeddingsConfig {
    pub deployment: String,
}

/// Managed document store settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Account endpoint, e.g. `https://my-account.documents.azure.com`.
    pub host: String,
    pub master_key: SecretString,
    pub database: String,
    pub containers: ContainerConfig,
}

/// Container names for each document corpus.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    pub stock_news: String,
    pub expert_news: String,
    pub web: String,
    pub mutual_fund: String,
    pub company_rank: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            stock_news: "stock-news".to_string(),
            expert_news: "expert-news".to_string(),
            web: "bank-web".to_string(),
            mutual_fund: "mutual-fund".to_string(),
            company_rank: "company-rank".to_string(),
        }
    }
}

/// Market data API endpoints.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub quote_base_url: String,
    pub fund_base_url: String,
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

/// Routing network settings.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Maximum number of graph steps per run.
    pub step_limit: usize,
    /// How many top-ranked companies to inject into agent prompts.
    pub top_companies: usize,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            llm: LlmConfig {
                endpoint: required("AZURE_OPENAI_ENDPOINT")?,
                api_key: required("AZURE_OPENAI_API_KEY")?.into(),
                deployment: required("AZURE_OPENAI_CHAT_DEPLOYMENT")?,
                api_version: optional("AZURE_OPENAI_API_VERSION", "2024-02-01"),
            },
            embeddings: EmbeddingsConfig {
                deployment: required("AZURE_OPENAI_EMBEDDINGS_DEPLOYMENT")?,
            },
            store: StoreConfig {
                host: required("COSMOS_HOST")?,
                master_key: required("COSMOS_MASTER_KEY")?.into(),
                database: required("COSMOS_DATABASE")?,
                containers: ContainerConfig {
                    stock_news: optional("COSMOS_STOCK_NEWS_CONTAINER", "stock-news"),
                    expert_news: optional("COSMOS_EXPERT_NEWS_CONTAINER", "expert-news"),
                    web: optional("COSMOS_WEB_CONTAINER", "bank-web"),
                    mutual_fund: optional("COSMOS_MUTUAL_FUND_CONTAINER", "mutual-fund"),
                    company_rank: optional("COSMOS_COMPANY_RANK_CONTAINER", "company-rank"),
                },
            },
            market: MarketConfig {
                quote_base_url: optional(
                    "MARKET_QUOTE_BASE_URL",
                    "https://query1.finance.yahoo.com",
                ),
                fund_base_url: optional("MARKET_FUND_BASE_URL", "https://groww.in/v1/api"),
            },
            server: ServerConfig {
                bind: parse("BIND_ADDR", "0.0.0.0:8000")?,
            },
            network: NetworkConfig {
                step_limit: parse("NETWORK_STEP_LIMIT", "20")?,
                top_companies: parse("TOP_COMPANIES", "5")?,
            },
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse<T>(name: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional(name, default)
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            var: name,
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_defaults() {
        let containers = ContainerConfig::default();
        assert_eq!(containers.stock_news, "stock-news");
        assert_eq!(containers.mutual_fund, "mutual-fund");
    }

    #[test]
    fn parse_falls_back_to_default() {
        let limit: usize = parse("SMARTWEALTH_TEST_UNSET_VAR", "20").unwrap();
        assert_eq!(limit, 20);
    }
}
