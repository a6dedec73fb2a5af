//! The production advisory agents and their network assembly.

mod investor;
mod market_analyzer;
mod personal_finance;
pub mod prompts;

pub use investor::{
    AssetAllocationTool, INVESTOR, MutualFundAllocationTool, StockAllocationTool, investor_agent,
};
pub use market_analyzer::{
    ExpertAnalysisTool, MARKET_ANALYZER, NewsArticlesTool, StockMetricsTool, market_analyzer_agent,
};
pub use personal_finance::{PERSONAL_FINANCE, WebsiteSearchTool, personal_finance_agent};

use std::sync::Arc;

use crate::config::Config;
use crate::error::{NetworkError, StoreError};
use crate::llm::LlmProvider;
use crate::market::MarketDataClient;
use crate::network::AgentNetwork;
use crate::store::{CompanyRankStore, DocumentStore};

/// Everything needed to assemble the advisory network.
pub struct AdvisoryDeps {
    pub llm: Arc<dyn LlmProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub market: Arc<MarketDataClient>,
    pub config: Arc<Config>,
}

/// Errors from network assembly.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Build the three-agent advisory network for one run.
///
/// The top-companies ranking is fetched here, once per run, and baked
/// into the agent prompts.
pub async fn build_advisory_network(deps: &AdvisoryDeps) -> Result<AgentNetwork, AssemblyError> {
    let containers = &deps.config.store.containers;

    let ranks = CompanyRankStore::new(Arc::clone(&deps.store), containers.company_rank.clone());
    let top_companies = ranks.top_companies(deps.config.network.top_companies).await?;
    tracing::debug!(count = top_companies.len(), "fetched company ranking");

    let analyzer = market_analyzer_agent(
        Arc::clone(&deps.llm),
        Arc::clone(&deps.store),
        Arc::clone(&deps.market),
        &containers.stock_news,
        &containers.expert_news,
        &top_companies,
    );
    let (investor, investor_edges) = investor_agent(
        Arc::clone(&deps.llm),
        Arc::clone(&deps.store),
        &containers.mutual_fund,
        &top_companies,
    );
    let finance = personal_finance_agent(
        Arc::clone(&deps.llm),
        Arc::clone(&deps.store),
        &containers.web,
    );

    let members = vec![
        MARKET_ANALYZER.to_string(),
        INVESTOR.to_string(),
        PERSONAL_FINANCE.to_string(),
    ];

    let network = AgentNetwork::builder(Arc::clone(&deps.llm))
        .agent(analyzer)
        .agent_with_edges(investor, investor_edges)
        .agent(finance)
        .supervisor_prompt(prompts::supervisor_prompt(&members))
        .step_limit(deps.config.network.step_limit)
        .build()?;

    Ok(network)
}
