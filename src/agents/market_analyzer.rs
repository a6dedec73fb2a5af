//! Market analysis agent: news, expert commentary, and quote metrics.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;

use crate::documents::{CompanyRank, ExpertDocument, NewsDocument};
use crate::error::ToolError;
use crate::llm::LlmProvider;
use crate::market::MarketDataClient;
use crate::network::{Agent, AgentTool, ContextSink, SharedContext, ToolOutput};
use crate::store::{DocumentStore, SearchOptions};

use super::prompts;

pub const MARKET_ANALYZER: &str = "MarketAnalyzerAgent";

/// News angles searched per company.
const NEWS_ATTRIBUTES: [&str; 4] = [
    "an acquisition",
    "new product launches",
    "new partnerships or collaborations",
    "financial results",
];

const SEARCH_TOP_K: usize = 3;
const SEARCH_THRESHOLD: f64 = 0.3;

fn search_queries(company: &str) -> Vec<String> {
    NEWS_ATTRIBUTES
        .iter()
        .map(|attribute| format!("Documents having news related to {} of {}", attribute, company))
        .collect()
}

fn company_list(params: &serde_json::Value) -> Result<Vec<String>, ToolError> {
    params
        .get("company_list")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .ok_or_else(|| ToolError::InvalidParameters("missing 'company_list' parameter".to_string()))
}

fn company_list_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "company_list": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Company names to look up"
            }
        },
        "required": ["company_list"]
    })
}

/// Searches the stock news corpus per company and attribute.
pub struct NewsArticlesTool {
    store: Arc<dyn DocumentStore>,
    container: String,
}

impl NewsArticlesTool {
    pub fn new(store: Arc<dyn DocumentStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }
}

#[async_trait]
impl AgentTool for NewsArticlesTool {
    fn name(&self) -> &str {
        "get_news_articles"
    }

    fn description(&self) -> &str {
        "Get news summaries for the provided list of companies."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        company_list_schema()
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &SharedContext,
    ) -> Result<ToolOutput, ToolError> {
        let companies = company_list(&params)?;

        let mut aggregated: BTreeMap<String, (BTreeSet<String>, BTreeSet<String>)> =
            BTreeMap::new();

        for company in &companies {
            for query in search_queries(company) {
                let results = self
                    .store
                    .vector_search(
                        &self.container,
                        &query,
                        SearchOptions::default()
                            .with_top_k(SEARCH_TOP_K)
                            .with_threshold(SEARCH_THRESHOLD),
                    )
                    .await?;

                for result in results {
                    let Ok(doc) = serde_json::from_value::<NewsDocument>(result.document) else {
                        continue;
                    };
                    let entry = aggregated.entry(company.clone()).or_default();
                    entry.0.insert(doc.document_meta.sector);
                    entry.1.insert(doc.document_meta.summary);
                }
            }
        }

        let payload: Vec<serde_json::Value> = aggregated
            .into_iter()
            .map(|(company, (sectors, summaries))| {
                serde_json::json!({
                    "company_name": company,
                    "sector": sectors.into_iter().collect::<Vec<_>>(),
                    "news_summary": summaries.into_iter().collect::<Vec<_>>(),
                })
            })
            .collect();

        Ok(ToolOutput::json(serde_json::Value::Array(payload)))
    }

    fn context_sink(&self) -> Option<ContextSink> {
        Some(ContextSink::MarketData)
    }
}

/// Searches the expert commentary corpus per company and attribute.
pub struct ExpertAnalysisTool {
    store: Arc<dyn DocumentStore>,
    container: String,
}

impl ExpertAnalysisTool {
    pub fn new(store: Arc<dyn DocumentStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }
}

#[async_trait]
impl AgentTool for ExpertAnalysisTool {
    fn name(&self) -> &str {
        "get_expert_analysis"
    }

    fn description(&self) -> &str {
        "Get expert analysis for the provided list of companies."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        company_list_schema()
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &SharedContext,
    ) -> Result<ToolOutput, ToolError> {
        let companies = company_list(&params)?;

        let mut aggregated: BTreeMap<String, (BTreeSet<String>, BTreeSet<String>)> =
            BTreeMap::new();

        for company in &companies {
            for query in search_queries(company) {
                let results = self
                    .store
                    .vector_search(
                        &self.container,
                        &query,
                        SearchOptions::default()
                            .with_top_k(SEARCH_TOP_K)
                            .with_threshold(SEARCH_THRESHOLD),
                    )
                    .await?;

                for result in results {
                    let Ok(doc) = serde_json::from_value::<ExpertDocument>(result.document) else {
                        continue;
                    };
                    let entry = aggregated.entry(company.clone()).or_default();
                    entry.0.extend(doc.document_meta.segments);
                    entry.1.insert(doc.document_meta.summary);
                }
            }
        }

        let payload: Vec<serde_json::Value> = aggregated
            .into_iter()
            .map(|(company, (segments, summaries))| {
                serde_json::json!({
                    "company_name": company,
                    "segments": segments.into_iter().collect::<Vec<_>>(),
                    "analysis_summary": summaries.into_iter().collect::<Vec<_>>(),
                })
            })
            .collect();

        Ok(ToolOutput::json(serde_json::Value::Array(payload)))
    }

    fn context_sink(&self) -> Option<ContextSink> {
        Some(ContextSink::MarketData)
    }
}

/// Resolves tickers and fetches quote metrics per company.
pub struct StockMetricsTool {
    market: Arc<MarketDataClient>,
}

impl StockMetricsTool {
    pub fn new(market: Arc<MarketDataClient>) -> Self {
        Self { market }
    }
}

#[async_trait]
impl AgentTool for StockMetricsTool {
    fn name(&self) -> &str {
        "get_stock_metrics"
    }

    fn description(&self) -> &str {
        "Get current quote metrics for the provided list of companies."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        company_list_schema()
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &SharedContext,
    ) -> Result<ToolOutput, ToolError> {
        let companies = company_list(&params)?;

        let mut payload = Vec::with_capacity(companies.len());
        for company in &companies {
            let details = match self.market.resolve_ticker(company).await {
                Ok(ticker) => self.market.stock_details(&ticker).await,
                Err(e) => Err(e),
            };

            match details {
                Ok(details) => payload.push(serde_json::json!({
                    "company_name": company,
                    "metrics": details,
                })),
                Err(e) => {
                    tracing::warn!(company, error = %e, "quote lookup failed");
                    payload.push(serde_json::json!({
                        "company_name": company,
                        "error": "quote currently unavailable",
                    }));
                }
            }
        }

        Ok(ToolOutput::json(serde_json::Value::Array(payload)))
    }

    fn context_sink(&self) -> Option<ContextSink> {
        Some(ContextSink::MarketData)
    }
}

/// Assemble the market analyzer with its three tools.
pub fn market_analyzer_agent(
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn DocumentStore>,
    market: Arc<MarketDataClient>,
    news_container: &str,
    expert_container: &str,
    top_companies: &[CompanyRank],
) -> Agent {
    Agent::new(
        MARKET_ANALYZER,
        prompts::market_analyzer_prompt(top_companies),
        llm,
    )
    .with_tool(Arc::new(NewsArticlesTool::new(
        Arc::clone(&store),
        news_container,
    )))
    .with_tool(Arc::new(ExpertAnalysisTool::new(store, expert_container)))
    .with_tool(Arc::new(StockMetricsTool::new(market)))
}
