//! Investment allocation agent.
//!
//! Splits the principal across equity, mutual funds, and gold, then
//! drills into concrete fund and stock picks. Requires market data in the
//! shared context before it can allocate, declared as a prerequisite
//! redirect to the market analyzer.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::documents::{CompanyRank, MutualFundDocument};
use crate::error::ToolError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};
use crate::network::{
    Agent, AgentEdges, AgentTool, ContextSink, InvestmentPeriod, Prerequisite, RiskTolerance,
    SharedContext, ToolOutput,
};
use crate::store::{Condition, DocumentStore, Filter};

use super::prompts;

pub const INVESTOR: &str = "InvestorAgent";

/// How many funds an allocation answer includes at most.
const MAX_FUND_SUGGESTIONS: usize = 5;

/// Fund category for a period/risk combination.
fn fund_type(period: InvestmentPeriod, risk: RiskTolerance) -> &'static str {
    match (period, risk) {
        (InvestmentPeriod::ShortTerm, RiskTolerance::Low) => "debt mutual fund",
        (InvestmentPeriod::ShortTerm, RiskTolerance::Medium) => "liquid fund",
        (InvestmentPeriod::ShortTerm, RiskTolerance::High) => "hybrid fund",
        (InvestmentPeriod::MidTerm, RiskTolerance::Low) => "balanced large-cap mutual fund",
        (InvestmentPeriod::MidTerm, RiskTolerance::Medium) => "balanced large-cap mutual fund",
        (InvestmentPeriod::MidTerm, RiskTolerance::High) => "multi-cap mutual funds",
        (InvestmentPeriod::LongTerm, RiskTolerance::Low) => "large-cap mutual funds",
        (InvestmentPeriod::LongTerm, RiskTolerance::Medium) => "mid-cap mutual funds",
        (InvestmentPeriod::LongTerm, RiskTolerance::High) => "small-cap mutual funds",
    }
}

/// Splits the principal by age: equity gets 100 minus the age rounded up
/// to the next ten, 65% of equity goes to mutual funds, the rest to gold.
pub struct AssetAllocationTool;

#[async_trait]
impl AgentTool for AssetAllocationTool {
    fn name(&self) -> &str {
        "asset_allocation"
    }

    fn description(&self) -> &str {
        "Allocates portions of the principal amount into Equity, Mutual Funds and Gold."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "age": {
                    "type": "integer",
                    "description": "The investor's age in years"
                }
            },
            "required": ["age"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &SharedContext,
    ) -> Result<ToolOutput, ToolError> {
        let age = params
            .get("age")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| ToolError::InvalidParameters("missing 'age' parameter".to_string()))?;

        let rounded_age = age.div_ceil(10) * 10;
        let equity = Decimal::from(100u64.saturating_sub(rounded_age));
        let mutual_funds = equity * dec!(0.65);
        let gold = equity - mutual_funds;

        Ok(ToolOutput::json(serde_json::json!({
            "equity": equity,
            "mutual_funds": mutual_funds,
            "gold": gold,
        })))
    }

    fn context_sink(&self) -> Option<ContextSink> {
        Some(ContextSink::PortfolioAllocation)
    }
}

/// Suggests concrete funds matching the investor's profile and the
/// analyst's suggested companies.
pub struct MutualFundAllocationTool {
    store: Arc<dyn DocumentStore>,
    container: String,
}

impl MutualFundAllocationTool {
    pub fn new(store: Arc<dyn DocumentStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }
}

#[async_trait]
impl AgentTool for MutualFundAllocationTool {
    fn name(&self) -> &str {
        "allocate_mutual_funds"
    }

    fn description(&self) -> &str {
        "Provides guidance on how to allocate a portion of the portfolio across mutual funds."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "mutual_fund_split": {
                    "type": "number",
                    "description": "Amount earmarked for mutual funds"
                },
                "suggested_companies": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Ticker symbols the analysis favored"
                },
                "desired_sector": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Sectors the user wants exposure to"
                }
            },
            "required": ["mutual_fund_split", "suggested_companies", "desired_sector"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &SharedContext,
    ) -> Result<ToolOutput, ToolError> {
        let suggested_companies = string_list(&params, "suggested_companies")?;
        let desired_sector = string_list(&params, "desired_sector")?;

        let fund_type = fund_type(ctx.investment_period, ctx.risk_tolerance);

        let filter = Filter::and(vec![
            Filter::field(
                "c.document_meta.sectoral_composition_list",
                Condition::ContainsAny(desired_sector),
            ),
            Filter::field(
                "c.document_meta.scheme_riskometer",
                Condition::LikeIgnoreCase(fund_type.to_string()),
            ),
            Filter::field(
                "c.document_meta.tickers",
                Condition::ContainsAny(suggested_companies),
            ),
        ]);

        let columns = vec!["document_meta".to_string()];
        let items = self
            .store
            .filter_documents(&self.container, &filter, Some(&columns))
            .await?;

        let funds: Vec<serde_json::Value> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<MutualFundDocument>(item).ok())
            .take(MAX_FUND_SUGGESTIONS)
            .map(|doc| {
                let meta = doc.document_meta;
                serde_json::json!({
                    "fund_name": meta.fund_name,
                    "investment_objective": meta.investment_objective,
                    "scheme_riskometer": meta.scheme_riskometer,
                    "portfolio": meta.portfolio,
                    "minimum_investment_amount": meta.minimum_investment_amount,
                })
            })
            .collect();

        Ok(ToolOutput::json(serde_json::Value::Array(funds)))
    }
}

/// Asks the model to pick stocks and quantities for the investor profile.
pub struct StockAllocationTool {
    llm: Arc<dyn LlmProvider>,
}

impl StockAllocationTool {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    fn advisor_prompt(ctx: &SharedContext) -> String {
        format!(
            "You are a financial advisor holding a list of well-performing \
             companies with their related financial news and key ratios. You \
             also know the investor's profile. Recommend the best stocks to \
             buy and the quantity of each to maximize returns within the \
             investor's means.\n\n\
             Investor profile: age {age}, risk tolerance {risk:?}, investment \
             horizon {period:?}.\n\n\
             Respond with JSON objects only, each shaped as \
             {{\"company_name\": ..., \"quantity\": ..., \"reason\": ...}}. \
             Keep the total inside the investor's balance and aligned with \
             their risk tolerance and horizon. Return only JSON.",
            age = ctx.age,
            risk = ctx.risk_tolerance,
            period = ctx.investment_period,
        )
    }
}

#[async_trait]
impl AgentTool for StockAllocationTool {
    fn name(&self) -> &str {
        "allocate_stocks"
    }

    fn description(&self) -> &str {
        "Allocates the investment balance among selected stocks based on expected returns."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "suggested_companies": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Companies the analysis favored"
                }
            },
            "required": ["suggested_companies"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &SharedContext,
    ) -> Result<ToolOutput, ToolError> {
        let suggested = string_list(&params, "suggested_companies")?;

        let messages = vec![
            ChatMessage::system(Self::advisor_prompt(ctx)),
            ChatMessage::user(serde_json::Value::from(suggested).to_string()),
        ];

        let response = self
            .llm
            .complete(CompletionRequest::new(messages).with_temperature(0.0))
            .await?;

        Ok(ToolOutput::text(response.content))
    }
}

fn string_list(params: &serde_json::Value, key: &str) -> Result<Vec<String>, ToolError> {
    match params.get(key) {
        Some(serde_json::Value::Array(items)) => Ok(items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()),
        // Tolerate a single scalar where a list is expected.
        Some(serde_json::Value::String(s)) => Ok(vec![s.clone()]),
        _ => Err(ToolError::InvalidParameters(format!(
            "missing '{}' parameter",
            key
        ))),
    }
}

/// Assemble the investor agent with its tools and prerequisite edges.
pub fn investor_agent(
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn DocumentStore>,
    fund_container: &str,
    top_companies: &[CompanyRank],
) -> (Agent, AgentEdges) {
    let agent = Agent::new(INVESTOR, prompts::investor_prompt(top_companies), Arc::clone(&llm))
        .with_tool(Arc::new(AssetAllocationTool))
        .with_tool(Arc::new(MutualFundAllocationTool::new(store, fund_container)))
        .with_tool(Arc::new(StockAllocationTool::new(llm)));

    // The allocator cannot act before the analyzer has produced market data.
    let edges = AgentEdges::default().with_prerequisite(Prerequisite::new(
        super::market_analyzer::MARKET_ANALYZER,
        |ctx: &SharedContext| !ctx.market_data.is_empty(),
    ));

    (agent, edges)
}
