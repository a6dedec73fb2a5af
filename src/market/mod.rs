//! Market data lookups over external quote and fund APIs.
//!
//! Ticker resolution is idempotent and retried a bounded number of times;
//! everything else surfaces a user-safe payload on failure so tool output
//! stays presentable.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::MarketConfig;
use crate::error::MarketError;

/// Attempts for one ticker lookup before surfacing a terminal failure.
const TICKER_LOOKUP_ATTEMPTS: usize = 5;

/// Quote details for one listed company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockDetails {
    pub symbol: String,
    #[serde(rename = "companyName")]
    pub company_name: String,
    #[serde(rename = "currentPrice")]
    pub current_price: f64,
    #[serde(rename = "oneYearChange")]
    pub one_year_change: Option<f64>,
}

/// Client for external market data APIs.
pub struct MarketDataClient {
    client: Client,
    quote_base_url: String,
    fund_base_url: String,
}

impl MarketDataClient {
    pub fn new(config: &MarketConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            quote_base_url: config.quote_base_url.trim_end_matches('/').to_string(),
            fund_base_url: config.fund_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve a company name to its ticker symbol.
    ///
    /// Transient failures are retried with the same arguments up to
    /// [`TICKER_LOOKUP_ATTEMPTS`] times; a company with no listing is a
    /// terminal [`MarketError::TickerNotFound`] and is not retried.
    pub async fn resolve_ticker(&self, company: &str) -> Result<String, MarketError> {
        let mut last_error = None;

        for attempt in 1..=TICKER_LOOKUP_ATTEMPTS {
            match self.try_resolve_ticker(company).await {
                Ok(Some(symbol)) => return Ok(symbol),
                Ok(None) => return Err(MarketError::TickerNotFound(company.to_string())),
                Err(e) => {
                    tracing::warn!(company, attempt, error = %e, "ticker lookup failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.expect("at least one attempt was made"))
    }

    async fn try_resolve_ticker(&self, company: &str) -> Result<Option<String>, MarketError> {
        let url = format!(
            "{}/v1/finance/search?q={}&quotesCount=1",
            self.quote_base_url,
            urlencoding::encode(company)
        );

        let response: SymbolSearchResponse = self.get_json(&url).await?;
        Ok(response.quotes.into_iter().next().map(|q| q.symbol))
    }

    /// Fetch quote details for a ticker symbol.
    pub async fn stock_details(&self, ticker: &str) -> Result<StockDetails, MarketError> {
        let url = format!(
            "{}/v7/finance/quote?symbols={}",
            self.quote_base_url,
            urlencoding::encode(ticker)
        );

        let response: QuoteResponse = self.get_json(&url).await?;
        let quote = response
            .quote_response
            .result
            .into_iter()
            .next()
            .ok_or_else(|| MarketError::InvalidResponse(format!("no quote for {}", ticker)))?;

        Ok(StockDetails {
            symbol: quote.symbol,
            company_name: quote.long_name.unwrap_or_default(),
            current_price: quote.regular_market_previous_close.unwrap_or(0.0),
            one_year_change: quote.fifty_two_week_change_percent,
        })
    }

    /// Look up a mutual fund by name: search, then fetch scheme details.
    ///
    /// Failures collapse into a user-safe error payload so downstream
    /// consumers can render the result directly.
    pub async fn mutual_fund_details(&self, fund_name: &str) -> serde_json::Value {
        match self.try_mutual_fund_details(fund_name).await {
            Ok(data) => serde_json::json!({ "status": "success", "data": data }),
            Err(e) => {
                tracing::warn!(fund_name, error = %e, "mutual fund lookup failed");
                serde_json::json!({
                    "status": "error",
                    "message": "Something went wrong. Please try again later.",
                })
            }
        }
    }

    async fn try_mutual_fund_details(
        &self,
        fund_name: &str,
    ) -> Result<serde_json::Value, MarketError> {
        let search_url = format!(
            "{}/search/v3/query/global/st_p_query?entity_type=scheme&page=0&query={}&size=10&web=true",
            self.fund_base_url,
            urlencoding::encode(fund_name)
        );

        let search: FundSearchResponse = self.get_json(&search_url).await?;
        let id = search
            .data
            .content
            .into_iter()
            .next()
            .map(|entry| entry.id)
            .ok_or_else(|| {
                MarketError::InvalidResponse(format!("no scheme found for '{}'", fund_name))
            })?;

        let details_url = format!("{}/data/mf/web/v3/scheme/search/{}", self.fund_base_url, id);
        self.get_json(&details_url).await
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, MarketError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MarketError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(MarketError::RequestFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| MarketError::InvalidResponse(e.to_string()))
    }
}

// Quote API wire types.

#[derive(Debug, Deserialize)]
struct SymbolSearchResponse {
    #[serde(default)]
    quotes: Vec<SymbolSearchQuote>,
}

#[derive(Debug, Deserialize)]
struct SymbolSearchQuote {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteResponseBody,
}

#[derive(Debug, Deserialize)]
struct QuoteResponseBody {
    #[serde(default)]
    result: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    symbol: String,
    #[serde(rename = "longName")]
    long_name: Option<String>,
    #[serde(rename = "regularMarketPreviousClose")]
    regular_market_previous_close: Option<f64>,
    #[serde(rename = "fiftyTwoWeekChangePercent")]
    fifty_two_week_change_percent: Option<f64>,
}

// Fund API wire types.

#[derive(Debug, Deserialize)]
struct FundSearchResponse {
    data: FundSearchData,
}

#[derive(Debug, Deserialize)]
struct FundSearchData {
    #[serde(default)]
    content: Vec<FundSearchEntry>,
}

#[derive(Debug, Deserialize)]
struct FundSearchEntry {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> MarketDataClient {
        MarketDataClient::new(&MarketConfig {
            quote_base_url: base.to_string(),
            fund_base_url: base.to_string(),
        })
    }

    #[tokio::test]
    async fn ticker_lookup_resolves_first_quote() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", mockito::Matcher::Regex("/v1/finance/search.*".to_string()))
            .with_status(200)
            .with_body(r#"{"quotes": [{"symbol": "ACME.NS"}, {"symbol": "ACME.BO"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let symbol = client(&server.url())
            .resolve_ticker("Acme Industries")
            .await
            .unwrap();

        assert_eq!(symbol, "ACME.NS");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_listing_is_terminal_not_retried() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", mockito::Matcher::Regex("/v1/finance/search.*".to_string()))
            .with_status(200)
            .with_body(r#"{"quotes": []}"#)
            .expect(1)
            .create_async()
            .await;

        let err = client(&server.url())
            .resolve_ticker("Unlisted Private Co")
            .await
            .unwrap_err();

        assert!(matches!(err, MarketError::TickerNotFound(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn exhausted_retries_surface_last_error() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", mockito::Matcher::Regex("/v1/finance/search.*".to_string()))
            .with_status(500)
            .expect(5)
            .create_async()
            .await;

        let err = client(&server.url()).resolve_ticker("Acme").await.unwrap_err();
        assert!(matches!(err, MarketError::RequestFailed(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn stock_details_maps_quote_fields() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", mockito::Matcher::Regex("/v7/finance/quote.*".to_string()))
            .with_status(200)
            .with_body(
                r#"{"quoteResponse": {"result": [{
                    "symbol": "ACME.NS",
                    "longName": "Acme Industries Ltd",
                    "regularMarketPreviousClose": 1234.5,
                    "fiftyTwoWeekChangePercent": 12.5
                }]}}"#,
            )
            .create_async()
            .await;

        let details = client(&server.url()).stock_details("ACME.NS").await.unwrap();
        assert_eq!(details.company_name, "Acme Industries Ltd");
        assert_eq!(details.current_price, 1234.5);
        assert_eq!(details.one_year_change, Some(12.5));
    }

    #[tokio::test]
    async fn fund_lookup_failure_is_user_safe() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", mockito::Matcher::Regex("/search/v3.*".to_string()))
            .with_status(500)
            .create_async()
            .await;

        let payload = client(&server.url())
            .mutual_fund_details("Large Cap Fund")
            .await;

        assert_eq!(payload["status"], "error");
        assert!(payload["message"].as_str().unwrap().contains("try again"));
    }

    #[tokio::test]
    async fn fund_lookup_happy_path_chains_search_and_details() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", mockito::Matcher::Regex("/search/v3.*".to_string()))
            .with_status(200)
            .with_body(r#"{"data": {"content": [{"id": "scheme-42"}]}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/data/mf/web/v3/scheme/search/scheme-42")
            .with_status(200)
            .with_body(r#"{"fund_name": "Large Cap Fund", "nav": 101.7}"#)
            .create_async()
            .await;

        let payload = client(&server.url())
            .mutual_fund_details("Large Cap Fund")
            .await;

        assert_eq!(payload["status"], "success");
        assert_eq!(payload["data"]["fund_name"], "Large Cap Fund");
    }
}
