//! Document models stored in the vector containers.
//!
//! These mirror the corpora the retrieval tools search over: stock news,
//! expert commentary, bank website pages, mutual fund factsheets, and the
//! company ranking used for prompt construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata shared by every document kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_ai_generated: bool,
    pub date_created: Option<DateTime<Utc>>,
}

/// A stock news article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsDocument {
    pub document_meta: NewsMeta,
    #[serde(default)]
    pub page_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsMeta {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub company_name: String,
    #[serde(default)]
    pub headline: String,
    pub sector: String,
    pub summary: String,
    #[serde(default)]
    pub market_trend: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub date_published: Option<DateTime<Utc>>,
}

/// An expert commentary document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertDocument {
    pub document_meta: ExpertMeta,
    #[serde(default)]
    pub page_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertMeta {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub companies: Vec<String>,
    pub segments: Vec<String>,
    #[serde(default)]
    pub market_trend: Option<String>,
    #[serde(default)]
    pub date_published: Option<DateTime<Utc>>,
}

/// A scraped bank website page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteDocument {
    pub document_meta: WebsiteMeta,
    #[serde(default)]
    pub page_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsiteMeta {
    #[serde(default)]
    pub source: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Which corpus slice the page belongs to (loan, insurance, ...).
    #[serde(default)]
    pub source_map: Option<String>,
}

/// A mutual fund factsheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutualFundDocument {
    pub document_meta: MutualFundMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutualFundMeta {
    pub fund_name: String,
    #[serde(default)]
    pub investment_objective: String,
    #[serde(default)]
    pub scheme_riskometer: String,
    #[serde(default)]
    pub minimum_investment_amount: serde_json::Value,
    #[serde(default)]
    pub portfolio: serde_json::Value,
    #[serde(default)]
    pub tickers: Option<Vec<String>>,
    #[serde(default)]
    pub sectoral_composition_list: Option<Vec<String>>,
}

/// A ranked company entry, ordered by rank ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRank {
    pub company_name: String,
    #[serde(default)]
    pub ticker: Option<String>,
    pub rank: i64,
}

/// Which slice of the website corpus a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Loan,
    Insurance,
    GovtDepositScheme,
    TermDeposit,
    Card,
    Account,
    Demat,
    MutualFund,
    Faq,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Loan => "loan",
            SourceKind::Insurance => "insurance",
            SourceKind::GovtDepositScheme => "govt-deposit-scheme",
            SourceKind::TermDeposit => "term-deposit",
            SourceKind::Card => "card",
            SourceKind::Account => "account",
            SourceKind::Demat => "demat",
            SourceKind::MutualFund => "mutual-fund",
            SourceKind::Faq => "faq",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn news_document_deserializes_from_store_payload() {
        let raw = serde_json::json!({
            "document_meta": {
                "source": "moneycontrol",
                "company_name": "Acme Industries",
                "sector": "Manufacturing",
                "summary": "Acme announced a new acquisition.",
            },
            "page_content": "Acme Industries today announced..."
        });

        let doc: NewsDocument = serde_json::from_value(raw).unwrap();
        assert_eq!(doc.document_meta.company_name, "Acme Industries");
        assert_eq!(doc.document_meta.sector, "Manufacturing");
        assert!(doc.document_meta.ticker.is_none());
    }

    #[test]
    fn source_kind_round_trips_to_str() {
        assert_eq!(SourceKind::Loan.as_str(), "loan");
        assert_eq!(SourceKind::GovtDepositScheme.as_str(), "govt-deposit-scheme");
    }
}
