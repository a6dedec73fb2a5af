//! Personal finance agent: loan and insurance document search.

use std::sync::Arc;

use async_trait::async_trait;

use crate::documents::{SourceKind, WebsiteDocument};
use crate::error::ToolError;
use crate::llm::LlmProvider;
use crate::network::{Agent, AgentTool, SharedContext, ToolOutput};
use crate::store::{Condition, DocumentStore, Filter, SearchOptions};

use super::prompts;

pub const PERSONAL_FINANCE: &str = "PersonalFinanceAgent";

const SEARCH_TOP_K: usize = 3;
const SEARCH_THRESHOLD: f64 = 0.3;

/// Vector search over one slice of the bank website corpus.
pub struct WebsiteSearchTool {
    store: Arc<dyn DocumentStore>,
    container: String,
    kind: SourceKind,
    name: &'static str,
    description: &'static str,
}

impl WebsiteSearchTool {
    pub fn loans(store: Arc<dyn DocumentStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
            kind: SourceKind::Loan,
            name: "search_loan_documents",
            description: "Get loan documents related to the provided query.",
        }
    }

    pub fn insurance(store: Arc<dyn DocumentStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
            kind: SourceKind::Insurance,
            name: "search_insurance_documents",
            description: "Get insurance documents related to the provided query.",
        }
    }
}

#[async_trait]
impl AgentTool for WebsiteSearchTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &SharedContext,
    ) -> Result<ToolOutput, ToolError> {
        let query = params
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("missing 'query' parameter".to_string()))?;

        let filter = Filter::field(
            "c.document_meta.source_map",
            Condition::Equals(self.kind.as_str().to_string()),
        );

        let results = self
            .store
            .vector_search(
                &self.container,
                query,
                SearchOptions::default()
                    .with_top_k(SEARCH_TOP_K)
                    .with_threshold(SEARCH_THRESHOLD)
                    .with_filter(filter),
            )
            .await?;

        let pages: Vec<serde_json::Value> = results
            .into_iter()
            .filter_map(|result| {
                serde_json::from_value::<WebsiteDocument>(result.document).ok()
            })
            .map(|doc| {
                serde_json::json!({
                    "page_title": doc.document_meta.title,
                    "page_description": doc.document_meta.description,
                    "page_content": doc.page_content,
                })
            })
            .collect();

        Ok(ToolOutput::json(serde_json::Value::Array(pages)))
    }
}

/// Assemble the personal finance agent with its search tools.
pub fn personal_finance_agent(
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn DocumentStore>,
    web_container: &str,
) -> Agent {
    Agent::new(PERSONAL_FINANCE, prompts::personal_finance_prompt(), llm)
        .with_tool(Arc::new(WebsiteSearchTool::loans(
            Arc::clone(&store),
            web_container,
        )))
        .with_tool(Arc::new(WebsiteSearchTool::insurance(store, web_container)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::ScoredDocument;

    /// Returns one page and records the compiled filter.
    struct CannedStore {
        recorded: std::sync::Mutex<Option<String>>,
    }

    #[async_trait]
    impl DocumentStore for CannedStore {
        async fn vector_search(
            &self,
            _container: &str,
            _query: &str,
            options: SearchOptions,
        ) -> Result<Vec<ScoredDocument>, StoreError> {
            *self.recorded.lock().unwrap() = options.filter.as_ref().map(Filter::compile);
            Ok(vec![ScoredDocument {
                document: serde_json::json!({
                    "document_meta": {
                        "source": "https://bank.example/loans/home",
                        "title": "Home Loan",
                        "description": "Financing for your new home",
                        "source_map": "loan",
                    },
                    "page_content": "Interest rates start at..."
                }),
                similarity_score: 0.8,
                embedding: None,
            }])
        }

        async fn filter_documents(
            &self,
            _container: &str,
            _filter: &Filter,
            _columns: Option<&[String]>,
        ) -> Result<Vec<serde_json::Value>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn loan_search_constrains_source_kind() {
        let store = Arc::new(CannedStore {
            recorded: std::sync::Mutex::new(None),
        });
        let tool = WebsiteSearchTool::loans(
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            "bank-web",
        );

        let output = tool
            .execute(
                serde_json::json!({"query": "home loan rates"}),
                &SharedContext::default(),
            )
            .await
            .unwrap();

        let filter = store.recorded.lock().unwrap().clone().unwrap();
        assert_eq!(filter, "c.document_meta.source_map = 'loan'");

        let pages = output.result.as_array().unwrap();
        assert_eq!(pages[0]["page_title"], "Home Loan");
        assert!(pages[0]["page_content"].as_str().unwrap().contains("Interest"));
    }

    #[tokio::test]
    async fn insurance_variant_uses_its_own_name() {
        let store = Arc::new(CannedStore {
            recorded: std::sync::Mutex::new(None),
        });
        let tool = WebsiteSearchTool::insurance(store, "bank-web");
        assert_eq!(tool.name(), "search_insurance_documents");
    }
}
