//! Company ranking reads.
//!
//! The ranking container holds one document per company with a
//! precomputed rank. The top slice feeds agent prompt construction,
//! fetched once per conversation run.

use std::sync::Arc;

use crate::documents::CompanyRank;
use crate::error::StoreError;
use crate::store::filter::{Condition, Filter};
use crate::store::DocumentStore;

/// Reader over the company ranking container.
pub struct CompanyRankStore {
    store: Arc<dyn DocumentStore>,
    container: String,
}

impl CompanyRankStore {
    pub fn new(store: Arc<dyn DocumentStore>, container: impl Into<String>) -> Self {
        Self {
            store,
            container: container.into(),
        }
    }

    /// The `k` best-ranked companies, rank ascending.
    pub async fn top_companies(&self, k: usize) -> Result<Vec<CompanyRank>, StoreError> {
        let filter = Filter::field("c.rank", Condition::LessThan((k + 1).to_string()));
        let columns = vec![
            "company_name".to_string(),
            "ticker".to_string(),
            "rank".to_string(),
        ];

        let items = self
            .store
            .filter_documents(&self.container, &filter, Some(&columns))
            .await?;

        let mut companies: Vec<CompanyRank> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        companies.sort_by_key(|c| c.rank);

        Ok(companies)
    }
}
