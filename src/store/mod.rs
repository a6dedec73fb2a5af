//! Document retrieval layer.
//!
//! The storage engine is a managed document store that executes SQL-ish
//! queries and ranks by vector distance server-side. This module owns
//! what the service is responsible for: compiling filters into WHERE
//! clauses, building the queries, and mapping results back into
//! documents.

mod cosmos;
mod filter;
mod ranks;

pub use cosmos::CosmosDocumentStore;
pub use filter::{Condition, Filter};
pub use ranks::CompanyRankStore;

use async_trait::async_trait;

use crate::error::StoreError;

/// Default columns returned when the caller does not narrow them.
pub const DEFAULT_COLUMNS: &[&str] = &["document_meta", "page_content"];

/// Options for a vector similarity search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Number of documents to return.
    pub top_k: usize,
    /// Results scoring at or below this similarity are dropped.
    pub threshold: f64,
    /// Return each document's stored embedding alongside it.
    pub with_embeddings: bool,
    /// Structured metadata filter applied in the WHERE clause.
    pub filter: Option<Filter>,
    /// Columns to project; defaults to [`DEFAULT_COLUMNS`].
    pub columns: Option<Vec<String>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            threshold: 0.0,
            with_embeddings: false,
            filter: None,
            columns: None,
        }
    }
}

impl SearchOptions {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_embeddings(mut self) -> Self {
        self.with_embeddings = true;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }
}

/// A document returned by a similarity search.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    /// The projected document body.
    pub document: serde_json::Value,
    pub similarity_score: f64,
    /// Present only when requested via [`SearchOptions::with_embeddings`].
    pub embedding: Option<Vec<f32>>,
}

/// Query interface over the managed document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Top-K documents by vector distance to the query text.
    async fn vector_search(
        &self,
        container: &str,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<ScoredDocument>, StoreError>;

    /// Exact-match filtering with no ranking.
    async fn filter_documents(
        &self,
        container: &str,
        filter: &Filter,
        columns: Option<&[String]>,
    ) -> Result<Vec<serde_json::Value>, StoreError>;
}
