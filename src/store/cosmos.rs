//! Azure Cosmos DB document store implementation.
//!
//! Queries go through the REST API with master-key request signing.
//! Vector ranking happens server-side via `VectorDistance`; this module
//! only builds the query text and maps the result documents.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use sha2::Sha256;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::llm::EmbeddingProvider;
use crate::store::filter::Filter;
use crate::store::{DEFAULT_COLUMNS, DocumentStore, ScoredDocument, SearchOptions};

/// Document field holding the stored embedding.
const EMBEDDING_FIELD: &str = "contextVector";
/// Alias under which the query exposes the similarity score.
const SIMILARITY_FIELD: &str = "SimilarityScore";

const API_VERSION: &str = "2018-12-31";

type HmacSha256 = Hmac<Sha256>;

/// Cosmos DB-backed [`DocumentStore`].
pub struct CosmosDocumentStore {
    client: Client,
    config: StoreConfig,
    embeddings: Arc<dyn EmbeddingProvider>,
}

impl CosmosDocumentStore {
    pub fn new(config: StoreConfig, embeddings: Arc<dyn EmbeddingProvider>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            config,
            embeddings,
        }
    }

    /// Execute a query against one container, returning raw documents.
    async fn query(
        &self,
        container: &str,
        query: &str,
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        let resource_link = format!(
            "dbs/{}/colls/{}",
            self.config.database, container
        );
        let url = format!(
            "{}/{}/docs",
            self.config.host.trim_end_matches('/'),
            resource_link
        );

        let date = chrono::Utc::now()
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();
        let auth = sign_request(
            self.config.master_key.expose_secret(),
            "POST",
            "docs",
            &resource_link,
            &date,
        )?;

        tracing::debug!(container, "querying document store");

        let response = self
            .client
            .post(&url)
            .header("authorization", auth)
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION)
            .header("x-ms-documentdb-isquery", "True")
            .header("x-ms-documentdb-query-enablecrosspartition", "true")
            .header("Content-Type", "application/query+json")
            .body(
                serde_json::json!({ "query": query, "parameters": [] }).to_string(),
            )
            .send()
            .await
            .map_err(|e| StoreError::RequestFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(StoreError::RequestFailed {
                reason: format!("HTTP {}: {}", status, body),
            });
        }

        let parsed: QueryResponse =
            serde_json::from_str(&body).map_err(|e| StoreError::InvalidResponse {
                reason: format!("JSON parse error: {}", e),
            })?;

        Ok(parsed.documents)
    }
}

#[async_trait]
impl DocumentStore for CosmosDocumentStore {
    async fn vector_search(
        &self,
        container: &str,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<ScoredDocument>, StoreError> {
        let embedding = self
            .embeddings
            .embed(query)
            .await
            .map_err(StoreError::Embedding)?;

        let sql = build_vector_query(&options, &embedding);
        let items = self.query(container, &sql).await?;

        let mut results = Vec::with_capacity(items.len());
        for mut item in items {
            let Some(map) = item.as_object_mut() else {
                continue;
            };
            let score = map
                .remove(SIMILARITY_FIELD)
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            if score <= options.threshold {
                continue;
            }
            let embedding = if options.with_embeddings {
                map.remove(EMBEDDING_FIELD).and_then(|v| {
                    serde_json::from_value::<Vec<f32>>(v).ok()
                })
            } else {
                let _ = map.remove(EMBEDDING_FIELD);
                None
            };
            results.push(ScoredDocument {
                document: item,
                similarity_score: score,
                embedding,
            });
        }

        Ok(results)
    }

    async fn filter_documents(
        &self,
        container: &str,
        filter: &Filter,
        columns: Option<&[String]>,
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        let sql = build_filter_query(filter, columns);
        self.query(container, &sql).await
    }
}

/// Build the top-K similarity query.
fn build_vector_query(options: &SearchOptions, embedding: &[f32]) -> String {
    let columns = projected_columns(options.columns.as_deref());
    let vector = format_vector(embedding);
    let where_clause = options
        .filter
        .as_ref()
        .map(where_clause)
        .unwrap_or_default();

    format!(
        "SELECT TOP {} {}, VectorDistance(c.{}, {}) AS {} FROM c{} \
         ORDER BY VectorDistance(c.{}, {})",
        options.top_k, columns, EMBEDDING_FIELD, vector, SIMILARITY_FIELD, where_clause,
        EMBEDDING_FIELD, vector
    )
}

/// Build the exact-match filter query.
fn build_filter_query(filter: &Filter, columns: Option<&[String]>) -> String {
    format!(
        "SELECT {} FROM c{}",
        projected_columns(columns),
        where_clause(filter)
    )
}

fn where_clause(filter: &Filter) -> String {
    let predicate = filter.compile();
    if predicate.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", predicate)
    }
}

fn projected_columns(columns: Option<&[String]>) -> String {
    match columns {
        Some(cols) if !cols.is_empty() => cols
            .iter()
            .map(|c| format!("c.{}", c))
            .collect::<Vec<_>>()
            .join(", "),
        _ => DEFAULT_COLUMNS
            .iter()
            .map(|c| format!("c.{}", c))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn format_vector(embedding: &[f32]) -> String {
    let parts: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Compute the master-key authorization token for one request.
fn sign_request(
    master_key: &str,
    verb: &str,
    resource_type: &str,
    resource_link: &str,
    date: &str,
) -> Result<String, StoreError> {
    let key = BASE64
        .decode(master_key)
        .map_err(|e| StoreError::InvalidKey {
            reason: e.to_string(),
        })?;

    let payload = format!(
        "{}\n{}\n{}\n{}\n\n",
        verb.to_lowercase(),
        resource_type,
        resource_link,
        date.to_lowercase()
    );

    let mut mac = HmacSha256::new_from_slice(&key).map_err(|e| StoreError::InvalidKey {
        reason: e.to_string(),
    })?;
    mac.update(payload.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    let token = format!("type=master&ver=1.0&sig={}", signature);
    Ok(urlencoding::encode(&token).into_owned())
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(rename = "Documents", default)]
    documents: Vec<serde_json::Value>,
}
