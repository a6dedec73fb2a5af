//! HTTP API for the advisory service.
//!
//! One chat route drives the agent network; two pass-through routes
//! expose market data lookups. Wire format on the chat route is the
//! `{sender, text}` pair list the frontend exchanges.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agents::{AdvisoryDeps, AssemblyError, build_advisory_network};
use crate::error::{MarketError, NetworkError};
use crate::network::{Role, WireMessage, seed_messages};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub deps: Arc<AdvisoryDeps>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub messages: Vec<WireMessage>,
}

/// API error mapped onto an HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Market(#[from] MarketError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Network(NetworkError::StepLimitExceeded { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Market(MarketError::TickerNotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(error = %self, "request failed");
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Build the router with all routes and middleware applied.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/agent/chat", post(chat))
        .route("/stock/{ticker}", get(stock))
        .route("/mutual-fund/{name}", get(mutual_fund))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run one conversation through the agent network.
async fn chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let network = build_advisory_network(&state.deps).await?;

    let seed = seed_messages(&request.messages);
    let seeded = seed.len();
    let final_state = network.run(seed).await?;

    // Everything appended during the run that an agent authored goes back
    // to the caller; tool plumbing stays internal.
    let mut messages = request.messages;
    messages.extend(
        final_state.messages[seeded..]
            .iter()
            .filter(|m| m.role == Role::Agent && !m.content.is_empty())
            .map(|m| WireMessage::bot(&m.content)),
    );

    Ok(Json(ChatResponse { messages }))
}

async fn stock(
    State(state): State<ApiState>,
    Path(ticker): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let details = state.deps.market.stock_details(&ticker).await?;
    Ok(Json(serde_json::to_value(details).unwrap_or_default()))
}

async fn mutual_fund(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Json<serde_json::Value> {
    Json(state.deps.market.mutual_fund_details(&name).await)
}

/// Bind and serve until ctrl-c.
pub async fn serve(addr: SocketAddr, state: ApiState) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("advisory API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
